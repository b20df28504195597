//! JVM instruction set and `code` array encoding.

mod size;
mod types;

pub use self::size::*;
pub use self::types::*;
