//! The immutable class/member IR that the lowering engine consumes.

mod expr;
mod object;
mod stmt;
mod types;

pub use self::expr::*;
pub use self::object::*;
pub use self::stmt::*;
pub use self::types::*;
