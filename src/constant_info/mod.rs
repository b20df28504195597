//! Constant pool entries and the deduplicating pool builder.

mod pool;
mod types;

pub use self::pool::*;
pub use self::types::*;
