//! Attributes written into classes, fields, methods and `Code`.

mod types;

pub use self::types::*;
