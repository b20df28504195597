//! Lowering of a typed class/member IR into verifiable
//! [Java class files](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html).
//!
//! Build an [`model::ObjectDef`], hand it to a [`ClassWriter`] and serialize
//! the resulting [`GeneratedClass`]es:
//!
//! ```no_run
//! use classgen::model::{ClassDef, ExpressionDef, MethodDef, Modifier, ObjectDef, TypeDef};
//! use classgen::{ClassWriter, WriterOptions};
//!
//! let mut class = ClassDef::new("demo.Answer");
//! class.modifiers.insert(Modifier::Public);
//! class.methods.push(
//!     MethodDef::new("get", TypeDef::INT)
//!         .with_modifiers(&[Modifier::Public, Modifier::Static])
//!         .with_statement(ExpressionDef::int(42).returning()),
//! );
//! let classes = ClassWriter::new(WriterOptions::default()).write(&ObjectDef::Class(class))?;
//! std::fs::write(classes[0].file_name(), classes[0].to_bytes()?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
extern crate bitflags;

pub mod attribute_info;
pub mod constant_info;
pub mod field_info;
pub mod method_info;

pub mod code_attribute;

pub mod compile;
pub mod desugar;
pub mod error;
pub mod model;
pub mod types;

#[cfg(feature = "jar")]
pub mod jar;

pub use compile::{lower_method, ClassWriter, GeneratedClass, GeneratedCode, WriterOptions};
pub use error::{LowerError, Result};
pub use types::*;
