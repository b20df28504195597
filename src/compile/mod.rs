//! Lowering of the IR into JVM instructions and class files.

pub mod codegen;
pub mod context;
pub mod descriptor;
pub mod hierarchy;
pub mod stack_calc;
pub mod stackmap;

mod cast;
mod cond;
mod expr;
mod idioms;
mod method;
mod stmt;
mod switch;
mod writer;

use crate::attribute_info::{ExceptionEntry, LocalVariableTableItem};
use crate::code_attribute::Instruction;
use crate::constant_info::ConstantPool;
use crate::error::Result;
use crate::model::{MethodDef, ObjectDef};

use self::hierarchy::ClassHierarchy;
use self::method::MethodCompiler;
use self::stackmap::{FrameSnapshot, VType};

pub use self::switch::java_string_hash;
pub use self::writer::{ClassWriter, GeneratedClass};

/// Knobs for class emission.
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Class-file major version; `None` picks 49 or 52 from what the class needs.
    pub target_version: Option<u16>,
    pub local_variable_table: bool,
    pub source_file: Option<String>,
    /// Fail on stack inconsistencies instead of only computing `max_stack`.
    pub verify_stack: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            target_version: None,
            local_variable_table: true,
            source_file: None,
            verify_stack: true,
        }
    }
}

/// The lowered body of one method, with offsets resolved.
#[derive(Clone, Debug)]
pub struct GeneratedCode {
    pub instructions: Vec<Instruction>,
    pub code_length: u32,
    pub max_stack: u16,
    pub max_locals: u16,
    pub exception_table: Vec<ExceptionEntry>,
    /// Frames at every branch target and handler, in address order.
    pub frames: Vec<FrameSnapshot>,
    pub entry_locals: Vec<VType>,
    pub local_variables: Vec<LocalVariableTableItem>,
    /// The body calls a static or private method through an `InterfaceMethodref`.
    pub interface_calls: bool,
}

/// Lower a single method body into `pool`.
///
/// `object` is the enclosing type, used to resolve `this`, `super` and the
/// hierarchy for reference merges. It may be `None` for free-standing static
/// code.
pub fn lower_method(
    object: Option<&ObjectDef>,
    method: &MethodDef,
    pool: &mut ConstantPool,
    options: &WriterOptions,
) -> Result<GeneratedCode> {
    let mut hierarchy = ClassHierarchy::jdk();
    if let Some(object) = object {
        hierarchy.add_object(object);
    }
    lower_method_with(object, method, pool, &hierarchy, options)
}

pub(crate) fn lower_method_with(
    object: Option<&ObjectDef>,
    method: &MethodDef,
    pool: &mut ConstantPool,
    hierarchy: &ClassHierarchy,
    options: &WriterOptions,
) -> Result<GeneratedCode> {
    MethodCompiler::new(object, method, pool, hierarchy)?.compile(options)
}
