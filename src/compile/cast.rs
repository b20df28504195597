use crate::code_attribute::Instruction;
use crate::error::{LowerError, Result};
use crate::model::{PrimitiveType, TypeDef};

use super::method::{InvokeKind, MethodCompiler};

/// Computational class of a primitive on the operand stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StackClass {
    Int,
    Long,
    Float,
    Double,
}

fn stack_class(p: PrimitiveType) -> StackClass {
    match p {
        PrimitiveType::Long => StackClass::Long,
        PrimitiveType::Float => StackClass::Float,
        PrimitiveType::Double => StackClass::Double,
        _ => StackClass::Int,
    }
}

impl<'a> MethodCompiler<'a> {
    /// Convert the value on top of the stack from `from` to `to`. Both are erased.
    pub(super) fn cast(&mut self, from: &TypeDef, to: &TypeDef) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if from.is_void() || to.is_void() {
            return Err(LowerError::type_contract(format!("cannot convert {} to {}", from, to)));
        }
        match (from.as_primitive(), to.as_primitive()) {
            (Some(f), Some(t)) => self.convert_primitive(f, t),
            (Some(f), None) => self.box_into(f, to),
            (None, Some(t)) => self.unbox_from(from, t),
            (None, None) => self.check_cast(from, to),
        }
    }

    fn convert_primitive(&mut self, from: PrimitiveType, to: PrimitiveType) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if from == PrimitiveType::Boolean || to == PrimitiveType::Boolean {
            return Err(LowerError::type_contract(format!(
                "cannot convert {} to {}",
                from.name(),
                to.name()
            )));
        }
        let conversion: &[Instruction] = match (stack_class(from), stack_class(to)) {
            (StackClass::Int, StackClass::Long) => &[Instruction::I2l],
            (StackClass::Int, StackClass::Float) => &[Instruction::I2f],
            (StackClass::Int, StackClass::Double) => &[Instruction::I2d],
            (StackClass::Long, StackClass::Int) => &[Instruction::L2i],
            (StackClass::Long, StackClass::Float) => &[Instruction::L2f],
            (StackClass::Long, StackClass::Double) => &[Instruction::L2d],
            (StackClass::Float, StackClass::Int) => &[Instruction::F2i],
            (StackClass::Float, StackClass::Long) => &[Instruction::F2l],
            (StackClass::Float, StackClass::Double) => &[Instruction::F2d],
            (StackClass::Double, StackClass::Int) => &[Instruction::D2i],
            (StackClass::Double, StackClass::Long) => &[Instruction::D2l],
            (StackClass::Double, StackClass::Float) => &[Instruction::D2f],
            _ => &[],
        };
        for instr in conversion {
            self.code.emit(instr.clone());
        }
        // narrowing inside the int class
        let narrow = match to {
            PrimitiveType::Byte => Some(Instruction::I2b),
            PrimitiveType::Short if from != PrimitiveType::Byte => Some(Instruction::I2s),
            PrimitiveType::Char => Some(Instruction::I2c),
            _ => None,
        };
        if let Some(instr) = narrow {
            self.code.emit(instr);
        }
        Ok(())
    }

    /// `Wrapper.valueOf(p)`.
    pub(super) fn box_primitive(&mut self, p: PrimitiveType) -> Result<()> {
        let wrapper = p.wrapper().internal_name();
        let descriptor = format!("({})L{};", p.descriptor(), wrapper);
        self.invoke_raw(InvokeKind::Static, &wrapper, false, "valueOf", &descriptor)
    }

    /// `wrapper.pValue()` on a value already typed as the wrapper.
    pub(super) fn unbox_primitive(&mut self, p: PrimitiveType) -> Result<()> {
        let wrapper = p.wrapper().internal_name();
        let name = format!("{}Value", p.name());
        let descriptor = format!("(){}", p.descriptor());
        self.invoke_raw(InvokeKind::Virtual, &wrapper, false, &name, &descriptor)
    }

    fn box_into(&mut self, from: PrimitiveType, to: &TypeDef) -> Result<()> {
        // int into Long boxes as long
        let boxed = match to.unboxed() {
            Some(target) if target != from => {
                self.convert_primitive(from, target)?;
                target
            }
            _ => from,
        };
        self.box_primitive(boxed)?;
        self.check_cast(&boxed.wrapper().as_type(), to)
    }

    fn unbox_from(&mut self, from: &TypeDef, to: PrimitiveType) -> Result<()> {
        let unboxed = match from.unboxed() {
            Some(p) => p,
            None => {
                self.check_cast(from, &to.wrapper().as_type())?;
                to
            }
        };
        self.unbox_primitive(unboxed)?;
        self.convert_primitive(unboxed, to)
    }

    /// `checkcast` unless `from` is provably assignable to `to`.
    fn check_cast(&mut self, from: &TypeDef, to: &TypeDef) -> Result<()> {
        if self.hierarchy.is_assignable(from, to) {
            return Ok(());
        }
        let index = self.class_index(to)?;
        self.code.emit(Instruction::Checkcast(index));
        Ok(())
    }
}
