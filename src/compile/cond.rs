use crate::code_attribute::Instruction;
use crate::error::{LowerError, Result};
use crate::model::{binary_promotion, numeric_kind, CompareOp, ConstantValue, ExpressionDef, PrimitiveType, TypeDef};

use super::codegen::Label;
use super::method::MethodCompiler;

/// Branch on the int on top of the stack compared against zero.
pub(super) fn if_zero(op: CompareOp) -> fn(i16) -> Instruction {
    match op {
        CompareOp::Eq => Instruction::Ifeq,
        CompareOp::Ne => Instruction::Ifne,
        CompareOp::Lt => Instruction::Iflt,
        CompareOp::Le => Instruction::Ifle,
        CompareOp::Gt => Instruction::Ifgt,
        CompareOp::Ge => Instruction::Ifge,
    }
}

fn if_icmp(op: CompareOp) -> fn(i16) -> Instruction {
    match op {
        CompareOp::Eq => Instruction::IfIcmpeq,
        CompareOp::Ne => Instruction::IfIcmpne,
        CompareOp::Lt => Instruction::IfIcmplt,
        CompareOp::Le => Instruction::IfIcmple,
        CompareOp::Gt => Instruction::IfIcmpgt,
        CompareOp::Ge => Instruction::IfIcmpge,
    }
}

fn is_null_constant(expr: &ExpressionDef) -> bool {
    matches!(
        expr,
        ExpressionDef::Constant {
            value: ConstantValue::Null,
            ..
        }
    )
}

impl<'a> MethodCompiler<'a> {
    /// Jump to `target` when `condition` evaluates to `jump_when`, fall through otherwise.
    pub(super) fn jump_if(&mut self, condition: &ExpressionDef, jump_when: bool, target: Label) -> Result<()> {
        match condition {
            ExpressionDef::And(left, right) => {
                if jump_when {
                    let skip = self.code.new_label();
                    self.jump_if(left, false, skip)?;
                    self.jump_if(right, true, target)?;
                    self.code.bind_label(skip);
                } else {
                    self.jump_if(left, false, target)?;
                    self.jump_if(right, false, target)?;
                }
                Ok(())
            }
            ExpressionDef::Or(left, right) => {
                if jump_when {
                    self.jump_if(left, true, target)?;
                    self.jump_if(right, true, target)?;
                } else {
                    let when_true = self.code.new_label();
                    self.jump_if(left, true, when_true)?;
                    self.jump_if(right, false, target)?;
                    self.code.bind_label(when_true);
                }
                Ok(())
            }
            ExpressionDef::Not(inner) => self.jump_if(inner, !jump_when, target),
            ExpressionDef::IsNull(value) => {
                self.push_reference(value)?;
                self.jump_on_null(true, jump_when, target)
            }
            ExpressionDef::IsNotNull(value) => {
                self.push_reference(value)?;
                self.jump_on_null(false, jump_when, target)
            }
            ExpressionDef::IsTrue(value) => {
                self.gen_expr(value, &TypeDef::BOOLEAN)?;
                self.jump_on_int(jump_when, target)
            }
            ExpressionDef::IsFalse(value) => {
                self.gen_expr(value, &TypeDef::BOOLEAN)?;
                self.jump_on_int(!jump_when, target)
            }
            ExpressionDef::Compare { op, left, right } => self.jump_if_compare(*op, left, right, jump_when, target),
            ExpressionDef::EqualsReferentially(left, right) => {
                self.jump_if_same(left, right, jump_when, target)
            }
            ExpressionDef::NotEqualsReferentially(left, right) => {
                self.jump_if_same(left, right, !jump_when, target)
            }
            ExpressionDef::EqualsStructurally(left, right) => {
                self.jump_if_equal(left, right, jump_when, target)
            }
            ExpressionDef::NotEqualsStructurally(left, right) => {
                self.jump_if_equal(left, right, !jump_when, target)
            }
            ExpressionDef::InstanceOf { .. } => {
                self.push_expr(condition, None)?;
                self.jump_on_int(jump_when, target)
            }
            ExpressionDef::Constant {
                value: ConstantValue::Boolean(value),
                ..
            } => {
                if *value == jump_when {
                    self.code.emit_goto(target)?;
                }
                Ok(())
            }
            other => {
                let ty = self.erase(&other.ty())?;
                if numeric_kind(&ty) != Some(PrimitiveType::Boolean) {
                    return Err(LowerError::type_contract(format!(
                        "condition must be boolean, got {} from {:?}",
                        ty, other
                    )));
                }
                self.gen_expr(other, &TypeDef::BOOLEAN)?;
                self.jump_on_int(jump_when, target)
            }
        }
    }

    /// Branch on a boolean int on top of the stack.
    pub(super) fn jump_on_int(&mut self, jump_when: bool, target: Label) -> Result<()> {
        let instr = if jump_when { Instruction::Ifne } else { Instruction::Ifeq };
        self.code.emit_branch(instr, target)
    }

    /// Branch on the reference on top of the stack being null (`null_test`) or not.
    fn jump_on_null(&mut self, null_test: bool, jump_when: bool, target: Label) -> Result<()> {
        let instr = if null_test == jump_when {
            Instruction::Ifnull
        } else {
            Instruction::Ifnonnull
        };
        self.code.emit_branch(instr, target)
    }

    pub(super) fn jump_if_compare(
        &mut self,
        op: CompareOp,
        left: &ExpressionDef,
        right: &ExpressionDef,
        jump_when: bool,
        target: Label,
    ) -> Result<()> {
        let left_ty = self.erase(&left.ty())?;
        let right_ty = self.erase(&right.ty())?;
        let references = !left_ty.is_primitive() && !right_ty.is_primitive();
        if references && matches!(op, CompareOp::Eq | CompareOp::Ne) {
            return self.jump_if_same(left, right, jump_when == (op == CompareOp::Eq), target);
        }

        let effective = if jump_when { op } else { op.invert() };
        match (numeric_kind(&left_ty), numeric_kind(&right_ty)) {
            (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => {
                if !matches!(op, CompareOp::Eq | CompareOp::Ne) {
                    return Err(LowerError::type_contract(format!(
                        "operator {} is not defined on boolean",
                        op.symbol()
                    )));
                }
                self.gen_expr(left, &TypeDef::BOOLEAN)?;
                self.gen_expr(right, &TypeDef::BOOLEAN)?;
                self.code.emit_branch(if_icmp(effective), target)
            }
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                let promoted = binary_promotion(a, b);
                let ty = TypeDef::Primitive(promoted);
                self.gen_expr(left, &ty)?;
                self.gen_expr(right, &ty)?;
                // NaN must land on the false side of the source operator
                let nan_is_greater = matches!(op, CompareOp::Lt | CompareOp::Le);
                match promoted {
                    PrimitiveType::Long => self.code.emit(Instruction::Lcmp),
                    PrimitiveType::Float => self.code.emit(if nan_is_greater {
                        Instruction::Fcmpg
                    } else {
                        Instruction::Fcmpl
                    }),
                    PrimitiveType::Double => self.code.emit(if nan_is_greater {
                        Instruction::Dcmpg
                    } else {
                        Instruction::Dcmpl
                    }),
                    _ => return self.code.emit_branch(if_icmp(effective), target),
                }
                self.code.emit_branch(if_zero(effective), target)
            }
            _ => Err(LowerError::type_contract(format!(
                "cannot compare {} {} {}",
                left_ty,
                op.symbol(),
                right_ty
            ))),
        }
    }

    /// Reference identity; primitives compare by value.
    fn jump_if_same(&mut self, left: &ExpressionDef, right: &ExpressionDef, jump_when: bool, target: Label) -> Result<()> {
        let left_ty = self.erase(&left.ty())?;
        let right_ty = self.erase(&right.ty())?;
        if left_ty.is_primitive() || right_ty.is_primitive() {
            return self.jump_if_compare(CompareOp::Eq, left, right, jump_when, target);
        }
        if is_null_constant(right) {
            self.push_reference(left)?;
            return self.jump_on_null(true, jump_when, target);
        }
        if is_null_constant(left) {
            self.push_reference(right)?;
            return self.jump_on_null(true, jump_when, target);
        }
        self.push_reference(left)?;
        self.push_reference(right)?;
        let instr = if jump_when {
            Instruction::IfAcmpeq
        } else {
            Instruction::IfAcmpne
        };
        self.code.emit_branch(instr, target)
    }
}
