use crate::code_attribute::Instruction;
use crate::error::{LowerError, Result};
use crate::model::{CompareOp, ExpressionDef, MathOp, PrimitiveType, TypeDef};

use super::codegen::Label;
use super::method::{InvokeKind, MethodCompiler};

const ARRAYS: &str = "java.util.Arrays";
const STRING_BUILDER: &str = "java/lang/StringBuilder";

/// Parameter type of the `java.util.Arrays` helper for an erased array type,
/// and whether it is the `deep` variant.
fn arrays_parameter(array: &TypeDef) -> (bool, TypeDef) {
    match array {
        TypeDef::Array(a) if a.dimensions() == 1 && a.component().is_primitive() => (false, array.clone()),
        _ => (true, TypeDef::array(TypeDef::object(), 1)),
    }
}

/// `StringBuilder.append` overload for a pushed value.
fn append_descriptor(ty: &TypeDef) -> Result<&'static str> {
    Ok(match ty.as_primitive() {
        Some(PrimitiveType::Boolean) => "Z",
        Some(PrimitiveType::Char) => "C",
        Some(PrimitiveType::Byte | PrimitiveType::Short | PrimitiveType::Int) => "I",
        Some(PrimitiveType::Long) => "J",
        Some(PrimitiveType::Float) => "F",
        Some(PrimitiveType::Double) => "D",
        Some(PrimitiveType::Void) => {
            return Err(LowerError::type_contract("void value in string concatenation"));
        }
        None if ty.is_string() => "Ljava/lang/String;",
        None => "Ljava/lang/Object;",
    })
}

fn collect_concat_parts<'e>(expr: &'e ExpressionDef, out: &mut Vec<&'e ExpressionDef>) {
    match expr {
        ExpressionDef::MathBinary {
            op: MathOp::Add,
            left,
            right,
        } if expr.ty().is_string() => {
            collect_concat_parts(left, out);
            collect_concat_parts(right, out);
        }
        other => out.push(other),
    }
}

impl<'a> MethodCompiler<'a> {
    /// Branch on `left.equals(right)`, with primitives compared by value and
    /// arrays through `Arrays.equals`/`deepEquals`.
    pub(super) fn jump_if_equal(
        &mut self,
        left: &ExpressionDef,
        right: &ExpressionDef,
        jump_when: bool,
        target: Label,
    ) -> Result<()> {
        let left_ty = self.erase(&left.ty())?;
        let right_ty = self.erase(&right.ty())?;
        if left_ty.is_primitive() || right_ty.is_primitive() {
            return self.jump_if_compare(CompareOp::Eq, left, right, jump_when, target);
        }
        if left_ty.is_array() {
            let (deep, parameter) = arrays_parameter(&left_ty);
            self.gen_expr(left, &parameter)?;
            self.gen_expr(right, &parameter)?;
            let name = if deep { "deepEquals" } else { "equals" };
            let parameters = [parameter.clone(), parameter];
            self.invoke(InvokeKind::Static, &TypeDef::class(ARRAYS), name, &parameters, &TypeDef::BOOLEAN)?;
        } else {
            let owner = self.push_reference(left)?;
            self.gen_expr(right, &TypeDef::object())?;
            let kind = if self.is_interface(&owner) {
                InvokeKind::Interface
            } else {
                InvokeKind::Virtual
            };
            self.invoke(kind, &owner, "equals", &[TypeDef::object()], &TypeDef::BOOLEAN)?;
        }
        self.jump_on_int(jump_when, target)
    }

    pub(super) fn push_hash_code(&mut self, value: &ExpressionDef) -> Result<TypeDef> {
        let ty = self.erase(&value.ty())?;
        match &ty {
            TypeDef::Primitive(p) if ty.is_primitive() => {
                self.gen_expr(value, &ty)?;
                let wrapper = p.wrapper().internal_name();
                let descriptor = format!("({})I", p.descriptor());
                self.invoke_raw(InvokeKind::Static, &wrapper, false, "hashCode", &descriptor)?;
            }
            TypeDef::Array(_) => {
                let (deep, parameter) = arrays_parameter(&ty);
                self.gen_expr(value, &parameter)?;
                let name = if deep { "deepHashCode" } else { "hashCode" };
                self.invoke(InvokeKind::Static, &TypeDef::class(ARRAYS), name, &[parameter], &TypeDef::INT)?;
            }
            _ => {
                let owner = self.push_reference(value)?;
                let kind = if self.is_interface(&owner) {
                    InvokeKind::Interface
                } else {
                    InvokeKind::Virtual
                };
                self.invoke(kind, &owner, "hashCode", &[], &TypeDef::INT)?;
            }
        }
        Ok(TypeDef::INT)
    }

    pub(super) fn push_get_class(&mut self, value: &ExpressionDef) -> Result<TypeDef> {
        let class = TypeDef::class("java.lang.Class");
        let ty = self.erase(&value.ty())?;
        match ty.as_primitive() {
            Some(p) if ty.is_primitive() => {
                self.gen_discarded(value)?;
                let wrapper = p.wrapper().as_type();
                self.field_instruction(Instruction::Getstatic, &wrapper, "TYPE", &class)?;
            }
            _ => {
                self.push_reference(value)?;
                self.invoke_raw(
                    InvokeKind::Virtual,
                    "java/lang/Object",
                    false,
                    "getClass",
                    "()Ljava/lang/Class;",
                )?;
            }
        }
        Ok(class)
    }

    /// `new StringBuilder().append(..)...toString()` over the flattened `+` chain.
    pub(super) fn push_string_concat(&mut self, left: &ExpressionDef, right: &ExpressionDef) -> Result<TypeDef> {
        let mut parts = Vec::new();
        collect_concat_parts(left, &mut parts);
        collect_concat_parts(right, &mut parts);

        let builder = self.pool.class(STRING_BUILDER)?;
        self.code.emit(Instruction::New(builder));
        self.code.emit(Instruction::Dup);
        self.invoke_raw(InvokeKind::Special, STRING_BUILDER, false, "<init>", "()V")?;
        for part in parts {
            let ty = self.push_expr(part, None)?;
            let descriptor = format!("({})L{};", append_descriptor(&ty)?, STRING_BUILDER);
            self.invoke_raw(InvokeKind::Virtual, STRING_BUILDER, false, "append", &descriptor)?;
        }
        self.invoke_raw(
            InvokeKind::Virtual,
            STRING_BUILDER,
            false,
            "toString",
            "()Ljava/lang/String;",
        )?;
        Ok(TypeDef::string())
    }
}
