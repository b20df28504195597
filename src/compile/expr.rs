use crate::code_attribute::Instruction;
use crate::error::{LowerError, Result};
use crate::model::{
    math_result_type, numeric_kind, ArrayTypeDef, ClassTypeDef, ConstantValue, ExpressionDef, MathOp, MethodSig,
    Modifier, PrimitiveType, StatementDef, TypeDef, VariableDef,
};

use super::codegen::ValueKind;
use super::method::{InvokeKind, MethodCompiler, YieldTarget};

/// Element type of an erased array type.
pub(super) fn element_type(array: &TypeDef) -> Result<TypeDef> {
    match array {
        TypeDef::Array(a) => Ok(a.element_type()),
        other => Err(LowerError::type_contract(format!("expected an array, got {}", other))),
    }
}

pub(super) fn array_load(element: &TypeDef) -> Instruction {
    match element.as_primitive() {
        Some(PrimitiveType::Boolean | PrimitiveType::Byte) => Instruction::Baload,
        Some(PrimitiveType::Char) => Instruction::Caload,
        Some(PrimitiveType::Short) => Instruction::Saload,
        Some(PrimitiveType::Int) => Instruction::Iaload,
        Some(PrimitiveType::Long) => Instruction::Laload,
        Some(PrimitiveType::Float) => Instruction::Faload,
        Some(PrimitiveType::Double) => Instruction::Daload,
        _ => Instruction::Aaload,
    }
}

pub(super) fn array_store(element: &TypeDef) -> Instruction {
    match element.as_primitive() {
        Some(PrimitiveType::Boolean | PrimitiveType::Byte) => Instruction::Bastore,
        Some(PrimitiveType::Char) => Instruction::Castore,
        Some(PrimitiveType::Short) => Instruction::Sastore,
        Some(PrimitiveType::Int) => Instruction::Iastore,
        Some(PrimitiveType::Long) => Instruction::Lastore,
        Some(PrimitiveType::Float) => Instruction::Fastore,
        Some(PrimitiveType::Double) => Instruction::Dastore,
        _ => Instruction::Aastore,
    }
}

/// `newarray` type code.
fn array_type_code(p: PrimitiveType) -> u8 {
    match p {
        PrimitiveType::Boolean => 4,
        PrimitiveType::Char => 5,
        PrimitiveType::Float => 6,
        PrimitiveType::Double => 7,
        PrimitiveType::Byte => 8,
        PrimitiveType::Short => 9,
        PrimitiveType::Long => 11,
        _ => 10,
    }
}

fn math_instruction(op: MathOp, p: PrimitiveType) -> Result<Instruction> {
    use Instruction::*;
    let kind = ValueKind::of(&TypeDef::Primitive(p));
    let instr = match (op, kind) {
        (MathOp::Add, ValueKind::Int) => Iadd,
        (MathOp::Add, ValueKind::Long) => Ladd,
        (MathOp::Add, ValueKind::Float) => Fadd,
        (MathOp::Add, ValueKind::Double) => Dadd,
        (MathOp::Sub, ValueKind::Int) => Isub,
        (MathOp::Sub, ValueKind::Long) => Lsub,
        (MathOp::Sub, ValueKind::Float) => Fsub,
        (MathOp::Sub, ValueKind::Double) => Dsub,
        (MathOp::Mul, ValueKind::Int) => Imul,
        (MathOp::Mul, ValueKind::Long) => Lmul,
        (MathOp::Mul, ValueKind::Float) => Fmul,
        (MathOp::Mul, ValueKind::Double) => Dmul,
        (MathOp::Div, ValueKind::Int) => Idiv,
        (MathOp::Div, ValueKind::Long) => Ldiv,
        (MathOp::Div, ValueKind::Float) => Fdiv,
        (MathOp::Div, ValueKind::Double) => Ddiv,
        (MathOp::Rem, ValueKind::Int) => Irem,
        (MathOp::Rem, ValueKind::Long) => Lrem,
        (MathOp::Rem, ValueKind::Float) => Frem,
        (MathOp::Rem, ValueKind::Double) => Drem,
        (MathOp::And, ValueKind::Int) => Iand,
        (MathOp::And, ValueKind::Long) => Land,
        (MathOp::Or, ValueKind::Int) => Ior,
        (MathOp::Or, ValueKind::Long) => Lor,
        (MathOp::Xor, ValueKind::Int) => Ixor,
        (MathOp::Xor, ValueKind::Long) => Lxor,
        (MathOp::Shl, ValueKind::Int) => Ishl,
        (MathOp::Shl, ValueKind::Long) => Lshl,
        (MathOp::Shr, ValueKind::Int) => Ishr,
        (MathOp::Shr, ValueKind::Long) => Lshr,
        (MathOp::Ushr, ValueKind::Int) => Iushr,
        (MathOp::Ushr, ValueKind::Long) => Lushr,
        _ => {
            return Err(LowerError::type_contract(format!(
                "operator {} is not defined on {}",
                op.symbol(),
                p.name()
            )))
        }
    };
    Ok(instr)
}

impl<'a> MethodCompiler<'a> {
    /// Push `expr` converted to `expected`.
    pub(super) fn gen_expr(&mut self, expr: &ExpressionDef, expected: &TypeDef) -> Result<()> {
        let expected = self.erase(expected)?;
        if expected.is_void() {
            return Err(LowerError::type_contract(format!("a value of type void was required for {:?}", expr)));
        }
        let actual = self.push_expr(expr, Some(&expected))?;
        self.cast(&actual, &expected)
    }

    /// Evaluate for side effects, popping any result.
    pub(super) fn gen_discarded(&mut self, expr: &ExpressionDef) -> Result<()> {
        let ty = self.push_expr(expr, None)?;
        if !ty.is_void() {
            self.code.emit_pop(ValueKind::of(&ty));
        }
        Ok(())
    }

    /// Push the value of `expr` in whatever type it naturally has and return
    /// that (erased) type. `expected` only steers constants.
    pub(super) fn push_expr(&mut self, expr: &ExpressionDef, expected: Option<&TypeDef>) -> Result<TypeDef> {
        match expr {
            ExpressionDef::Constant { ty, value } => self.push_constant(ty, value, expected),
            ExpressionDef::Variable(variable) => self.push_variable(variable),
            ExpressionDef::ArrayElement { array, index } => {
                let array_ty = self.push_expr(array, None)?;
                let element = element_type(&array_ty)?;
                self.gen_expr(index, &TypeDef::INT)?;
                self.code.emit(array_load(&element));
                Ok(element)
            }
            ExpressionDef::ArrayLength(array) => {
                let array_ty = self.push_expr(array, None)?;
                element_type(&array_ty)?;
                self.code.emit(Instruction::Arraylength);
                Ok(TypeDef::INT)
            }
            ExpressionDef::Cast { ty, expr } => {
                let target = self.erase(ty)?;
                let actual = self.push_expr(expr, Some(&target))?;
                self.cast(&actual, &target)?;
                Ok(target)
            }
            ExpressionDef::InvokeInstance { instance, method, args } => self.push_invoke(instance, method, args),
            ExpressionDef::InvokeStatic { owner, method, args } => {
                let owner = TypeDef::Class(owner.clone());
                let (parameters, return_type) = self.erase_signature(method, args.len())?;
                self.push_args(args, &parameters)?;
                self.invoke(InvokeKind::Static, &owner, &method.name, &parameters, &return_type)?;
                Ok(return_type)
            }
            ExpressionDef::NewInstance { ty, parameters, args } => self.push_new_instance(ty, parameters, args),
            ExpressionDef::NewArrayOfSize { ty, size } => {
                let array = self.erase(&TypeDef::Array(ty.clone()))?;
                self.gen_expr(size, &TypeDef::INT)?;
                self.emit_new_array(&array)?;
                Ok(array)
            }
            ExpressionDef::NewArrayInitialized { ty, values } => self.push_array_initialized(ty, values),
            ExpressionDef::InstanceOf { expr, ty } => {
                self.push_reference(expr)?;
                let index = self.class_index(ty)?;
                self.code.emit(Instruction::Instanceof(index));
                Ok(TypeDef::BOOLEAN)
            }
            ExpressionDef::And(..)
            | ExpressionDef::Or(..)
            | ExpressionDef::Not(_)
            | ExpressionDef::IsNull(_)
            | ExpressionDef::IsNotNull(_)
            | ExpressionDef::IsTrue(_)
            | ExpressionDef::IsFalse(_)
            | ExpressionDef::Compare { .. }
            | ExpressionDef::EqualsReferentially(..)
            | ExpressionDef::NotEqualsReferentially(..)
            | ExpressionDef::EqualsStructurally(..)
            | ExpressionDef::NotEqualsStructurally(..) => self.push_condition(expr),
            ExpressionDef::IfElse {
                condition,
                then,
                otherwise,
                ty,
            } => {
                let target = self.erase(ty)?;
                let otherwise_label = self.code.new_label();
                let end = self.code.new_label();
                self.jump_if(condition, false, otherwise_label)?;
                self.gen_expr(then, &target)?;
                self.code.emit_goto(end)?;
                self.code.bind_label(otherwise_label);
                self.gen_expr(otherwise, &target)?;
                self.code.bind_label(end);
                let vtype = self.vtype(&target)?;
                self.code.hint_stack(end, vec![vtype]);
                Ok(target)
            }
            ExpressionDef::Switch {
                expr,
                ty,
                cases,
                default,
            } => self.push_switch(expr, ty, cases, default),
            ExpressionDef::SwitchYieldCase { ty, body } => self.push_yield_case(ty, body),
            ExpressionDef::MathBinary { op, left, right } => self.push_math(*op, left, right),
            ExpressionDef::InvokeHashCode(value) => self.push_hash_code(value),
            ExpressionDef::InvokeGetClass(value) => self.push_get_class(value),
        }
    }

    /// Push a value that must be a reference, returning its type.
    pub(super) fn push_reference(&mut self, expr: &ExpressionDef) -> Result<TypeDef> {
        let ty = self.push_expr(expr, None)?;
        if ty.is_primitive() || ty.is_void() {
            return Err(LowerError::type_contract(format!(
                "expected a reference value, got {} from {:?}",
                ty, expr
            )));
        }
        Ok(ty)
    }

    pub(super) fn load_this(&mut self) -> Result<()> {
        let this = self
            .ctx
            .this()
            .ok_or_else(|| LowerError::type_contract("`this` used in a static method"))?;
        self.code.emit_load(ValueKind::Reference, this.slot);
        Ok(())
    }

    fn push_constant(&mut self, ty: &TypeDef, value: &ConstantValue, expected: Option<&TypeDef>) -> Result<TypeDef> {
        let ty = self.erase(ty)?;
        match value {
            ConstantValue::Null => {
                if ty.is_primitive() {
                    return Err(LowerError::type_contract(format!("null constant of primitive type {}", ty)));
                }
                self.code.emit(Instruction::Aconstnull);
                // null is whatever reference the context wants
                Ok(match expected {
                    Some(e) if !e.is_primitive() && !e.is_void() => e.clone(),
                    _ => ty,
                })
            }
            ConstantValue::String(s) => {
                let index = self.pool.string(s)?;
                self.code.emit_ldc(index);
                Ok(TypeDef::string())
            }
            ConstantValue::Type(t) => {
                self.push_class_literal(t)?;
                Ok(TypeDef::class("java.lang.Class"))
            }
            ConstantValue::EnumConstant(name) => {
                self.field_instruction(Instruction::Getstatic, &ty, name, &ty)?;
                Ok(ty)
            }
            ConstantValue::Array(values) => {
                let TypeDef::Array(array) = &ty else {
                    return Err(LowerError::type_contract(format!("array constant typed as {}", ty)));
                };
                let element = array.element_type();
                let elements: Vec<ExpressionDef> = values
                    .iter()
                    .map(|v| ExpressionDef::constant(element.clone(), v.clone()))
                    .collect();
                self.push_array_initialized(array, &elements)
            }
            literal => {
                let natural = TypeDef::Primitive(self.push_literal(literal)?);
                if ty.is_primitive() {
                    self.cast(&natural, &ty)?;
                    return Ok(ty);
                }
                match ty.unboxed() {
                    Some(p) if expected.is_some_and(|e| e.is_primitive()) => {
                        let unboxed = TypeDef::Primitive(p);
                        self.cast(&natural, &unboxed)?;
                        Ok(unboxed)
                    }
                    Some(_) => {
                        self.cast(&natural, &ty)?;
                        Ok(ty)
                    }
                    None => {
                        let Some(p) = natural.as_primitive() else {
                            return Err(LowerError::unsupported(format!("constant {:?}", literal)));
                        };
                        let wrapper = p.wrapper().as_type();
                        self.cast(&natural, &wrapper)?;
                        Ok(wrapper)
                    }
                }
            }
        }
    }

    fn push_literal(&mut self, value: &ConstantValue) -> Result<PrimitiveType> {
        Ok(match value {
            ConstantValue::Boolean(b) => {
                self.code.emit_int_const(i32::from(*b), self.pool)?;
                PrimitiveType::Boolean
            }
            ConstantValue::Byte(v) => {
                self.code.emit_int_const(i32::from(*v), self.pool)?;
                PrimitiveType::Byte
            }
            ConstantValue::Short(v) => {
                self.code.emit_int_const(i32::from(*v), self.pool)?;
                PrimitiveType::Short
            }
            ConstantValue::Char(v) => {
                self.code.emit_int_const(i32::from(*v), self.pool)?;
                PrimitiveType::Char
            }
            ConstantValue::Int(v) => {
                self.code.emit_int_const(*v, self.pool)?;
                PrimitiveType::Int
            }
            ConstantValue::Long(v) => {
                self.code.emit_long_const(*v, self.pool)?;
                PrimitiveType::Long
            }
            ConstantValue::Float(v) => {
                self.code.emit_float_const(*v, self.pool)?;
                PrimitiveType::Float
            }
            ConstantValue::Double(v) => {
                self.code.emit_double_const(*v, self.pool)?;
                PrimitiveType::Double
            }
            other => return Err(LowerError::unsupported(format!("constant {:?} is not a primitive literal", other))),
        })
    }

    fn push_class_literal(&mut self, ty: &TypeDef) -> Result<()> {
        let ty = self.erase(ty)?;
        match ty.as_primitive() {
            Some(p) => self.field_instruction(
                Instruction::Getstatic,
                &p.wrapper().as_type(),
                "TYPE",
                &TypeDef::class("java.lang.Class"),
            ),
            None => {
                let index = self.class_index(&ty)?;
                self.code.emit_ldc(index);
                Ok(())
            }
        }
    }

    fn push_variable(&mut self, variable: &VariableDef) -> Result<TypeDef> {
        match variable {
            VariableDef::Local { name, .. } => {
                let slot = self
                    .ctx
                    .local(name)
                    .ok_or_else(|| LowerError::type_contract(format!("unknown local `{}`", name)))?;
                self.code.emit_load(slot.kind(), slot.slot);
                Ok(slot.ty)
            }
            VariableDef::MethodParameter { name, .. } => {
                let slot = self
                    .ctx
                    .parameter(name)
                    .ok_or_else(|| LowerError::type_contract(format!("unknown parameter `{}`", name)))?;
                self.code.emit_load(slot.kind(), slot.slot);
                Ok(slot.ty)
            }
            VariableDef::This => {
                self.load_this()?;
                self.this_type()
            }
            VariableDef::Super { ty } => {
                self.load_this()?;
                match ty {
                    Some(c) => self.erase(&TypeDef::Class(c.clone())),
                    None => self.erase(&TypeDef::Super),
                }
            }
            VariableDef::Field { instance, name, ty } => {
                let owner = self.push_reference(instance)?;
                let ty = self.erase(ty)?;
                self.field_instruction(Instruction::Getfield, &owner, name, &ty)?;
                Ok(ty)
            }
            VariableDef::StaticField { owner, name, ty } => {
                let owner = self.erase(owner)?;
                let ty = self.erase(ty)?;
                self.field_instruction(Instruction::Getstatic, &owner, name, &ty)?;
                Ok(ty)
            }
            VariableDef::Exception { .. } => {
                let slot = self
                    .ctx
                    .current_exception()
                    .ok_or_else(|| LowerError::type_contract("caught exception read outside a catch body"))?;
                self.code.emit_load(ValueKind::Reference, slot.slot);
                Ok(slot.ty)
            }
        }
    }

    /// Erased parameter and return types, checking the argument count.
    pub(super) fn erase_signature(&self, method: &MethodSig, arg_count: usize) -> Result<(Vec<TypeDef>, TypeDef)> {
        if method.parameters.len() != arg_count {
            return Err(LowerError::type_contract(format!(
                "{} takes {} arguments, {} given",
                method.name,
                method.parameters.len(),
                arg_count
            )));
        }
        let parameters = method
            .parameters
            .iter()
            .map(|p| self.erase(p))
            .collect::<Result<Vec<_>>>()?;
        Ok((parameters, self.erase(&method.return_type)?))
    }

    pub(super) fn push_args(&mut self, args: &[ExpressionDef], parameters: &[TypeDef]) -> Result<()> {
        for (arg, parameter) in args.iter().zip(parameters) {
            self.gen_expr(arg, parameter)?;
        }
        Ok(())
    }

    fn push_invoke(&mut self, instance: &ExpressionDef, method: &MethodSig, args: &[ExpressionDef]) -> Result<TypeDef> {
        let (parameters, return_type) = self.erase_signature(method, args.len())?;
        let (kind, owner) = match instance {
            ExpressionDef::Variable(VariableDef::Super { .. }) => {
                let owner = self.push_expr(instance, None)?;
                (InvokeKind::Special, owner)
            }
            _ if method.is_constructor() => {
                let owner = self.push_reference(instance)?;
                (InvokeKind::Special, owner)
            }
            ExpressionDef::Variable(VariableDef::This)
                if self.is_own_private(&method.name, &parameters, &return_type) =>
            {
                let owner = self.push_reference(instance)?;
                (InvokeKind::Special, owner)
            }
            _ => {
                let owner = self.push_reference(instance)?;
                let kind = if self.is_interface(&owner) {
                    InvokeKind::Interface
                } else {
                    InvokeKind::Virtual
                };
                (kind, owner)
            }
        };
        self.push_args(args, &parameters)?;
        self.invoke(kind, &owner, &method.name, &parameters, &return_type)?;
        Ok(return_type)
    }

    /// Private methods of the enclosing object dispatch with `invokespecial`.
    /// Overloads are told apart by their erased descriptor types.
    fn is_own_private(&self, name: &str, parameters: &[TypeDef], return_type: &TypeDef) -> bool {
        let Some(object) = self.object else {
            return false;
        };
        object.methods().iter().any(|m| {
            m.name == name
                && m.modifiers.contains(&Modifier::Private)
                && m.parameters.len() == parameters.len()
                && self.erase(&m.return_type).is_ok_and(|r| &r == return_type)
                && m
                    .parameters
                    .iter()
                    .zip(parameters)
                    .all(|(p, erased)| self.erase(&p.ty).is_ok_and(|t| &t == erased))
        })
    }

    fn push_new_instance(&mut self, ty: &ClassTypeDef, parameters: &[TypeDef], args: &[ExpressionDef]) -> Result<TypeDef> {
        let class = self.erase(&TypeDef::Class(ty.clone()))?;
        let (parameters, _) = self.erase_signature(&MethodSig::constructor(parameters.to_vec()), args.len())?;
        let index = self.class_index(&class)?;
        self.code.emit(Instruction::New(index));
        self.code.emit(Instruction::Dup);
        self.push_args(args, &parameters)?;
        self.invoke(InvokeKind::Special, &class, "<init>", &parameters, &TypeDef::VOID)?;
        Ok(class)
    }

    /// `newarray`/`anewarray` for the count on top of the stack.
    fn emit_new_array(&mut self, array: &TypeDef) -> Result<()> {
        let element = element_type(array)?;
        match element.as_primitive() {
            Some(p) => self.code.emit(Instruction::Newarray(array_type_code(p))),
            None => {
                let index = self.class_index(&element)?;
                self.code.emit(Instruction::Anewarray(index));
            }
        }
        Ok(())
    }

    fn push_array_initialized(&mut self, ty: &ArrayTypeDef, values: &[ExpressionDef]) -> Result<TypeDef> {
        let array = self.erase(&TypeDef::Array(ty.clone()))?;
        let element = element_type(&array)?;
        let length = i32::try_from(values.len())
            .map_err(|_| LowerError::codegen("array initializer is too large"))?;
        self.code.emit_int_const(length, self.pool)?;
        self.emit_new_array(&array)?;
        for (i, value) in (0..length).zip(values) {
            self.code.emit(Instruction::Dup);
            self.code.emit_int_const(i, self.pool)?;
            self.gen_expr(value, &element)?;
            self.code.emit(array_store(&element));
        }
        Ok(array)
    }

    /// Boolean value of a condition, built on its branch form.
    fn push_condition(&mut self, condition: &ExpressionDef) -> Result<TypeDef> {
        let when_false = self.code.new_label();
        let end = self.code.new_label();
        self.jump_if(condition, false, when_false)?;
        self.code.emit(Instruction::Iconst1);
        self.code.emit_goto(end)?;
        self.code.bind_label(when_false);
        self.code.emit(Instruction::Iconst0);
        self.code.bind_label(end);
        Ok(TypeDef::BOOLEAN)
    }

    fn push_yield_case(&mut self, ty: &TypeDef, body: &StatementDef) -> Result<TypeDef> {
        let target = self.erase(ty)?;
        let end = self.code.new_label();
        self.yields.push(YieldTarget {
            ty: target.clone(),
            end,
        });
        let lowered = self.gen_scoped(body);
        self.yields.pop();
        lowered?;
        if self.code.is_reachable() {
            return Err(LowerError::type_contract(
                "switch yield case completes without yielding a value",
            ));
        }
        self.code.bind_label(end);
        let vtype = self.vtype(&target)?;
        self.code.hint_stack(end, vec![vtype]);
        Ok(target)
    }

    fn push_math(&mut self, op: MathOp, left: &ExpressionDef, right: &ExpressionDef) -> Result<TypeDef> {
        let left_ty = self.erase(&left.ty())?;
        let right_ty = self.erase(&right.ty())?;
        let result = math_result_type(op, &left_ty, &right_ty);
        if result.is_string() {
            return self.push_string_concat(left, right);
        }
        if numeric_kind(&left_ty).is_none() || numeric_kind(&right_ty).is_none() {
            return Err(LowerError::type_contract(format!(
                "operator {} needs numeric operands, got {} and {}",
                op.symbol(),
                left_ty,
                right_ty
            )));
        }
        let Some(p) = result.as_primitive() else {
            return Err(LowerError::type_contract(format!("operator {} yields {}", op.symbol(), result)));
        };
        if p == PrimitiveType::Boolean {
            self.gen_expr(left, &TypeDef::BOOLEAN)?;
            self.gen_expr(right, &TypeDef::BOOLEAN)?;
            self.code.emit(math_instruction(op, PrimitiveType::Int)?);
            return Ok(TypeDef::BOOLEAN);
        }
        self.gen_expr(left, &result)?;
        if op.is_shift() {
            self.gen_expr(right, &TypeDef::INT)?;
        } else {
            self.gen_expr(right, &result)?;
        }
        self.code.emit(math_instruction(op, p)?);
        Ok(result)
    }
}
