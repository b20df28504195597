use std::sync::Arc;

use super::stmt::{StatementDef, SwitchCase};
use super::types::{ArrayTypeDef, ClassTypeDef, PrimitiveType, TypeDef};

/// Name and erased signature of an invoked method or constructor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodSig {
    pub name: String,
    pub parameters: Vec<TypeDef>,
    pub return_type: TypeDef,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, parameters: Vec<TypeDef>, return_type: TypeDef) -> Self {
        MethodSig {
            name: name.into(),
            parameters,
            return_type,
        }
    }

    pub fn constructor(parameters: Vec<TypeDef>) -> Self {
        MethodSig::new("<init>", parameters, TypeDef::VOID)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// Literal payload of a constant expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A class literal.
    Type(TypeDef),
    /// Elements of an array constant; the constant's type is the array type.
    Array(Vec<ConstantValue>),
    /// A constant of the enum named by the constant's type.
    EnumConstant(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn invert(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

impl MathOp {
    pub fn is_shift(self) -> bool {
        matches!(self, MathOp::Shl | MathOp::Shr | MathOp::Ushr)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, MathOp::And | MathOp::Or | MathOp::Xor)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
            MathOp::Rem => "%",
            MathOp::And => "&",
            MathOp::Or => "|",
            MathOp::Xor => "^",
            MathOp::Shl => "<<",
            MathOp::Shr => ">>",
            MathOp::Ushr => ">>>",
        }
    }
}

/// Readable and (for locals and fields) assignable storage.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableDef {
    Local {
        name: String,
        ty: TypeDef,
    },
    MethodParameter {
        name: String,
        ty: TypeDef,
    },
    This,
    /// `super`, optionally naming the supertype whose method is dispatched.
    Super {
        ty: Option<ClassTypeDef>,
    },
    Field {
        instance: Box<ExpressionDef>,
        name: String,
        ty: TypeDef,
    },
    StaticField {
        owner: TypeDef,
        name: String,
        ty: TypeDef,
    },
    /// The exception caught by the innermost enclosing catch body.
    Exception {
        ty: TypeDef,
    },
}

impl VariableDef {
    pub fn ty(&self) -> TypeDef {
        match self {
            VariableDef::Local { ty, .. }
            | VariableDef::MethodParameter { ty, .. }
            | VariableDef::Field { ty, .. }
            | VariableDef::StaticField { ty, .. }
            | VariableDef::Exception { ty } => ty.clone(),
            VariableDef::This => TypeDef::This,
            VariableDef::Super { ty: None } => TypeDef::Super,
            VariableDef::Super { ty: Some(c) } => TypeDef::Class(c.clone()),
        }
    }
}

/// An expression node. Every variant has a statically known type, see [`ExpressionDef::ty`].
#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionDef {
    Constant {
        ty: TypeDef,
        value: ConstantValue,
    },
    Variable(VariableDef),
    ArrayElement {
        array: Box<ExpressionDef>,
        index: Box<ExpressionDef>,
    },
    ArrayLength(Box<ExpressionDef>),
    Cast {
        ty: TypeDef,
        expr: Box<ExpressionDef>,
    },
    InvokeInstance {
        instance: Box<ExpressionDef>,
        method: MethodSig,
        args: Vec<ExpressionDef>,
    },
    InvokeStatic {
        owner: ClassTypeDef,
        method: MethodSig,
        args: Vec<ExpressionDef>,
    },
    NewInstance {
        ty: ClassTypeDef,
        parameters: Vec<TypeDef>,
        args: Vec<ExpressionDef>,
    },
    NewArrayOfSize {
        ty: ArrayTypeDef,
        size: Box<ExpressionDef>,
    },
    NewArrayInitialized {
        ty: ArrayTypeDef,
        values: Vec<ExpressionDef>,
    },
    And(Box<ExpressionDef>, Box<ExpressionDef>),
    Or(Box<ExpressionDef>, Box<ExpressionDef>),
    Not(Box<ExpressionDef>),
    IsNull(Box<ExpressionDef>),
    IsNotNull(Box<ExpressionDef>),
    IsTrue(Box<ExpressionDef>),
    IsFalse(Box<ExpressionDef>),
    Compare {
        op: CompareOp,
        left: Box<ExpressionDef>,
        right: Box<ExpressionDef>,
    },
    EqualsReferentially(Box<ExpressionDef>, Box<ExpressionDef>),
    NotEqualsReferentially(Box<ExpressionDef>, Box<ExpressionDef>),
    EqualsStructurally(Box<ExpressionDef>, Box<ExpressionDef>),
    NotEqualsStructurally(Box<ExpressionDef>, Box<ExpressionDef>),
    InstanceOf {
        expr: Box<ExpressionDef>,
        ty: TypeDef,
    },
    IfElse {
        condition: Box<ExpressionDef>,
        then: Box<ExpressionDef>,
        otherwise: Box<ExpressionDef>,
        ty: TypeDef,
    },
    Switch {
        expr: Box<ExpressionDef>,
        ty: TypeDef,
        cases: Vec<SwitchCase<ExpressionDef>>,
        default: Box<ExpressionDef>,
    },
    /// A statement arm of a switch expression; its `return` yields the arm value.
    SwitchYieldCase {
        ty: TypeDef,
        body: Box<StatementDef>,
    },
    MathBinary {
        op: MathOp,
        left: Box<ExpressionDef>,
        right: Box<ExpressionDef>,
    },
    InvokeHashCode(Box<ExpressionDef>),
    InvokeGetClass(Box<ExpressionDef>),
}

impl ExpressionDef {
    pub fn ty(&self) -> TypeDef {
        match self {
            ExpressionDef::Constant { ty, .. } => ty.clone(),
            ExpressionDef::Variable(v) => v.ty(),
            ExpressionDef::ArrayElement { array, .. } => match array.ty() {
                TypeDef::Array(a) => a.element_type(),
                _ => TypeDef::object(),
            },
            ExpressionDef::ArrayLength(_) => TypeDef::INT,
            ExpressionDef::Cast { ty, .. } => ty.clone(),
            ExpressionDef::InvokeInstance { method, .. } | ExpressionDef::InvokeStatic { method, .. } => {
                method.return_type.clone()
            }
            ExpressionDef::NewInstance { ty, .. } => TypeDef::Class(ty.clone()),
            ExpressionDef::NewArrayOfSize { ty, .. } | ExpressionDef::NewArrayInitialized { ty, .. } => {
                TypeDef::Array(ty.clone())
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
            | ExpressionDef::NotEqualsStructurally(..)
            | ExpressionDef::InstanceOf { .. } => TypeDef::BOOLEAN,
            ExpressionDef::IfElse { ty, .. }
            | ExpressionDef::Switch { ty, .. }
            | ExpressionDef::SwitchYieldCase { ty, .. } => ty.clone(),
            ExpressionDef::MathBinary { op, left, right } => math_result_type(*op, &left.ty(), &right.ty()),
            ExpressionDef::InvokeHashCode(_) => TypeDef::INT,
            ExpressionDef::InvokeGetClass(_) => TypeDef::class("java.lang.Class"),
        }
    }

    /// Variants that can be lowered straight into a conditional jump.
    pub fn is_condition(&self) -> bool {
        matches!(
            self,
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
                | ExpressionDef::NotEqualsStructurally(..)
                | ExpressionDef::InstanceOf { .. }
        )
    }

    // -- constants --

    pub fn constant(ty: TypeDef, value: ConstantValue) -> Self {
        ExpressionDef::Constant { ty, value }
    }

    pub fn null() -> Self {
        ExpressionDef::constant(TypeDef::object(), ConstantValue::Null)
    }

    pub fn typed_null(ty: TypeDef) -> Self {
        ExpressionDef::constant(ty, ConstantValue::Null)
    }

    pub fn boolean(value: bool) -> Self {
        ExpressionDef::constant(TypeDef::BOOLEAN, ConstantValue::Boolean(value))
    }

    pub fn int(value: i32) -> Self {
        ExpressionDef::constant(TypeDef::INT, ConstantValue::Int(value))
    }

    pub fn long(value: i64) -> Self {
        ExpressionDef::constant(TypeDef::LONG, ConstantValue::Long(value))
    }

    pub fn float(value: f32) -> Self {
        ExpressionDef::constant(TypeDef::FLOAT, ConstantValue::Float(value))
    }

    pub fn double(value: f64) -> Self {
        ExpressionDef::constant(TypeDef::DOUBLE, ConstantValue::Double(value))
    }

    pub fn char(value: char) -> Self {
        let mut units = [0u16; 2];
        let unit = value.encode_utf16(&mut units)[0];
        ExpressionDef::constant(TypeDef::CHAR, ConstantValue::Char(unit))
    }

    pub fn string(value: impl Into<String>) -> Self {
        ExpressionDef::constant(TypeDef::string(), ConstantValue::String(value.into()))
    }

    pub fn class_literal(ty: TypeDef) -> Self {
        ExpressionDef::constant(TypeDef::class("java.lang.Class"), ConstantValue::Type(ty))
    }

    pub fn enum_constant(owner: ClassTypeDef, name: impl Into<String>) -> Self {
        ExpressionDef::constant(TypeDef::Class(owner), ConstantValue::EnumConstant(name.into()))
    }

    // -- variables --

    pub fn local(name: impl Into<String>, ty: TypeDef) -> Self {
        ExpressionDef::Variable(VariableDef::Local {
            name: name.into(),
            ty,
        })
    }

    pub fn param(name: impl Into<String>, ty: TypeDef) -> Self {
        ExpressionDef::Variable(VariableDef::MethodParameter {
            name: name.into(),
            ty,
        })
    }

    pub fn this() -> Self {
        ExpressionDef::Variable(VariableDef::This)
    }

    pub fn super_ref() -> Self {
        ExpressionDef::Variable(VariableDef::Super { ty: None })
    }

    pub fn exception(ty: TypeDef) -> Self {
        ExpressionDef::Variable(VariableDef::Exception { ty })
    }

    pub fn static_field(owner: TypeDef, name: impl Into<String>, ty: TypeDef) -> Self {
        ExpressionDef::Variable(VariableDef::StaticField {
            owner,
            name: name.into(),
            ty,
        })
    }

    pub fn field(self, name: impl Into<String>, ty: TypeDef) -> Self {
        ExpressionDef::Variable(VariableDef::Field {
            instance: Box::new(self),
            name: name.into(),
            ty,
        })
    }

    // -- operations --

    pub fn cast(self, ty: TypeDef) -> Self {
        ExpressionDef::Cast {
            ty,
            expr: Box::new(self),
        }
    }

    pub fn invoke(self, method: MethodSig, args: Vec<ExpressionDef>) -> Self {
        ExpressionDef::InvokeInstance {
            instance: Box::new(self),
            method,
            args,
        }
    }

    pub fn invoke_static(owner: ClassTypeDef, method: MethodSig, args: Vec<ExpressionDef>) -> Self {
        ExpressionDef::InvokeStatic { owner, method, args }
    }

    pub fn new_instance(ty: ClassTypeDef, parameters: Vec<TypeDef>, args: Vec<ExpressionDef>) -> Self {
        ExpressionDef::NewInstance { ty, parameters, args }
    }

    pub fn new_array(component: TypeDef, size: ExpressionDef) -> Self {
        ExpressionDef::NewArrayOfSize {
            ty: ArrayTypeDef::new(component, 1),
            size: Box::new(size),
        }
    }

    pub fn array_of(component: TypeDef, values: Vec<ExpressionDef>) -> Self {
        ExpressionDef::NewArrayInitialized {
            ty: ArrayTypeDef::new(component, 1),
            values,
        }
    }

    pub fn element(self, index: ExpressionDef) -> Self {
        ExpressionDef::ArrayElement {
            array: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn length(self) -> Self {
        ExpressionDef::ArrayLength(Box::new(self))
    }

    pub fn and(self, other: ExpressionDef) -> Self {
        ExpressionDef::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: ExpressionDef) -> Self {
        ExpressionDef::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        ExpressionDef::Not(Box::new(self))
    }

    pub fn is_null(self) -> Self {
        ExpressionDef::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Self {
        ExpressionDef::IsNotNull(Box::new(self))
    }

    pub fn is_true(self) -> Self {
        ExpressionDef::IsTrue(Box::new(self))
    }

    pub fn is_false(self) -> Self {
        ExpressionDef::IsFalse(Box::new(self))
    }

    pub fn compare(self, op: CompareOp, other: ExpressionDef) -> Self {
        ExpressionDef::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn equals_referentially(self, other: ExpressionDef) -> Self {
        ExpressionDef::EqualsReferentially(Box::new(self), Box::new(other))
    }

    pub fn not_equals_referentially(self, other: ExpressionDef) -> Self {
        ExpressionDef::NotEqualsReferentially(Box::new(self), Box::new(other))
    }

    pub fn equals_structurally(self, other: ExpressionDef) -> Self {
        ExpressionDef::EqualsStructurally(Box::new(self), Box::new(other))
    }

    pub fn not_equals_structurally(self, other: ExpressionDef) -> Self {
        ExpressionDef::NotEqualsStructurally(Box::new(self), Box::new(other))
    }

    pub fn instance_of(self, ty: TypeDef) -> Self {
        ExpressionDef::InstanceOf {
            expr: Box::new(self),
            ty,
        }
    }

    pub fn if_else(condition: ExpressionDef, then: ExpressionDef, otherwise: ExpressionDef, ty: TypeDef) -> Self {
        ExpressionDef::IfElse {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            ty,
        }
    }

    pub fn math(self, op: MathOp, other: ExpressionDef) -> Self {
        ExpressionDef::MathBinary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn hash_code(self) -> Self {
        ExpressionDef::InvokeHashCode(Box::new(self))
    }

    pub fn get_class(self) -> Self {
        ExpressionDef::InvokeGetClass(Box::new(self))
    }

    pub fn switch(
        expr: ExpressionDef,
        ty: TypeDef,
        cases: Vec<SwitchCase<ExpressionDef>>,
        default: ExpressionDef,
    ) -> Self {
        ExpressionDef::Switch {
            expr: Box::new(expr),
            ty,
            cases,
            default: Box::new(default),
        }
    }

    pub fn yield_case(ty: TypeDef, body: StatementDef) -> Self {
        ExpressionDef::SwitchYieldCase {
            ty,
            body: Box::new(body),
        }
    }

    // -- statements built from expressions --

    pub fn returning(self) -> StatementDef {
        StatementDef::Return(Some(self))
    }

    pub fn throwing(self) -> StatementDef {
        StatementDef::Throw(self)
    }

    pub fn as_statement(self) -> StatementDef {
        StatementDef::Expression(self)
    }
}

/// Shared case body, for building switches whose keys reuse one arm.
pub fn shared<T>(body: T) -> Arc<T> {
    Arc::new(body)
}

/// Result type of a binary math operation after numeric promotion.
///
/// `+` with a `String` operand is concatenation. Boolean operands of the
/// bitwise operators stay boolean.
pub fn math_result_type(op: MathOp, left: &TypeDef, right: &TypeDef) -> TypeDef {
    if op == MathOp::Add && (left.is_string() || right.is_string()) {
        return TypeDef::string();
    }
    let l = numeric_kind(left);
    let r = numeric_kind(right);
    if op.is_bitwise() && l == Some(PrimitiveType::Boolean) && r == Some(PrimitiveType::Boolean) {
        return TypeDef::BOOLEAN;
    }
    if op.is_shift() {
        return TypeDef::Primitive(unary_promotion(l.unwrap_or(PrimitiveType::Int)));
    }
    match (l, r) {
        (Some(a), Some(b)) => TypeDef::Primitive(binary_promotion(a, b)),
        _ => left.clone(),
    }
}

/// The primitive a value of this type computes with, unboxing wrappers.
pub fn numeric_kind(ty: &TypeDef) -> Option<PrimitiveType> {
    match ty {
        TypeDef::Primitive(p) if *p != PrimitiveType::Void => Some(*p),
        other => other.unboxed(),
    }
}

pub fn unary_promotion(p: PrimitiveType) -> PrimitiveType {
    match p {
        PrimitiveType::Byte | PrimitiveType::Short | PrimitiveType::Char | PrimitiveType::Boolean => {
            PrimitiveType::Int
        }
        other => other,
    }
}

pub fn binary_promotion(a: PrimitiveType, b: PrimitiveType) -> PrimitiveType {
    use PrimitiveType::*;
    if a == Double || b == Double {
        Double
    } else if a == Float || b == Float {
        Float
    } else if a == Long || b == Long {
        Long
    } else {
        Int
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_types_follow_promotion() {
        let int = ExpressionDef::int(1);
        let long = ExpressionDef::long(2);
        assert_eq!(int.clone().math(MathOp::Add, long.clone()).ty(), TypeDef::LONG);
        assert_eq!(long.clone().math(MathOp::Shl, int.clone()).ty(), TypeDef::LONG);
        assert_eq!(int.clone().math(MathOp::Shl, long).ty(), TypeDef::INT);
        assert_eq!(
            ExpressionDef::string("a").math(MathOp::Add, int.clone()).ty(),
            TypeDef::string()
        );
        let boxed = ExpressionDef::local("b", TypeDef::class("java.lang.Double"));
        assert_eq!(boxed.math(MathOp::Mul, int).ty(), TypeDef::DOUBLE);
    }

    #[test]
    fn comparison_inversion_is_an_involution() {
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
        ] {
            assert_eq!(op.invert().invert(), op);
            assert_ne!(op.invert(), op);
        }
    }

    #[test]
    fn element_type_of_multi_dimensional_array() {
        let matrix = ExpressionDef::local("m", TypeDef::array(TypeDef::INT, 2));
        let row = matrix.element(ExpressionDef::int(0));
        assert_eq!(row.ty(), TypeDef::array(TypeDef::INT, 1));
        assert_eq!(row.element(ExpressionDef::int(1)).ty(), TypeDef::INT);
    }
}
