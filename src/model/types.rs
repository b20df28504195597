use std::fmt;

/// Primitive types, including `void` for method returns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveType {
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
            PrimitiveType::Void => 'V',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Void => "void",
        }
    }

    /// Binary name of the boxed counterpart.
    pub fn wrapper_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
            PrimitiveType::Void => "java.lang.Void",
        }
    }

    pub fn wrapper(self) -> ClassTypeDef {
        ClassTypeDef::new(self.wrapper_name())
    }

    /// Primitive for a wrapper class binary name.
    pub fn from_wrapper(name: &str) -> Option<PrimitiveType> {
        Some(match name {
            "java.lang.Boolean" => PrimitiveType::Boolean,
            "java.lang.Byte" => PrimitiveType::Byte,
            "java.lang.Short" => PrimitiveType::Short,
            "java.lang.Character" => PrimitiveType::Char,
            "java.lang.Integer" => PrimitiveType::Int,
            "java.lang.Long" => PrimitiveType::Long,
            "java.lang.Float" => PrimitiveType::Float,
            "java.lang.Double" => PrimitiveType::Double,
            _ => return None,
        })
    }

    /// Takes two local slots and two stack words.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveType::Long | PrimitiveType::Double)
    }

    /// Computational type is `int` on the operand stack.
    pub fn is_int_like(self) -> bool {
        matches!(
            self,
            PrimitiveType::Boolean
                | PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Char
                | PrimitiveType::Int
        )
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean | PrimitiveType::Void)
    }
}

/// A class or interface reference by binary name (`java.util.List`,
/// `com.acme.Outer$Inner`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassTypeDef {
    pub name: String,
    pub is_interface: bool,
}

impl ClassTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        ClassTypeDef {
            name: name.into(),
            is_interface: false,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        ClassTypeDef {
            name: name.into(),
            is_interface: true,
        }
    }

    pub fn object() -> Self {
        ClassTypeDef::new("java.lang.Object")
    }

    pub fn string() -> Self {
        ClassTypeDef::new("java.lang.String")
    }

    /// Internal form with slashes.
    pub fn internal_name(&self) -> String {
        self.name.replace('.', "/")
    }

    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit('.').next().unwrap_or(&self.name);
        tail.rsplit('$').next().unwrap_or(tail)
    }

    pub fn as_type(&self) -> TypeDef {
        TypeDef::Class(self.clone())
    }
}

impl From<ClassTypeDef> for TypeDef {
    fn from(value: ClassTypeDef) -> Self {
        TypeDef::Class(value)
    }
}

/// Array type. The component is never itself an array; extra dimensions
/// live in `dimensions`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayTypeDef {
    component: Box<TypeDef>,
    dimensions: u8,
}

impl ArrayTypeDef {
    pub fn new(component: TypeDef, dimensions: u8) -> Self {
        match component {
            TypeDef::Array(inner) => ArrayTypeDef {
                dimensions: inner.dimensions.saturating_add(dimensions.max(1)),
                component: inner.component,
            },
            other => ArrayTypeDef {
                component: Box::new(other),
                dimensions: dimensions.max(1),
            },
        }
    }

    pub fn component(&self) -> &TypeDef {
        &self.component
    }

    pub fn dimensions(&self) -> u8 {
        self.dimensions
    }

    /// Type of one element: the component, or an array with one dimension less.
    pub fn element_type(&self) -> TypeDef {
        if self.dimensions > 1 {
            TypeDef::Array(ArrayTypeDef {
                component: self.component.clone(),
                dimensions: self.dimensions - 1,
            })
        } else {
            (*self.component).clone()
        }
    }
}

/// A type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDef {
    Primitive(PrimitiveType),
    Class(ClassTypeDef),
    Parameterized {
        raw: ClassTypeDef,
        arguments: Vec<TypeDef>,
    },
    Array(ArrayTypeDef),
    TypeVariable {
        name: String,
        bounds: Vec<TypeDef>,
    },
    Wildcard {
        upper: Vec<TypeDef>,
        lower: Vec<TypeDef>,
    },
    /// The enclosing object.
    This,
    /// The enclosing object's superclass.
    Super,
}

impl TypeDef {
    pub const VOID: TypeDef = TypeDef::Primitive(PrimitiveType::Void);
    pub const BOOLEAN: TypeDef = TypeDef::Primitive(PrimitiveType::Boolean);
    pub const BYTE: TypeDef = TypeDef::Primitive(PrimitiveType::Byte);
    pub const SHORT: TypeDef = TypeDef::Primitive(PrimitiveType::Short);
    pub const CHAR: TypeDef = TypeDef::Primitive(PrimitiveType::Char);
    pub const INT: TypeDef = TypeDef::Primitive(PrimitiveType::Int);
    pub const LONG: TypeDef = TypeDef::Primitive(PrimitiveType::Long);
    pub const FLOAT: TypeDef = TypeDef::Primitive(PrimitiveType::Float);
    pub const DOUBLE: TypeDef = TypeDef::Primitive(PrimitiveType::Double);

    pub fn class(name: impl Into<String>) -> TypeDef {
        TypeDef::Class(ClassTypeDef::new(name))
    }

    pub fn interface(name: impl Into<String>) -> TypeDef {
        TypeDef::Class(ClassTypeDef::interface(name))
    }

    pub fn object() -> TypeDef {
        TypeDef::Class(ClassTypeDef::object())
    }

    pub fn string() -> TypeDef {
        TypeDef::Class(ClassTypeDef::string())
    }

    pub fn array(component: TypeDef, dimensions: u8) -> TypeDef {
        TypeDef::Array(ArrayTypeDef::new(component, dimensions))
    }

    pub fn parameterized(raw: ClassTypeDef, arguments: Vec<TypeDef>) -> TypeDef {
        TypeDef::Parameterized { raw, arguments }
    }

    pub fn type_variable(name: impl Into<String>, bounds: Vec<TypeDef>) -> TypeDef {
        TypeDef::TypeVariable {
            name: name.into(),
            bounds,
        }
    }

    pub fn wildcard(upper: Vec<TypeDef>, lower: Vec<TypeDef>) -> TypeDef {
        TypeDef::Wildcard { upper, lower }
    }

    pub fn to_array(&self) -> TypeDef {
        TypeDef::array(self.clone(), 1)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDef::Primitive(p) if *p != PrimitiveType::Void)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDef::Primitive(PrimitiveType::Void))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeDef::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDef::Array(_))
    }

    /// Two stack words.
    pub fn is_wide(&self) -> bool {
        matches!(self, TypeDef::Primitive(p) if p.is_wide())
    }

    pub fn is_boolean(&self) -> bool {
        *self == TypeDef::BOOLEAN
    }

    /// Class name when this is a class or parameterized class reference.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeDef::Class(c) => Some(&c.name),
            TypeDef::Parameterized { raw, .. } => Some(&raw.name),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        self.class_name() == Some("java.lang.String")
    }

    pub fn is_interface(&self) -> bool {
        match self {
            TypeDef::Class(c) => c.is_interface,
            TypeDef::Parameterized { raw, .. } => raw.is_interface,
            _ => false,
        }
    }

    /// Primitive behind a wrapper class, if this is one.
    pub fn unboxed(&self) -> Option<PrimitiveType> {
        self.class_name().and_then(PrimitiveType::from_wrapper)
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDef::Primitive(p) => write!(f, "{}", p.name()),
            TypeDef::Class(c) => write!(f, "{}", c.name),
            TypeDef::Parameterized { raw, arguments } => {
                write!(f, "{}<", raw.name)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            TypeDef::Array(a) => {
                write!(f, "{}", a.component())?;
                for _ in 0..a.dimensions() {
                    write!(f, "[]")?;
                }
                Ok(())
            }
            TypeDef::TypeVariable { name, .. } => write!(f, "{}", name),
            TypeDef::Wildcard { upper, lower } => {
                if let Some(l) = lower.first() {
                    write!(f, "? super {}", l)
                } else if let Some(u) = upper.first() {
                    write!(f, "? extends {}", u)
                } else {
                    write!(f, "?")
                }
            }
            TypeDef::This => write!(f, "this"),
            TypeDef::Super => write!(f, "super"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_arrays_collapse_into_dimensions() {
        let inner = TypeDef::array(TypeDef::INT, 2);
        let outer = TypeDef::array(inner, 1);
        match outer {
            TypeDef::Array(a) => {
                assert_eq!(a.component(), &TypeDef::INT);
                assert_eq!(a.dimensions(), 3);
                assert_eq!(a.element_type(), TypeDef::array(TypeDef::INT, 2));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn wrapper_round_trip() {
        for p in [
            PrimitiveType::Boolean,
            PrimitiveType::Char,
            PrimitiveType::Int,
            PrimitiveType::Double,
        ] {
            assert_eq!(PrimitiveType::from_wrapper(p.wrapper_name()), Some(p));
        }
        assert_eq!(TypeDef::class("java.lang.Long").unboxed(), Some(PrimitiveType::Long));
        assert_eq!(TypeDef::string().unboxed(), None);
    }

    #[test]
    fn simple_name_strips_package_and_outer() {
        assert_eq!(ClassTypeDef::new("a.b.Outer$Inner").simple_name(), "Inner");
        assert_eq!(ClassTypeDef::new("Plain").simple_name(), "Plain");
    }
}
