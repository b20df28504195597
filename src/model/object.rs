use std::collections::BTreeSet;

use super::expr::ExpressionDef;
use super::stmt::StatementDef;
use super::types::{ClassTypeDef, TypeDef};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Synchronized,
    Volatile,
    Transient,
    Native,
    Strictfp,
    /// Interface method with a body.
    Default,
    /// Enum class or enum constant field; set by desugaring.
    Enum,
    /// Compiler-generated member.
    Synthetic,
}

pub type Modifiers = BTreeSet<Modifier>;

pub fn modifiers(list: &[Modifier]) -> Modifiers {
    list.iter().copied().collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDef,
    pub modifiers: Modifiers,
    pub initializer: Option<ExpressionDef>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        FieldDef {
            name: name.into(),
            ty,
            modifiers: Modifiers::new(),
            initializer: None,
        }
    }

    pub fn with_modifiers(mut self, list: &[Modifier]) -> Self {
        self.modifiers.extend(list.iter().copied());
        self
    }

    pub fn with_initializer(mut self, initializer: ExpressionDef) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterDef {
    pub name: String,
    pub ty: TypeDef,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        ParameterDef { name: name.into(), ty }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub modifiers: Modifiers,
    pub parameters: Vec<ParameterDef>,
    pub return_type: TypeDef,
    pub statements: Vec<StatementDef>,
    /// Last parameter is a varargs array.
    pub varargs: bool,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, return_type: TypeDef) -> Self {
        MethodDef {
            name: name.into(),
            modifiers: Modifiers::new(),
            parameters: Vec::new(),
            return_type,
            statements: Vec::new(),
            varargs: false,
        }
    }

    pub fn constructor() -> Self {
        MethodDef::new("<init>", TypeDef::VOID)
    }

    pub fn with_modifiers(mut self, list: &[Modifier]) -> Self {
        self.modifiers.extend(list.iter().copied());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, ty: TypeDef) -> Self {
        self.parameters.push(ParameterDef::new(name, ty));
        self
    }

    pub fn with_statement(mut self, statement: StatementDef) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn with_statements(mut self, statements: Vec<StatementDef>) -> Self {
        self.statements.extend(statements);
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    pub fn parameter_types(&self) -> Vec<TypeDef> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    /// Signature used to invoke this method.
    pub fn signature(&self) -> super::expr::MethodSig {
        super::expr::MethodSig::new(self.name.clone(), self.parameter_types(), self.return_type.clone())
    }
}

/// A bean property, desugared into a field plus accessors.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub ty: TypeDef,
    pub modifiers: Modifiers,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, ty: TypeDef) -> Self {
        PropertyDef {
            name: name.into(),
            ty,
            modifiers: modifiers(&[Modifier::Public]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ClassDef {
    pub name: String,
    pub modifiers: Modifiers,
    pub superclass: Option<ClassTypeDef>,
    pub superinterfaces: Vec<ClassTypeDef>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyDef>,
    pub static_initializer: Option<StatementDef>,
    pub inner_types: Vec<ObjectDef>,
    /// Components recorded in the `Record` attribute; set when desugared from a record.
    pub record_components: Vec<ParameterDef>,
    pub synthetic: bool,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct InterfaceDef {
    pub name: String,
    pub modifiers: Modifiers,
    pub superinterfaces: Vec<ClassTypeDef>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyDef>,
    pub inner_types: Vec<ObjectDef>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceDef {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumConstantDef {
    pub name: String,
    pub args: Vec<ExpressionDef>,
}

impl EnumConstantDef {
    pub fn new(name: impl Into<String>) -> Self {
        EnumConstantDef {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<ExpressionDef>) -> Self {
        EnumConstantDef {
            name: name.into(),
            args,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct EnumDef {
    pub name: String,
    pub modifiers: Modifiers,
    pub superinterfaces: Vec<ClassTypeDef>,
    pub constants: Vec<EnumConstantDef>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyDef>,
    pub inner_types: Vec<ObjectDef>,
    pub synthetic: bool,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> Self {
        EnumDef {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct RecordDef {
    pub name: String,
    pub modifiers: Modifiers,
    pub superinterfaces: Vec<ClassTypeDef>,
    pub components: Vec<ParameterDef>,
    /// Static fields only; instance state is the components.
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyDef>,
    pub static_initializer: Option<StatementDef>,
    pub inner_types: Vec<ObjectDef>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        RecordDef {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A class-like definition handed in by the IR builder.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectDef {
    Class(ClassDef),
    Interface(InterfaceDef),
    Enum(EnumDef),
    Record(RecordDef),
}

impl ObjectDef {
    pub fn name(&self) -> &str {
        match self {
            ObjectDef::Class(c) => &c.name,
            ObjectDef::Interface(i) => &i.name,
            ObjectDef::Enum(e) => &e.name,
            ObjectDef::Record(r) => &r.name,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, ObjectDef::Interface(_))
    }

    pub fn as_class_type(&self) -> ClassTypeDef {
        ClassTypeDef {
            name: self.name().to_string(),
            is_interface: self.is_interface(),
        }
    }

    /// Superclass that `super` refers to.
    pub fn superclass(&self) -> ClassTypeDef {
        match self {
            ObjectDef::Class(c) => c.superclass.clone().unwrap_or_else(ClassTypeDef::object),
            ObjectDef::Enum(_) => ClassTypeDef::new("java.lang.Enum"),
            ObjectDef::Record(_) => ClassTypeDef::new("java.lang.Record"),
            ObjectDef::Interface(_) => ClassTypeDef::object(),
        }
    }

    pub fn superinterfaces(&self) -> &[ClassTypeDef] {
        match self {
            ObjectDef::Class(c) => &c.superinterfaces,
            ObjectDef::Interface(i) => &i.superinterfaces,
            ObjectDef::Enum(e) => &e.superinterfaces,
            ObjectDef::Record(r) => &r.superinterfaces,
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            ObjectDef::Class(c) => &c.modifiers,
            ObjectDef::Interface(i) => &i.modifiers,
            ObjectDef::Enum(e) => &e.modifiers,
            ObjectDef::Record(r) => &r.modifiers,
        }
    }

    pub fn methods(&self) -> &[MethodDef] {
        match self {
            ObjectDef::Class(c) => &c.methods,
            ObjectDef::Interface(i) => &i.methods,
            ObjectDef::Enum(e) => &e.methods,
            ObjectDef::Record(r) => &r.methods,
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        match self {
            ObjectDef::Class(c) => &c.fields,
            ObjectDef::Interface(i) => &i.fields,
            ObjectDef::Enum(e) => &e.fields,
            ObjectDef::Record(r) => &r.fields,
        }
    }

    pub fn inner_types(&self) -> &[ObjectDef] {
        match self {
            ObjectDef::Class(c) => &c.inner_types,
            ObjectDef::Interface(i) => &i.inner_types,
            ObjectDef::Enum(e) => &e.inner_types,
            ObjectDef::Record(r) => &r.inner_types,
        }
    }

    pub fn as_type(&self) -> TypeDef {
        TypeDef::Class(self.as_class_type())
    }
}
