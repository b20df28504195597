use log::debug;

use crate::attribute_info::{
    AttributeInfo, CodeAttribute, InnerClassAccessFlags, InnerClassInfo, InnerClassesAttribute,
    LocalVariableTableAttribute, RecordAttribute, RecordComponentInfo, SourceFileAttribute,
};
use crate::code_attribute::encode_instructions;
use crate::constant_info::ConstantPool;
use crate::desugar::desugar_object;
use crate::error::{LowerError, Result};
use crate::field_info::{FieldAccessFlags, FieldInfo};
use crate::method_info::{MethodAccessFlags, MethodInfo};
use crate::model::{
    ExpressionDef, FieldDef, MethodDef, MethodSig, Modifier, Modifiers, ObjectDef, StatementDef, TypeDef, VariableDef,
};
use crate::types::{ClassAccessFlags, ClassFile};

use super::descriptor::{class_entry_name, field_descriptor, method_descriptor};
use super::hierarchy::ClassHierarchy;
use super::stackmap::FrameTracker;
use super::{lower_method_with, GeneratedCode, WriterOptions};

/// Oldest version that verifies without stack map frames.
const VERSION_NO_FRAMES: u16 = 49;
/// First version with default and static interface methods.
const VERSION_INTERFACE_BODIES: u16 = 52;

/// One serialized-ready class.
#[derive(Clone, Debug)]
pub struct GeneratedClass {
    /// Internal name, e.g. `com/example/Outer$Inner`.
    pub name: String,
    pub class_file: ClassFile,
}

impl GeneratedClass {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.class_file.to_bytes()?)
    }

    /// Path of the class inside a JAR or output directory.
    pub fn file_name(&self) -> String {
        format!("{}.class", self.name)
    }
}

/// Emits class files from object definitions.
///
/// ```no_run
/// use classgen::compile::{ClassWriter, WriterOptions};
/// use classgen::model::{ClassDef, ObjectDef};
///
/// let writer = ClassWriter::new(WriterOptions::default());
/// let classes = writer.write(&ObjectDef::Class(ClassDef::new("com.example.Empty"))).unwrap();
/// let bytes = classes[0].to_bytes().unwrap();
/// assert_eq!(&bytes[..4], &[0xca, 0xfe, 0xba, 0xbe]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClassWriter {
    options: WriterOptions,
}

impl ClassWriter {
    pub fn new(options: WriterOptions) -> Self {
        ClassWriter { options }
    }

    /// Write `object` and every inner type, outermost first.
    pub fn write(&self, object: &ObjectDef) -> Result<Vec<GeneratedClass>> {
        let object = desugar_object(object)?;
        let mut hierarchy = ClassHierarchy::jdk();
        hierarchy.add_object(&object);
        let mut out = Vec::new();
        self.write_nested(&object, None, &hierarchy, &mut out)?;
        Ok(out)
    }

    fn write_nested(
        &self,
        object: &ObjectDef,
        outer: Option<&ObjectDef>,
        hierarchy: &ClassHierarchy,
        out: &mut Vec<GeneratedClass>,
    ) -> Result<()> {
        out.push(self.write_class(object, outer, hierarchy)?);
        for inner in object.inner_types() {
            self.write_nested(inner, Some(object), hierarchy, out)?;
        }
        Ok(())
    }

    fn write_class(
        &self,
        object: &ObjectDef,
        outer: Option<&ObjectDef>,
        hierarchy: &ClassHierarchy,
    ) -> Result<GeneratedClass> {
        let mut pool = ConstantPool::new();
        let name = class_entry_name(&object.as_type(), Some(object))?;
        let this_class = pool.class(&name)?;
        let super_class = pool.class(&object.superclass().internal_name())?;
        let interfaces = object
            .superinterfaces()
            .iter()
            .map(|i| pool.class(&i.internal_name()))
            .collect::<Result<Vec<_>>>()?;

        let fields = object
            .fields()
            .iter()
            .map(|f| field_info(object, f, &mut pool))
            .collect::<Result<Vec<_>>>()?;

        let mut lowered = Vec::new();
        for method in member_methods(object)? {
            let code = if has_code(object, &method) {
                Some(lower_method_with(Some(object), &method, &mut pool, hierarchy, &self.options)?)
            } else {
                if !method.statements.is_empty() {
                    return Err(LowerError::type_contract(format!(
                        "method {} of {} has a body but is abstract or native",
                        method.name,
                        object.name()
                    )));
                }
                None
            };
            lowered.push((method, code));
        }

        let major_version = self.options.target_version.unwrap_or_else(|| {
            let interface_bodies = object.is_interface()
                && lowered
                    .iter()
                    .any(|(m, code)| code.is_some() && m.name != "<clinit>");
            let interface_calls = lowered
                .iter()
                .any(|(_, code)| code.as_ref().is_some_and(|c| c.interface_calls));
            if interface_bodies || interface_calls {
                VERSION_INTERFACE_BODIES
            } else {
                VERSION_NO_FRAMES
            }
        });
        let with_frames = major_version >= 50;

        let mut methods = Vec::with_capacity(lowered.len());
        for (method, code) in lowered {
            let descriptor = method_descriptor(&method.parameter_types(), &method.return_type, Some(object))?;
            let mut attributes = Vec::new();
            if let Some(code) = code {
                attributes.push(self.code_attribute(code, with_frames, &mut pool)?);
            }
            methods.push(MethodInfo {
                access_flags: method_flags(object, &method),
                name_index: pool.utf8(&method.name)?,
                descriptor_index: pool.utf8(&descriptor)?,
                attributes,
            });
        }

        let mut attributes = Vec::new();
        if let Some(source_file) = &self.options.source_file {
            let attribute_name = pool.utf8("SourceFile")?;
            let payload = SourceFileAttribute {
                sourcefile_index: pool.utf8(source_file)?,
            };
            attributes.push(AttributeInfo::from_payload(attribute_name, &payload)?);
        }
        let inner_classes = inner_class_entries(object, outer, &mut pool)?;
        if !inner_classes.is_empty() {
            let attribute_name = pool.utf8("InnerClasses")?;
            let payload = InnerClassesAttribute { classes: inner_classes };
            attributes.push(AttributeInfo::from_payload(attribute_name, &payload)?);
        }
        if let ObjectDef::Class(class) = object {
            if !class.record_components.is_empty() {
                let mut components = Vec::with_capacity(class.record_components.len());
                for component in &class.record_components {
                    let descriptor = field_descriptor(&component.ty, Some(object))?;
                    components.push(RecordComponentInfo {
                        name_index: pool.utf8(&component.name)?,
                        descriptor_index: pool.utf8(&descriptor)?,
                        attributes: Vec::new(),
                    });
                }
                let attribute_name = pool.utf8("Record")?;
                attributes.push(AttributeInfo::from_payload(attribute_name, &RecordAttribute { components })?);
            }
        }

        debug!(
            "wrote class {} (version {}, {} fields, {} methods, {} constants)",
            name,
            major_version,
            fields.len(),
            methods.len(),
            pool.count() - 1
        );

        let class_file = ClassFile {
            minor_version: 0,
            major_version,
            const_pool_size: pool.count(),
            const_pool: pool.entries().to_vec(),
            access_flags: class_flags(object),
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        Ok(GeneratedClass { name, class_file })
    }

    fn code_attribute(&self, code: GeneratedCode, with_frames: bool, pool: &mut ConstantPool) -> Result<AttributeInfo> {
        let bytes = encode_instructions(&code.instructions)?;
        let mut attributes = Vec::new();
        if !code.local_variables.is_empty() {
            let attribute_name = pool.utf8("LocalVariableTable")?;
            let payload = LocalVariableTableAttribute {
                items: code.local_variables,
            };
            attributes.push(AttributeInfo::from_payload(attribute_name, &payload)?);
        }
        if with_frames {
            let mut tracker = FrameTracker::new(code.entry_locals);
            for frame in code.frames {
                tracker.record_frame(frame);
            }
            if let Some(table) = tracker.build(pool)? {
                let attribute_name = pool.utf8("StackMapTable")?;
                attributes.push(AttributeInfo::from_payload(attribute_name, &table)?);
            }
        }
        let payload = CodeAttribute {
            max_stack: code.max_stack,
            max_locals: code.max_locals,
            code: bytes,
            exception_table: code.exception_table,
            attributes,
        };
        let attribute_name = pool.utf8("Code")?;
        Ok(AttributeInfo::from_payload(attribute_name, &payload)?)
    }
}

fn field_info(object: &ObjectDef, field: &FieldDef, pool: &mut ConstantPool) -> Result<FieldInfo> {
    let descriptor = field_descriptor(&field.ty, Some(object))?;
    Ok(FieldInfo {
        access_flags: field_flags(object, field),
        name_index: pool.utf8(&field.name)?,
        descriptor_index: pool.utf8(&descriptor)?,
        attributes: Vec::new(),
    })
}

fn class_flags(object: &ObjectDef) -> ClassAccessFlags {
    let modifiers = object.modifiers();
    let mut flags = ClassAccessFlags::empty();
    if modifiers.contains(&Modifier::Public) {
        flags |= ClassAccessFlags::PUBLIC;
    }
    if modifiers.contains(&Modifier::Final) {
        flags |= ClassAccessFlags::FINAL;
    }
    if modifiers.contains(&Modifier::Abstract) {
        flags |= ClassAccessFlags::ABSTRACT;
    }
    if modifiers.contains(&Modifier::Enum) {
        flags |= ClassAccessFlags::ENUM;
    }
    let synthetic = match object {
        ObjectDef::Class(c) => c.synthetic,
        ObjectDef::Enum(e) => e.synthetic,
        _ => false,
    };
    if synthetic || modifiers.contains(&Modifier::Synthetic) {
        flags |= ClassAccessFlags::SYNTHETIC;
    }
    if object.is_interface() {
        flags |= ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
    } else {
        flags |= ClassAccessFlags::SUPER;
    }
    flags
}

fn field_flags(object: &ObjectDef, field: &FieldDef) -> FieldAccessFlags {
    if object.is_interface() {
        return FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL;
    }
    let mut flags = FieldAccessFlags::empty();
    for modifier in &field.modifiers {
        flags |= match modifier {
            Modifier::Public => FieldAccessFlags::PUBLIC,
            Modifier::Protected => FieldAccessFlags::PROTECTED,
            Modifier::Private => FieldAccessFlags::PRIVATE,
            Modifier::Static => FieldAccessFlags::STATIC,
            Modifier::Final => FieldAccessFlags::FINAL,
            Modifier::Volatile => FieldAccessFlags::VOLATILE,
            Modifier::Transient => FieldAccessFlags::TRANSIENT,
            Modifier::Enum => FieldAccessFlags::ENUM,
            Modifier::Synthetic => FieldAccessFlags::SYNTHETIC,
            _ => FieldAccessFlags::empty(),
        };
    }
    flags
}

/// Whether an interface method is abstract: declared so, or bodiless and
/// neither static, private nor default.
fn is_interface_abstract(method: &MethodDef) -> bool {
    let m = &method.modifiers;
    m.contains(&Modifier::Abstract)
        || (method.statements.is_empty()
            && !m.contains(&Modifier::Static)
            && !m.contains(&Modifier::Private)
            && !m.contains(&Modifier::Default))
}

fn has_code(object: &ObjectDef, method: &MethodDef) -> bool {
    let m = &method.modifiers;
    if m.contains(&Modifier::Native) {
        return false;
    }
    if object.is_interface() && method.name != "<clinit>" {
        return !is_interface_abstract(method);
    }
    !m.contains(&Modifier::Abstract)
}

fn method_flags(object: &ObjectDef, method: &MethodDef) -> MethodAccessFlags {
    let mut flags = MethodAccessFlags::empty();
    for modifier in &method.modifiers {
        flags |= match modifier {
            Modifier::Public => MethodAccessFlags::PUBLIC,
            Modifier::Protected => MethodAccessFlags::PROTECTED,
            Modifier::Private => MethodAccessFlags::PRIVATE,
            Modifier::Static => MethodAccessFlags::STATIC,
            Modifier::Final => MethodAccessFlags::FINAL,
            Modifier::Synchronized => MethodAccessFlags::SYNCHRONIZED,
            Modifier::Native => MethodAccessFlags::NATIVE,
            Modifier::Abstract => MethodAccessFlags::ABSTRACT,
            Modifier::Strictfp => MethodAccessFlags::STRICT,
            Modifier::Synthetic => MethodAccessFlags::SYNTHETIC,
            _ => MethodAccessFlags::empty(),
        };
    }
    if method.varargs {
        flags |= MethodAccessFlags::VARARGS;
    }
    if object.is_interface() && method.name != "<clinit>" {
        if is_interface_abstract(method) {
            flags |= MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT;
        } else if !flags.contains(MethodAccessFlags::PRIVATE) {
            flags |= MethodAccessFlags::PUBLIC;
        }
    }
    flags
}

fn inner_flags(object: &ObjectDef) -> InnerClassAccessFlags {
    let mut flags = InnerClassAccessFlags::empty();
    for modifier in object.modifiers() {
        flags |= match modifier {
            Modifier::Public => InnerClassAccessFlags::PUBLIC,
            Modifier::Protected => InnerClassAccessFlags::PROTECTED,
            Modifier::Private => InnerClassAccessFlags::PRIVATE,
            Modifier::Static => InnerClassAccessFlags::STATIC,
            Modifier::Final => InnerClassAccessFlags::FINAL,
            Modifier::Abstract => InnerClassAccessFlags::ABSTRACT,
            Modifier::Enum => InnerClassAccessFlags::ENUM | InnerClassAccessFlags::STATIC,
            Modifier::Synthetic => InnerClassAccessFlags::SYNTHETIC,
            _ => InnerClassAccessFlags::empty(),
        };
    }
    if object.is_interface() {
        flags |= InnerClassAccessFlags::INTERFACE | InnerClassAccessFlags::ABSTRACT | InnerClassAccessFlags::STATIC;
    }
    if let ObjectDef::Class(c) = object {
        if !c.record_components.is_empty() {
            flags |= InnerClassAccessFlags::STATIC;
        }
    }
    flags
}

/// Simple name of a binary name: the part after the last `$`, `/` or `.`.
fn simple_name(internal: &str) -> &str {
    internal.rsplit(['$', '/', '.']).next().unwrap_or(internal)
}

fn inner_class_info(inner: &ObjectDef, outer: &ObjectDef, pool: &mut ConstantPool) -> Result<InnerClassInfo> {
    let inner_name = class_entry_name(&inner.as_type(), Some(inner))?;
    let outer_name = class_entry_name(&outer.as_type(), Some(outer))?;
    Ok(InnerClassInfo {
        inner_class_info_index: pool.class(&inner_name)?,
        outer_class_info_index: pool.class(&outer_name)?,
        inner_name_index: pool.utf8(simple_name(&inner_name))?,
        inner_class_access_flags: inner_flags(inner),
    })
}

/// `InnerClasses` rows: this class itself when nested, then its direct members.
fn inner_class_entries(object: &ObjectDef, outer: Option<&ObjectDef>, pool: &mut ConstantPool) -> Result<Vec<InnerClassInfo>> {
    let mut entries = Vec::new();
    if let Some(outer) = outer {
        entries.push(inner_class_info(object, outer, pool)?);
    }
    for inner in object.inner_types() {
        entries.push(inner_class_info(inner, object, pool)?);
    }
    Ok(entries)
}

fn static_block(object: &ObjectDef) -> Option<&StatementDef> {
    match object {
        ObjectDef::Class(c) => c.static_initializer.as_ref(),
        ObjectDef::Record(r) => r.static_initializer.as_ref(),
        _ => None,
    }
}

/// `this(..)` or `super(..)` as a statement.
fn is_constructor_call(statement: &StatementDef) -> bool {
    match statement {
        StatementDef::Expression(ExpressionDef::InvokeInstance { instance, method, .. }) => {
            method.is_constructor()
                && matches!(
                    **instance,
                    ExpressionDef::Variable(VariableDef::This | VariableDef::Super { .. })
                )
        }
        _ => false,
    }
}

fn is_this_call(statement: &StatementDef) -> bool {
    matches!(
        statement,
        StatementDef::Expression(ExpressionDef::InvokeInstance { instance, .. })
            if matches!(**instance, ExpressionDef::Variable(VariableDef::This))
    )
}

fn super_call() -> StatementDef {
    ExpressionDef::super_ref()
        .invoke(MethodSig::constructor(Vec::new()), Vec::new())
        .as_statement()
}

/// Constructor call first, then field initializers, then the rest of the body.
/// Constructors delegating to `this(..)` skip the field initializers.
fn reorder_constructor(constructor: &MethodDef, field_inits: &[StatementDef]) -> MethodDef {
    let mut statements = constructor.statements.clone();
    let call = match statements.iter().position(is_constructor_call) {
        Some(index) => statements.remove(index),
        None => super_call(),
    };
    let delegates = is_this_call(&call);
    let mut body = Vec::with_capacity(statements.len() + field_inits.len() + 1);
    body.push(call);
    if !delegates {
        body.extend(field_inits.iter().cloned());
    }
    body.extend(statements);
    MethodDef {
        statements: body,
        ..constructor.clone()
    }
}

/// Declared methods plus the synthesized default constructor and `<clinit>`,
/// with constructors reordered.
fn member_methods(object: &ObjectDef) -> Result<Vec<MethodDef>> {
    let owner = object.as_type();
    let interface = object.is_interface();
    let mut instance_inits = Vec::new();
    let mut static_inits = Vec::new();
    for field in object.fields() {
        let Some(initializer) = &field.initializer else {
            continue;
        };
        if interface || field.is_static() {
            static_inits.push(StatementDef::put_static(
                owner.clone(),
                field.name.clone(),
                field.ty.clone(),
                initializer.clone(),
            ));
        } else {
            instance_inits.push(StatementDef::put_field(
                ExpressionDef::this(),
                field.name.clone(),
                field.ty.clone(),
                initializer.clone(),
            ));
        }
    }
    if let Some(block) = static_block(object) {
        static_inits.push(block.clone());
    }

    let mut methods = Vec::with_capacity(object.methods().len() + 2);
    let declares_constructor = object.methods().iter().any(MethodDef::is_constructor);
    if !interface && !declares_constructor {
        let mut modifiers = Modifiers::new();
        modifiers.insert(Modifier::Public);
        let default = MethodDef {
            modifiers,
            ..MethodDef::constructor()
        };
        methods.push(reorder_constructor(&default, &instance_inits));
    }
    for method in object.methods() {
        if method.is_constructor() {
            if interface {
                return Err(LowerError::type_contract(format!(
                    "interface {} declares a constructor",
                    object.name()
                )));
            }
            methods.push(reorder_constructor(method, &instance_inits));
        } else if method.name == "<clinit>" {
            static_inits.extend(method.statements.iter().cloned());
        } else {
            methods.push(method.clone());
        }
    }
    if !static_inits.is_empty() {
        methods.push(
            MethodDef::new("<clinit>", TypeDef::VOID)
                .with_modifiers(&[Modifier::Static])
                .with_statements(static_inits),
        );
    }
    Ok(methods)
}
