use crate::error::{LowerError, Result};
use crate::model::{
    ClassDef, ClassTypeDef, ExpressionDef, FieldDef, MathOp, MethodDef, Modifier, ParameterDef, RecordDef,
    StatementDef, TypeDef,
};

use super::{declares, simple_name};

const OTHER: &str = "o";
const THAT: &str = "that";

/// Rewrite a record into a final class extending `java.lang.Record`.
///
/// Components become `private final` fields. The canonical constructor,
/// accessors, `equals`, `hashCode` and `toString` are generated unless the
/// record declares them.
pub fn desugar_record(def: RecordDef) -> Result<ClassDef> {
    if let Some(field) = def.fields.iter().find(|f| !f.is_static()) {
        return Err(LowerError::type_contract(format!(
            "record {} declares instance field {}",
            def.name, field.name
        )));
    }
    let this_type = TypeDef::class(def.name.clone());

    let mut fields: Vec<FieldDef> = def
        .components
        .iter()
        .map(|c| FieldDef::new(c.name.clone(), c.ty.clone()).with_modifiers(&[Modifier::Private, Modifier::Final]))
        .collect();
    fields.extend(def.fields);

    let mut methods = def.methods;
    let component_types: Vec<TypeDef> = def.components.iter().map(|c| c.ty.clone()).collect();
    let has_canonical = methods
        .iter()
        .any(|m| m.is_constructor() && m.parameter_types() == component_types);
    if !has_canonical {
        methods.push(canonical_constructor(&def.components));
    }
    for component in &def.components {
        if !declares(&methods, &component.name, 0) {
            methods.push(accessor(component));
        }
    }
    if !declares(&methods, "equals", 1) {
        methods.push(equals(&this_type, &def.components));
    }
    if !declares(&methods, "hashCode", 0) {
        methods.push(hash_code(&def.components));
    }
    if !declares(&methods, "toString", 0) {
        methods.push(to_string(simple_name(&def.name), &def.components));
    }

    let mut modifiers = def.modifiers;
    modifiers.insert(Modifier::Final);

    Ok(ClassDef {
        name: def.name,
        modifiers,
        superclass: Some(ClassTypeDef::new("java.lang.Record")),
        superinterfaces: def.superinterfaces,
        fields,
        methods,
        properties: def.properties,
        static_initializer: def.static_initializer,
        inner_types: def.inner_types,
        record_components: def.components,
        synthetic: false,
    })
}

fn own_field(component: &ParameterDef) -> ExpressionDef {
    ExpressionDef::this().field(component.name.clone(), component.ty.clone())
}

fn canonical_constructor(components: &[ParameterDef]) -> MethodDef {
    let mut ctor = MethodDef::constructor().with_modifiers(&[Modifier::Public]);
    for c in components {
        ctor = ctor
            .with_parameter(c.name.clone(), c.ty.clone())
            .with_statement(StatementDef::put_field(
                ExpressionDef::this(),
                c.name.clone(),
                c.ty.clone(),
                ExpressionDef::param(c.name.clone(), c.ty.clone()),
            ));
    }
    ctor
}

fn accessor(component: &ParameterDef) -> MethodDef {
    MethodDef::new(component.name.clone(), component.ty.clone())
        .with_modifiers(&[Modifier::Public])
        .with_statement(own_field(component).returning())
}

fn equals(this_type: &TypeDef, components: &[ParameterDef]) -> MethodDef {
    let other = ExpressionDef::param(OTHER, TypeDef::object());
    let that = ExpressionDef::local(THAT, this_type.clone());
    let same = components
        .iter()
        .map(|c| own_field(c).equals_structurally(that.clone().field(c.name.clone(), c.ty.clone())))
        .reduce(ExpressionDef::and)
        .unwrap_or_else(|| ExpressionDef::boolean(true));

    MethodDef::new("equals", TypeDef::BOOLEAN)
        .with_modifiers(&[Modifier::Public, Modifier::Final])
        .with_parameter(OTHER, TypeDef::object())
        .with_statements(vec![
            StatementDef::if_then(
                ExpressionDef::this().equals_referentially(other.clone()),
                ExpressionDef::boolean(true).returning(),
            ),
            StatementDef::if_then(
                other.clone().instance_of(this_type.clone()).not(),
                ExpressionDef::boolean(false).returning(),
            ),
            StatementDef::define(THAT, this_type.clone(), other.cast(this_type.clone())),
            same.returning(),
        ])
}

/// `31 * h + hash(c)` folded over the components, starting at zero.
fn hash_code(components: &[ParameterDef]) -> MethodDef {
    let hash = components.iter().fold(ExpressionDef::int(0), |h, c| {
        h.math(MathOp::Mul, ExpressionDef::int(31))
            .math(MathOp::Add, own_field(c).hash_code())
    });
    MethodDef::new("hashCode", TypeDef::INT)
        .with_modifiers(&[Modifier::Public, Modifier::Final])
        .with_statement(hash.returning())
}

/// `Name[a=.., b=..]` as a string concatenation.
fn to_string(simple: &str, components: &[ParameterDef]) -> MethodDef {
    let mut prefix = format!("{}[", simple);
    let mut text: Option<ExpressionDef> = None;
    for c in components {
        prefix.push_str(&c.name);
        prefix.push('=');
        let head = ExpressionDef::string(std::mem::replace(&mut prefix, ", ".to_string()));
        let head = match text {
            Some(t) => t.math(MathOp::Add, head),
            None => head,
        };
        text = Some(head.math(MathOp::Add, own_field(c)));
    }
    if components.is_empty() {
        prefix.push(']');
    } else {
        prefix = "]".to_string();
    }
    let tail = ExpressionDef::string(prefix);
    let text = match text {
        Some(t) => t.math(MathOp::Add, tail),
        None => tail,
    };

    MethodDef::new("toString", TypeDef::string())
        .with_modifiers(&[Modifier::Public, Modifier::Final])
        .with_statement(text.returning())
}
