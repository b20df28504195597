use log::trace;

use crate::error::{LowerError, Result};
use crate::model::{ExpressionDef, FieldDef, MethodDef, Modifier, ObjectDef, PropertyDef, StatementDef, TypeDef};

use super::declares;

/// `name` with its first character upper-cased.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn getter_name(property: &PropertyDef) -> String {
    let prefix = if property.ty.is_boolean() { "is" } else { "get" };
    format!("{}{}", prefix, capitalize(&property.name))
}

fn setter_name(property: &PropertyDef) -> String {
    format!("set{}", capitalize(&property.name))
}

/// Accessor modifiers: the property's own, without `final` on an interface.
fn accessor_modifiers(property: &PropertyDef, abstract_only: bool) -> Vec<Modifier> {
    let mut list: Vec<Modifier> = property
        .modifiers
        .iter()
        .copied()
        .filter(|m| !matches!(m, Modifier::Final | Modifier::Volatile | Modifier::Transient))
        .collect();
    if abstract_only {
        list.retain(|m| *m != Modifier::Static);
        list.push(Modifier::Abstract);
    }
    list
}

fn getter(property: &PropertyDef, abstract_only: bool) -> MethodDef {
    let method = MethodDef::new(getter_name(property), property.ty.clone())
        .with_modifiers(&accessor_modifiers(property, abstract_only));
    if abstract_only {
        return method;
    }
    let value = if property.modifiers.contains(&Modifier::Static) {
        ExpressionDef::static_field(TypeDef::This, property.name.clone(), property.ty.clone())
    } else {
        ExpressionDef::this().field(property.name.clone(), property.ty.clone())
    };
    method.with_statement(value.returning())
}

fn setter(property: &PropertyDef, abstract_only: bool) -> MethodDef {
    let method = MethodDef::new(setter_name(property), TypeDef::VOID)
        .with_modifiers(&accessor_modifiers(property, abstract_only))
        .with_parameter(property.name.clone(), property.ty.clone());
    if abstract_only {
        return method;
    }
    let value = ExpressionDef::param(property.name.clone(), property.ty.clone());
    let store = if property.modifiers.contains(&Modifier::Static) {
        StatementDef::put_static(TypeDef::This, property.name.clone(), property.ty.clone(), value)
    } else {
        StatementDef::put_field(ExpressionDef::this(), property.name.clone(), property.ty.clone(), value)
    };
    method.with_statement(store)
}

/// Field backing a property: private, keeping `static`, `volatile` and `transient`.
fn backing_field(property: &PropertyDef) -> FieldDef {
    let mut list = vec![Modifier::Private];
    list.extend(
        property
            .modifiers
            .iter()
            .copied()
            .filter(|m| matches!(m, Modifier::Static | Modifier::Volatile | Modifier::Transient)),
    );
    FieldDef::new(property.name.clone(), property.ty.clone()).with_modifiers(&list)
}

/// Add accessors for a property set, skipping ones already declared.
fn accessors(
    properties: &[PropertyDef],
    methods: &mut Vec<MethodDef>,
    abstract_only: bool,
) -> Result<()> {
    for property in properties {
        if property.ty.is_void() {
            return Err(LowerError::type_contract(format!("property {} has type void", property.name)));
        }
        if !declares(methods, &getter_name(property), 0) {
            methods.push(getter(property, abstract_only));
        }
        // a final property on a class is read-only
        let read_only = !abstract_only && property.modifiers.contains(&Modifier::Final);
        if !read_only && !declares(methods, &setter_name(property), 1) {
            methods.push(setter(property, abstract_only));
        }
    }
    Ok(())
}

/// Expand bean properties into a backing field plus `get`/`is` and `set`
/// accessors. Interfaces only get abstract accessors.
pub fn desugar_properties(object: ObjectDef) -> Result<ObjectDef> {
    match object {
        ObjectDef::Class(mut c) => {
            let properties = std::mem::take(&mut c.properties);
            for property in &properties {
                if c.fields.iter().any(|f| f.name == property.name) {
                    return Err(LowerError::ambiguity(format!(
                        "property {} clashes with a field of {}",
                        property.name, c.name
                    )));
                }
                let mut field = backing_field(property);
                if property.modifiers.contains(&Modifier::Final) {
                    field.modifiers.insert(Modifier::Final);
                }
                c.fields.push(field);
            }
            accessors(&properties, &mut c.methods, false)?;
            trace!("{} properties expanded on {}", properties.len(), c.name);
            Ok(ObjectDef::Class(c))
        }
        ObjectDef::Interface(mut i) => {
            let properties = std::mem::take(&mut i.properties);
            accessors(&properties, &mut i.methods, true)?;
            Ok(ObjectDef::Interface(i))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{modifiers, ClassDef, InterfaceDef};
    use pretty_assertions::assert_eq;

    fn names(methods: &[MethodDef]) -> Vec<&str> {
        methods.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn class_properties_get_field_and_accessors() {
        let mut class = ClassDef::new("demo.Bean");
        class.properties.push(PropertyDef::new("count", TypeDef::INT));
        class.properties.push(PropertyDef::new("enabled", TypeDef::BOOLEAN));
        let ObjectDef::Class(class) = desugar_properties(ObjectDef::Class(class)).unwrap() else {
            panic!("class expected");
        };
        assert!(class.properties.is_empty());
        assert_eq!(class.fields.len(), 2);
        assert!(class.fields[0].modifiers.contains(&Modifier::Private));
        assert_eq!(names(&class.methods), vec!["getCount", "setCount", "isEnabled", "setEnabled"]);
        assert_eq!(class.methods[1].statements.len(), 1);
    }

    #[test]
    fn declared_accessors_win() {
        let mut class = ClassDef::new("demo.Bean");
        class.properties.push(PropertyDef::new("name", TypeDef::string()));
        class.methods.push(
            MethodDef::new("getName", TypeDef::string())
                .with_modifiers(&[Modifier::Public])
                .with_statement(ExpressionDef::string("fixed").returning()),
        );
        let ObjectDef::Class(class) = desugar_properties(ObjectDef::Class(class)).unwrap() else {
            panic!("class expected");
        };
        assert_eq!(names(&class.methods), vec!["getName", "setName"]);
    }

    #[test]
    fn final_property_has_no_setter() {
        let mut class = ClassDef::new("demo.Bean");
        let mut property = PropertyDef::new("id", TypeDef::LONG);
        property.modifiers = modifiers(&[Modifier::Public, Modifier::Final]);
        class.properties.push(property);
        let ObjectDef::Class(class) = desugar_properties(ObjectDef::Class(class)).unwrap() else {
            panic!("class expected");
        };
        assert_eq!(names(&class.methods), vec!["getId"]);
        assert!(class.fields[0].modifiers.contains(&Modifier::Final));
    }

    #[test]
    fn interface_properties_are_abstract() {
        let mut iface = InterfaceDef::new("demo.Named");
        iface.properties.push(PropertyDef::new("name", TypeDef::string()));
        let ObjectDef::Interface(iface) = desugar_properties(ObjectDef::Interface(iface)).unwrap() else {
            panic!("interface expected");
        };
        assert!(iface.fields.is_empty());
        assert_eq!(names(&iface.methods), vec!["getName", "setName"]);
        assert!(iface.methods.iter().all(|m| m.statements.is_empty()));
        assert!(iface.methods.iter().all(|m| m.modifiers.contains(&Modifier::Abstract)));
    }

    #[test]
    fn capitalization() {
        assert_eq!(capitalize("url"), "Url");
        assert_eq!(capitalize(""), "");
    }
}
