//! Tree-to-tree rewrites that turn enums, records and properties into plain
//! classes before emission.

mod enums;
mod properties;
mod records;

use crate::error::Result;
use crate::model::{MethodDef, ObjectDef};

pub use self::enums::desugar_enum;
pub use self::properties::desugar_properties;
pub use self::records::desugar_record;

/// Desugar `object` and its inner types.
///
/// Enums and records come back as [`ObjectDef::Class`]; properties become
/// fields and accessors. Inner types given by simple name are renamed to
/// their binary name `Outer$Inner`.
pub fn desugar_object(object: &ObjectDef) -> Result<ObjectDef> {
    desugar_nested(object.clone(), None)
}

fn desugar_nested(mut object: ObjectDef, outer: Option<&str>) -> Result<ObjectDef> {
    if let Some(outer) = outer {
        let name = binary_name(outer, object.name());
        rename(&mut object, name);
    }
    let object = match object {
        ObjectDef::Enum(e) => ObjectDef::Class(desugar_enum(e)?),
        ObjectDef::Record(r) => ObjectDef::Class(desugar_record(r)?),
        other => other,
    };
    let mut object = desugar_properties(object)?;

    let name = object.name().to_string();
    let inners = std::mem::take(inner_types_mut(&mut object));
    let inners = inners
        .into_iter()
        .map(|inner| desugar_nested(inner, Some(&name)))
        .collect::<Result<Vec<_>>>()?;
    *inner_types_mut(&mut object) = inners;
    Ok(object)
}

/// `Outer$Inner` for a simple or dotted-nested name; other names are kept.
fn binary_name(outer: &str, inner: &str) -> String {
    if let Some(rest) = inner.strip_prefix(outer).and_then(|r| r.strip_prefix('.')) {
        return format!("{}${}", outer, rest.replace('.', "$"));
    }
    if inner.contains('.') || inner.contains('$') {
        return inner.to_string();
    }
    format!("{}${}", outer, inner)
}

fn rename(object: &mut ObjectDef, name: String) {
    match object {
        ObjectDef::Class(c) => c.name = name,
        ObjectDef::Interface(i) => i.name = name,
        ObjectDef::Enum(e) => e.name = name,
        ObjectDef::Record(r) => r.name = name,
    }
}

fn inner_types_mut(object: &mut ObjectDef) -> &mut Vec<ObjectDef> {
    match object {
        ObjectDef::Class(c) => &mut c.inner_types,
        ObjectDef::Interface(i) => &mut i.inner_types,
        ObjectDef::Enum(e) => &mut e.inner_types,
        ObjectDef::Record(r) => &mut r.inner_types,
    }
}

/// Whether `methods` already declares `name` with `arity` parameters.
fn declares(methods: &[MethodDef], name: &str, arity: usize) -> bool {
    methods.iter().any(|m| m.name == name && m.parameters.len() == arity)
}

/// Last segment of a dotted or binary name.
fn simple_name(name: &str) -> &str {
    name.rsplit(['.', '$']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDef, EnumDef, InterfaceDef};

    #[test]
    fn inner_types_get_binary_names() {
        let mut outer = ClassDef::new("demo.Outer");
        outer.inner_types.push(ObjectDef::Class(ClassDef::new("Inner")));
        outer.inner_types.push(ObjectDef::Interface(InterfaceDef::new("demo.Outer.Listener")));
        outer.inner_types.push(ObjectDef::Enum(EnumDef::new("demo.Outer$Mode")));
        let desugared = desugar_object(&ObjectDef::Class(outer)).unwrap();
        let names: Vec<&str> = desugared.inner_types().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["demo.Outer$Inner", "demo.Outer$Listener", "demo.Outer$Mode"]);
        assert!(matches!(desugared.inner_types()[2], ObjectDef::Class(_)));
    }

    #[test]
    fn simple_names() {
        assert_eq!(simple_name("demo.Outer$Point"), "Point");
        assert_eq!(simple_name("Point"), "Point");
    }
}
