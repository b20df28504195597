use crate::error::{LowerError, Result};
use crate::model::{ClassTypeDef, ObjectDef, PrimitiveType, TypeDef};

/// Replace `This`/`Super` with the concrete types of the enclosing object.
pub fn resolve(ty: &TypeDef, object: Option<&ObjectDef>) -> Result<TypeDef> {
    match ty {
        TypeDef::This => object
            .map(|o| o.as_type())
            .ok_or_else(|| LowerError::type_contract("`this` type used without an enclosing object")),
        TypeDef::Super => object
            .map(|o| TypeDef::Class(o.superclass()))
            .ok_or_else(|| LowerError::type_contract("`super` type used without an enclosing object")),
        other => Ok(other.clone()),
    }
}

/// Erase a type to what the class file can express: a primitive, a class, or
/// an array of those.
pub fn erase(ty: &TypeDef, object: Option<&ObjectDef>) -> Result<TypeDef> {
    Ok(match resolve(ty, object)? {
        TypeDef::Parameterized { raw, .. } => TypeDef::Class(raw),
        TypeDef::TypeVariable { bounds, .. } => match bounds.first() {
            Some(bound) => erase(bound, object)?,
            None => TypeDef::object(),
        },
        TypeDef::Wildcard { upper, .. } => match upper.first() {
            Some(bound) => erase(bound, object)?,
            None => TypeDef::object(),
        },
        TypeDef::Array(a) => TypeDef::array(erase(a.component(), object)?, a.dimensions()),
        other => other,
    })
}

pub fn primitive_descriptor(p: PrimitiveType) -> char {
    p.descriptor()
}

pub fn field_descriptor(ty: &TypeDef, object: Option<&ObjectDef>) -> Result<String> {
    let erased = erase(ty, object)?;
    let mut out = String::new();
    write_descriptor(&erased, &mut out);
    Ok(out)
}

fn write_descriptor(ty: &TypeDef, out: &mut String) {
    match ty {
        TypeDef::Primitive(p) => out.push(p.descriptor()),
        TypeDef::Class(c) => {
            out.push('L');
            out.push_str(&c.internal_name());
            out.push(';');
        }
        TypeDef::Array(a) => {
            for _ in 0..a.dimensions() {
                out.push('[');
            }
            write_descriptor(a.component(), out);
        }
        // erased before we get here
        _ => out.push_str("Ljava/lang/Object;"),
    }
}

pub fn method_descriptor(parameters: &[TypeDef], return_type: &TypeDef, object: Option<&ObjectDef>) -> Result<String> {
    let mut out = String::from("(");
    for p in parameters {
        out.push_str(&field_descriptor(p, object)?);
    }
    out.push(')');
    out.push_str(&field_descriptor(return_type, object)?);
    Ok(out)
}

/// Name used in `CONSTANT_Class`: internal name for classes, the descriptor for arrays.
pub fn class_entry_name(ty: &TypeDef, object: Option<&ObjectDef>) -> Result<String> {
    match erase(ty, object)? {
        TypeDef::Class(c) => Ok(c.internal_name()),
        array @ TypeDef::Array(_) => field_descriptor(&array, object),
        other => Err(LowerError::type_contract(format!(
            "type {} has no class constant",
            other
        ))),
    }
}

/// Erased class reference, for owners of fields and methods.
pub fn class_of(ty: &TypeDef, object: Option<&ObjectDef>) -> Result<ClassTypeDef> {
    match erase(ty, object)? {
        TypeDef::Class(c) => Ok(c),
        other => Err(LowerError::type_contract(format!("expected a class type, got {}", other))),
    }
}

/// Split a method descriptor into parameter and return descriptors.
pub fn parse_method_descriptor(descriptor: &str) -> Option<(Vec<String>, String)> {
    let rest = descriptor.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (params_part, ret) = (&rest[..close], &rest[close + 1..]);
    let mut params = Vec::new();
    let bytes = params_part.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        while bytes[i] == b'[' {
            i += 1;
            if i >= bytes.len() {
                return None;
            }
        }
        if bytes[i] == b'L' {
            let end = params_part[i..].find(';')? + i;
            i = end + 1;
        } else {
            i += 1;
        }
        params.push(params_part[start..i].to_string());
    }
    Some((params, ret.to_string()))
}

/// Stack words occupied by a value of this descriptor (0 for `V`).
pub fn descriptor_size(descriptor: &str) -> u16 {
    match descriptor {
        "V" => 0,
        "J" | "D" => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDef, EnumDef};

    #[test]
    fn descriptors_of_erased_types() {
        let list = TypeDef::parameterized(
            ClassTypeDef::interface("java.util.List"),
            vec![TypeDef::string()],
        );
        assert_eq!(field_descriptor(&list, None).unwrap(), "Ljava/util/List;");
        let tv = TypeDef::type_variable("T", vec![TypeDef::class("java.lang.Number")]);
        assert_eq!(field_descriptor(&tv, None).unwrap(), "Ljava/lang/Number;");
        let unbounded = TypeDef::type_variable("U", vec![]);
        assert_eq!(
            field_descriptor(&TypeDef::array(unbounded, 2), None).unwrap(),
            "[[Ljava/lang/Object;"
        );
        let wildcard = TypeDef::wildcard(vec![], vec![TypeDef::string()]);
        assert_eq!(field_descriptor(&wildcard, None).unwrap(), "Ljava/lang/Object;");
        assert_eq!(
            method_descriptor(&[TypeDef::INT, TypeDef::LONG], &TypeDef::VOID, None).unwrap(),
            "(IJ)V"
        );
    }

    #[test]
    fn this_and_super_need_an_object() {
        let err = field_descriptor(&TypeDef::This, None).unwrap_err();
        assert!(matches!(err, LowerError::TypeContractViolation { .. }));

        let mut class = ClassDef::new("a.B");
        class.superclass = Some(ClassTypeDef::new("a.Base"));
        let object = ObjectDef::Class(class);
        assert_eq!(field_descriptor(&TypeDef::This, Some(&object)).unwrap(), "La/B;");
        assert_eq!(field_descriptor(&TypeDef::Super, Some(&object)).unwrap(), "La/Base;");

        let e = ObjectDef::Enum(EnumDef::new("a.E"));
        assert_eq!(field_descriptor(&TypeDef::Super, Some(&e)).unwrap(), "Ljava/lang/Enum;");
    }

    #[test]
    fn method_descriptor_parsing() {
        let (params, ret) = parse_method_descriptor("(I[[JLjava/lang/String;D)Ljava/lang/Object;").unwrap();
        assert_eq!(params, vec!["I", "[[J", "Ljava/lang/String;", "D"]);
        assert_eq!(ret, "Ljava/lang/Object;");
        assert!(parse_method_descriptor("I)V").is_none());
        assert_eq!(class_entry_name(&TypeDef::array(TypeDef::INT, 1), None).unwrap(), "[I");
    }
}
