use std::collections::{HashMap, HashSet};

use crate::model::{ObjectDef, TypeDef};

const OBJECT: &str = "java/lang/Object";

/// Known superclass and interface relations, by internal name.
///
/// Covers the JDK types the lowering engine and desugaring touch, plus any
/// classes registered while writing. Unknown classes are never assumed to be
/// related to anything but `java/lang/Object`.
#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    superclasses: HashMap<String, String>,
    interfaces: HashMap<String, Vec<String>>,
    interface_names: HashSet<String>,
}

impl ClassHierarchy {
    pub fn jdk() -> Self {
        let mut h = ClassHierarchy::default();
        let classes: &[(&str, &str, &[&str])] = &[
            ("java/lang/String", OBJECT, &["java/io/Serializable", "java/lang/Comparable", "java/lang/CharSequence"]),
            ("java/lang/Number", OBJECT, &["java/io/Serializable"]),
            ("java/lang/Integer", "java/lang/Number", &["java/lang/Comparable"]),
            ("java/lang/Long", "java/lang/Number", &["java/lang/Comparable"]),
            ("java/lang/Short", "java/lang/Number", &["java/lang/Comparable"]),
            ("java/lang/Byte", "java/lang/Number", &["java/lang/Comparable"]),
            ("java/lang/Float", "java/lang/Number", &["java/lang/Comparable"]),
            ("java/lang/Double", "java/lang/Number", &["java/lang/Comparable"]),
            ("java/lang/Boolean", OBJECT, &["java/io/Serializable", "java/lang/Comparable"]),
            ("java/lang/Character", OBJECT, &["java/io/Serializable", "java/lang/Comparable"]),
            ("java/lang/Class", OBJECT, &["java/io/Serializable"]),
            ("java/lang/Enum", OBJECT, &["java/lang/Comparable", "java/io/Serializable"]),
            ("java/lang/Record", OBJECT, &[]),
            ("java/lang/StringBuilder", OBJECT, &["java/io/Serializable", "java/lang/CharSequence"]),
            ("java/lang/Throwable", OBJECT, &["java/io/Serializable"]),
            ("java/lang/Exception", "java/lang/Throwable", &[]),
            ("java/lang/Error", "java/lang/Throwable", &[]),
            ("java/lang/RuntimeException", "java/lang/Exception", &[]),
            ("java/lang/IllegalStateException", "java/lang/RuntimeException", &[]),
            ("java/lang/IllegalArgumentException", "java/lang/RuntimeException", &[]),
            ("java/lang/NullPointerException", "java/lang/RuntimeException", &[]),
            ("java/lang/ArithmeticException", "java/lang/RuntimeException", &[]),
            ("java/lang/ClassCastException", "java/lang/RuntimeException", &[]),
            ("java/lang/UnsupportedOperationException", "java/lang/RuntimeException", &[]),
            ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException", &[]),
            ("java/lang/ArrayIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException", &[]),
            ("java/io/IOException", "java/lang/Exception", &[]),
            ("java/util/AbstractCollection", OBJECT, &["java/util/Collection"]),
            ("java/util/AbstractList", "java/util/AbstractCollection", &["java/util/List"]),
            ("java/util/ArrayList", "java/util/AbstractList", &["java/util/List", "java/io/Serializable"]),
            ("java/util/AbstractMap", OBJECT, &["java/util/Map"]),
            ("java/util/HashMap", "java/util/AbstractMap", &["java/util/Map", "java/io/Serializable"]),
        ];
        for (name, superclass, interfaces) in classes {
            h.add_class(name, superclass, interfaces.iter().map(|s| s.to_string()).collect());
        }
        let interfaces: &[(&str, &[&str])] = &[
            ("java/io/Serializable", &[]),
            ("java/lang/Comparable", &[]),
            ("java/lang/CharSequence", &[]),
            ("java/lang/Cloneable", &[]),
            ("java/lang/Iterable", &[]),
            ("java/util/Collection", &["java/lang/Iterable"]),
            ("java/util/List", &["java/util/Collection"]),
            ("java/util/Set", &["java/util/Collection"]),
            ("java/util/Map", &[]),
        ];
        for (name, supers) in interfaces {
            h.add_interface(name, supers.iter().map(|s| s.to_string()).collect());
        }
        h
    }

    pub fn add_class(&mut self, name: &str, superclass: &str, interfaces: Vec<String>) {
        self.superclasses.insert(name.to_string(), superclass.to_string());
        self.interfaces.insert(name.to_string(), interfaces);
    }

    pub fn add_interface(&mut self, name: &str, superinterfaces: Vec<String>) {
        self.interface_names.insert(name.to_string());
        self.interfaces.insert(name.to_string(), superinterfaces);
    }

    /// Register an object being written and its inner types.
    pub fn add_object(&mut self, object: &ObjectDef) {
        let name = object.as_class_type().internal_name();
        let interfaces = object.superinterfaces().iter().map(|i| i.internal_name()).collect();
        if object.is_interface() {
            self.add_interface(&name, interfaces);
        } else {
            self.add_class(&name, &object.superclass().internal_name(), interfaces);
        }
        for inner in object.inner_types() {
            self.add_object(inner);
        }
    }

    pub fn is_interface(&self, name: &str) -> bool {
        self.interface_names.contains(name)
    }

    pub fn superclass(&self, name: &str) -> Option<&str> {
        self.superclasses.get(name).map(String::as_str)
    }

    /// Superclass chain starting at `name` itself, ending at `java/lang/Object`
    /// when the chain is fully known.
    fn chain(&self, name: &str) -> Vec<String> {
        let mut out = vec![name.to_string()];
        let mut current = name;
        while let Some(next) = self.superclass(current) {
            if out.iter().any(|n| n == next) {
                break;
            }
            out.push(next.to_string());
            current = next;
        }
        out
    }

    /// Whether `from` is known to be a subtype of `to`.
    pub fn is_subclass(&self, from: &str, to: &str) -> bool {
        if from == to || to == OBJECT {
            return true;
        }
        let mut pending = vec![from.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = pending.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(s) = self.superclasses.get(&name) {
                pending.push(s.clone());
            }
            if let Some(list) = self.interfaces.get(&name) {
                pending.extend(list.iter().cloned());
            }
        }
        false
    }

    /// Least common superclass of two classes; interfaces merge to `Object`.
    pub fn common_superclass(&self, a: &str, b: &str) -> String {
        if a == b {
            return a.to_string();
        }
        if self.is_interface(a) || self.is_interface(b) {
            return OBJECT.to_string();
        }
        let chain_a = self.chain(a);
        for candidate in self.chain(b) {
            if chain_a.contains(&candidate) {
                return candidate;
            }
        }
        OBJECT.to_string()
    }

    /// Whether a value of static type `from` can be used as `to` without a
    /// runtime check. Both types must already be erased.
    pub fn is_assignable(&self, from: &TypeDef, to: &TypeDef) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (_, TypeDef::Class(c)) if c.name == "java.lang.Object" => !from.is_primitive(),
            (TypeDef::Class(f), TypeDef::Class(t)) => self.is_subclass(&f.internal_name(), &t.internal_name()),
            (TypeDef::Array(_), TypeDef::Class(t)) => {
                t.name == "java.lang.Cloneable" || t.name == "java.io.Serializable"
            }
            (TypeDef::Array(f), TypeDef::Array(t)) => {
                if f.dimensions() == t.dimensions() {
                    if f.component().is_primitive() || t.component().is_primitive() {
                        return f.component() == t.component();
                    }
                    self.is_assignable(f.component(), t.component())
                } else if f.dimensions() > t.dimensions() && !t.component().is_primitive() {
                    let element = f.element_type();
                    let target = t.element_type();
                    self.is_assignable(&element, &target)
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}
