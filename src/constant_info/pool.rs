use std::collections::HashMap;

use crate::error::{LowerError, Result};

use super::types::*;

/// Key used to deduplicate entries; floating values are keyed by their bits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    NameAndType(u16, u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
}

/// A resolved field or method reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub interface: bool,
}

/// What an `ldc`-family instruction pushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadableKind {
    Integer,
    Float,
    Long,
    Double,
    String,
    Class,
}

/// Constant pool under construction. Index 0 is reserved, so the first
/// entry gets index 1.
#[derive(Clone, Debug, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantInfo>,
    lookup: HashMap<PoolKey, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `constant_pool_count` field: number of slots plus one.
    pub fn count(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    pub fn entries(&self) -> &[ConstantInfo] {
        &self.entries
    }

    pub fn get(&self, index: u16) -> Option<&ConstantInfo> {
        if index == 0 {
            return None;
        }
        self.entries.get(usize::from(index) - 1)
    }

    fn insert(&mut self, key: PoolKey, info: ConstantInfo) -> Result<u16> {
        if let Some(&index) = self.lookup.get(&key) {
            return Ok(index);
        }
        let wide = matches!(info, ConstantInfo::Long(_) | ConstantInfo::Double(_));
        let needed = if wide { 2 } else { 1 };
        if self.entries.len() + needed > usize::from(u16::MAX) - 1 {
            return Err(LowerError::codegen("constant pool exceeds 65535 entries"));
        }
        self.entries.push(info);
        let index = self.entries.len() as u16;
        if wide {
            self.entries.push(ConstantInfo::Unusable);
        }
        self.lookup.insert(key, index);
        Ok(index)
    }

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        let constant = Utf8Constant::new(value);
        if constant.bytes.len() > usize::from(u16::MAX) {
            return Err(LowerError::codegen(format!(
                "string constant of {} bytes does not fit a Utf8 entry",
                constant.bytes.len()
            )));
        }
        self.insert(PoolKey::Utf8(value.to_string()), ConstantInfo::Utf8(constant))
    }

    pub fn class(&mut self, internal_name: &str) -> Result<u16> {
        let name_index = self.utf8(internal_name)?;
        self.insert(
            PoolKey::Class(name_index),
            ConstantInfo::Class(ClassConstant { name_index }),
        )
    }

    pub fn string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.utf8(value)?;
        self.insert(
            PoolKey::String(string_index),
            ConstantInfo::String(StringConstant { string_index }),
        )
    }

    pub fn integer(&mut self, value: i32) -> Result<u16> {
        self.insert(
            PoolKey::Integer(value),
            ConstantInfo::Integer(IntegerConstant { value }),
        )
    }

    pub fn float(&mut self, value: f32) -> Result<u16> {
        self.insert(
            PoolKey::Float(value.to_bits()),
            ConstantInfo::Float(FloatConstant { value }),
        )
    }

    pub fn long(&mut self, value: i64) -> Result<u16> {
        self.insert(PoolKey::Long(value), ConstantInfo::Long(LongConstant { value }))
    }

    pub fn double(&mut self, value: f64) -> Result<u16> {
        self.insert(
            PoolKey::Double(value.to_bits()),
            ConstantInfo::Double(DoubleConstant { value }),
        )
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.utf8(name)?;
        let descriptor_index = self.utf8(descriptor)?;
        self.insert(
            PoolKey::NameAndType(name_index, descriptor_index),
            ConstantInfo::NameAndType(NameAndTypeConstant {
                name_index,
                descriptor_index,
            }),
        )
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class_index = self.class(owner)?;
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        self.insert(
            PoolKey::FieldRef(class_index, name_and_type_index),
            ConstantInfo::FieldRef(FieldRefConstant {
                class_index,
                name_and_type_index,
            }),
        )
    }

    pub fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16> {
        let class_index = self.class(owner)?;
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        if interface {
            self.insert(
                PoolKey::InterfaceMethodRef(class_index, name_and_type_index),
                ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant {
                    class_index,
                    name_and_type_index,
                }),
            )
        } else {
            self.insert(
                PoolKey::MethodRef(class_index, name_and_type_index),
                ConstantInfo::MethodRef(MethodRefConstant {
                    class_index,
                    name_and_type_index,
                }),
            )
        }
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        self.method_ref(owner, name, descriptor, true)
    }

    // -- Lookups used by the stack analysis --

    pub fn utf8_at(&self, index: u16) -> Option<String> {
        match self.get(index)? {
            ConstantInfo::Utf8(c) => Some(c.to_string_lossy()),
            _ => None,
        }
    }

    pub fn class_name_at(&self, index: u16) -> Option<String> {
        match self.get(index)? {
            ConstantInfo::Class(c) => self.utf8_at(c.name_index),
            _ => None,
        }
    }

    pub fn member_at(&self, index: u16) -> Option<MemberRef> {
        let (class_index, nat_index, interface) = match self.get(index)? {
            ConstantInfo::FieldRef(r) => (r.class_index, r.name_and_type_index, false),
            ConstantInfo::MethodRef(r) => (r.class_index, r.name_and_type_index, false),
            ConstantInfo::InterfaceMethodRef(r) => (r.class_index, r.name_and_type_index, true),
            _ => return None,
        };
        let (name_index, descriptor_index) = match self.get(nat_index)? {
            ConstantInfo::NameAndType(nat) => (nat.name_index, nat.descriptor_index),
            _ => return None,
        };
        Some(MemberRef {
            owner: self.class_name_at(class_index)?,
            name: self.utf8_at(name_index)?,
            descriptor: self.utf8_at(descriptor_index)?,
            interface,
        })
    }

    pub fn loadable_kind(&self, index: u16) -> Option<LoadableKind> {
        Some(match self.get(index)? {
            ConstantInfo::Integer(_) => LoadableKind::Integer,
            ConstantInfo::Float(_) => LoadableKind::Float,
            ConstantInfo::Long(_) => LoadableKind::Long,
            ConstantInfo::Double(_) => LoadableKind::Double,
            ConstantInfo::String(_) => LoadableKind::String,
            ConstantInfo::Class(_) => LoadableKind::Class,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_deduplicated() {
        let mut pool = ConstantPool::new();
        let a = pool.class("java/lang/String").unwrap();
        let b = pool.class("java/lang/String").unwrap();
        assert_eq!(a, b);
        // Utf8 + Class
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn long_takes_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.long(1 << 40).unwrap();
        let next = pool.integer(7).unwrap();
        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert_eq!(pool.get(2), Some(&ConstantInfo::Unusable));
    }

    #[test]
    fn member_refs_resolve_back() {
        let mut pool = ConstantPool::new();
        let index = pool
            .method_ref("java/util/List", "size", "()I", true)
            .unwrap();
        let member = pool.member_at(index).unwrap();
        assert_eq!(member.owner, "java/util/List");
        assert_eq!(member.name, "size");
        assert_eq!(member.descriptor, "()I");
        assert!(member.interface);
    }

    #[test]
    fn float_keys_distinguish_signed_zero() {
        let mut pool = ConstantPool::new();
        let pos = pool.float(0.0).unwrap();
        let neg = pool.float(-0.0).unwrap();
        assert_ne!(pos, neg);
    }
}
