use std::io::Cursor;

use binrw::{binwrite, BinResult, BinWrite};

use crate::attribute_info::AttributeInfo;
use crate::constant_info::ConstantInfo;
use crate::field_info::FieldInfo;
use crate::method_info::MethodInfo;

/// A complete class file, ready to serialize.
#[binwrite]
#[derive(Clone, Debug)]
#[bw(big, magic = b"\xca\xfe\xba\xbe")]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    /// Constant pool slot count plus one.
    pub const_pool_size: u16,
    pub const_pool: Vec<ConstantInfo>,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    #[bw(calc = interfaces.len() as u16)]
    interfaces_count: u16,
    pub interfaces: Vec<u16>,
    #[bw(calc = fields.len() as u16)]
    fields_count: u16,
    pub fields: Vec<FieldInfo>,
    #[bw(calc = methods.len() as u16)]
    methods_count: u16,
    pub methods: Vec<MethodInfo>,
    #[bw(calc = attributes.len() as u16)]
    attributes_count: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn to_bytes(&self) -> BinResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.write(&mut out)?;
        Ok(out.into_inner())
    }
}

#[binwrite]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[bw(big)]
pub struct ClassAccessFlags(u16);

bitflags! {
    impl ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        /// Always set on classes; modern `invokespecial` semantics.
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}
