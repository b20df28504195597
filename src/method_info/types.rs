use binrw::binwrite;

use crate::attribute_info::AttributeInfo;

/// A `method_info` entry; concrete methods carry exactly one `Code` attribute.
#[binwrite]
#[derive(Clone, Debug, PartialEq, Eq)]
#[bw(big)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    #[bw(calc = attributes.len() as u16)]
    attributes_count: u16,
    pub attributes: Vec<AttributeInfo>,
}

#[binwrite]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[bw(big)]
pub struct MethodAccessFlags(u16);

bitflags! {
    impl MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}
