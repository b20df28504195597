use binrw::binwrite;

use crate::attribute_info::AttributeInfo;

/// A `field_info` entry. Initial values are assigned in `<clinit>` or the
/// constructors, so `attributes` is usually empty.
#[binwrite]
#[derive(Clone, Debug, PartialEq, Eq)]
#[bw(big)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    #[bw(calc = attributes.len() as u16)]
    attributes_count: u16,
    pub attributes: Vec<AttributeInfo>,
}

#[binwrite]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[bw(big)]
pub struct FieldAccessFlags(u16);

bitflags! {
    impl FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        /// Enum constant field.
        const ENUM = 0x4000;
    }
}
