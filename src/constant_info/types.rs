use binrw::{binrw, binwrite};

/// A constant pool entry, tagged on write.
///
/// `Unusable` fills the slot after a `Long` or `Double` and writes nothing.
#[binwrite]
#[derive(Clone, Debug, PartialEq)]
#[bw(big)]
pub enum ConstantInfo {
    #[bw(magic = 1u8)]
    Utf8(Utf8Constant),
    #[bw(magic = 3u8)]
    Integer(IntegerConstant),
    #[bw(magic = 4u8)]
    Float(FloatConstant),
    #[bw(magic = 5u8)]
    Long(LongConstant),
    #[bw(magic = 6u8)]
    Double(DoubleConstant),
    #[bw(magic = 7u8)]
    Class(ClassConstant),
    #[bw(magic = 8u8)]
    String(StringConstant),
    #[bw(magic = 9u8)]
    FieldRef(FieldRefConstant),
    #[bw(magic = 10u8)]
    MethodRef(MethodRefConstant),
    #[bw(magic = 11u8)]
    InterfaceMethodRef(InterfaceMethodRefConstant),
    #[bw(magic = 12u8)]
    NameAndType(NameAndTypeConstant),
    Unusable,
}

/// Modified UTF-8 text, length-prefixed.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct Utf8Constant {
    #[br(temp)]
    #[bw(calc = bytes.len() as u16)]
    length: u16,
    #[br(count = length)]
    pub bytes: Vec<u8>,
}

impl Utf8Constant {
    pub fn new(value: &str) -> Self {
        Utf8Constant {
            bytes: encode_modified_utf8(value),
        }
    }

    /// Decoded text; malformed sequences become U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        decode_modified_utf8(&self.bytes)
    }
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct IntegerConstant {
    pub value: i32,
}

#[binrw]
#[derive(Clone, Debug, PartialEq)]
#[brw(big)]
pub struct FloatConstant {
    pub value: f32,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct LongConstant {
    pub value: i64,
}

#[binrw]
#[derive(Clone, Debug, PartialEq)]
#[brw(big)]
pub struct DoubleConstant {
    pub value: f64,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct ClassConstant {
    pub name_index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct StringConstant {
    pub string_index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct FieldRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct MethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct InterfaceMethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct NameAndTypeConstant {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Encode text the way the class file format stores it: NUL as two bytes,
/// supplementary characters as two three-byte surrogates.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        let c = u32::from(unit);
        match c {
            0x01..=0x7f => out.push(c as u8),
            0x00 | 0x80..=0x7ff => {
                out.push(0xc0 | (c >> 6) as u8);
                out.push(0x80 | (c & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (c >> 12) as u8);
                out.push(0x80 | ((c >> 6) & 0x3f) as u8);
                out.push(0x80 | (c & 0x3f) as u8);
            }
        }
    }
    out
}

pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xe0 == 0xc0 && i + 1 < bytes.len() {
            units.push((u16::from(b & 0x1f) << 6) | u16::from(bytes[i + 1] & 0x3f));
            i += 2;
        } else if b & 0xf0 == 0xe0 && i + 2 < bytes.len() {
            units.push(
                (u16::from(b & 0x0f) << 12)
                    | (u16::from(bytes[i + 1] & 0x3f) << 6)
                    | u16::from(bytes[i + 2] & 0x3f),
            );
            i += 3;
        } else {
            units.push(0xfffd);
            i += 1;
        }
    }
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(encode_modified_utf8("a\0b"), vec![b'a', 0xc0, 0x80, b'b']);
    }

    #[test]
    fn supplementary_characters_become_surrogate_pairs() {
        let bytes = encode_modified_utf8("\u{1F600}");
        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[0], 0xed);
        assert_eq!(decode_modified_utf8(&bytes), "\u{1F600}");
    }

    #[test]
    fn plain_ascii_is_unchanged() {
        assert_eq!(Utf8Constant::new("java/lang/Object").bytes, b"java/lang/Object".to_vec());
    }
}
