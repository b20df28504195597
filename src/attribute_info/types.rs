use std::io::Cursor;

use binrw::{binrw, binwrite, BinResult, BinWrite, Endian};

/// A raw attribute: name index plus the encoded payload.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct AttributeInfo {
    pub attribute_name_index: u16,
    #[br(temp)]
    #[bw(calc = info.len() as u32)]
    attribute_length: u32,
    #[br(count = attribute_length)]
    pub info: Vec<u8>,
}

impl AttributeInfo {
    /// Encode a typed attribute payload under the given name index.
    pub fn from_payload<T>(attribute_name_index: u16, payload: &T) -> BinResult<Self>
    where
        for<'a> T: BinWrite<Args<'a> = ()>,
    {
        let mut out = Cursor::new(Vec::new());
        payload.write_options(&mut out, Endian::Big, ())?;
        Ok(AttributeInfo {
            attribute_name_index,
            info: out.into_inner(),
        })
    }
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero catches everything.
    pub catch_type: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    #[br(temp)]
    #[bw(calc = code.len() as u32)]
    code_length: u32,
    #[br(count = code_length)]
    pub code: Vec<u8>,
    #[br(temp)]
    #[bw(calc = exception_table.len() as u16)]
    exception_table_length: u16,
    #[br(count = exception_table_length)]
    pub exception_table: Vec<ExceptionEntry>,
    #[br(temp)]
    #[bw(calc = attributes.len() as u16)]
    attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct LocalVariableTableAttribute {
    #[br(temp)]
    #[bw(calc = items.len() as u16)]
    local_variable_table_length: u16,
    #[br(count = local_variable_table_length)]
    pub items: Vec<LocalVariableTableItem>,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct LocalVariableTableItem {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct InnerClassesAttribute {
    #[br(temp)]
    #[bw(calc = classes.len() as u16)]
    number_of_classes: u16,
    #[br(count = number_of_classes)]
    pub classes: Vec<InnerClassInfo>,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct InnerClassInfo {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: InnerClassAccessFlags,
}

#[binrw]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[brw(big)]
pub struct InnerClassAccessFlags(u16);

bitflags! {
    impl InnerClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct RecordAttribute {
    #[br(temp)]
    #[bw(calc = components.len() as u16)]
    components_count: u16,
    #[br(count = components_count)]
    pub components: Vec<RecordComponentInfo>,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct RecordComponentInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
    #[br(temp)]
    #[bw(calc = attributes.len() as u16)]
    attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
}

#[binrw]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub struct SourceFileAttribute {
    pub sourcefile_index: u16,
}

#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big)]
pub enum VerificationTypeInfo {
    #[brw(magic = 0u8)]
    Top,
    #[brw(magic = 1u8)]
    Integer,
    #[brw(magic = 2u8)]
    Float,
    #[brw(magic = 3u8)]
    Double,
    #[brw(magic = 4u8)]
    Long,
    #[brw(magic = 5u8)]
    Null,
    #[brw(magic = 6u8)]
    UninitializedThis,
    #[brw(magic = 7u8)]
    Object {
        /// Constant pool index of the class.
        class: u16,
    },
    #[brw(magic = 8u8)]
    Uninitialized {
        /// Offset of the `new` that created the value.
        offset: u16,
    },
}

/// One `StackMapTable` entry; `frame_type` selects the layout of `inner`.
#[binwrite]
#[derive(Clone, Debug, PartialEq, Eq)]
#[bw(big)]
pub struct StackMapFrame {
    pub frame_type: u8,
    pub inner: StackMapFrameInner,
}

#[binwrite]
#[derive(Clone, Debug, PartialEq, Eq)]
#[bw(big)]
pub enum StackMapFrameInner {
    SameFrame {},
    SameLocals1StackItemFrame {
        stack: VerificationTypeInfo,
    },
    SameLocals1StackItemFrameExtended {
        offset_delta: u16,
        stack: VerificationTypeInfo,
    },
    ChopFrame {
        offset_delta: u16,
    },
    SameFrameExtended {
        offset_delta: u16,
    },
    AppendFrame {
        offset_delta: u16,
        locals: Vec<VerificationTypeInfo>,
    },
    FullFrame {
        offset_delta: u16,
        #[bw(calc = locals.len() as u16)]
        number_of_locals: u16,
        locals: Vec<VerificationTypeInfo>,
        #[bw(calc = stack.len() as u16)]
        number_of_stack_items: u16,
        stack: Vec<VerificationTypeInfo>,
    },
}

#[binwrite]
#[derive(Clone, Debug, PartialEq, Eq)]
#[bw(big)]
pub struct StackMapTableAttribute {
    #[bw(calc = entries.len() as u16)]
    number_of_entries: u16,
    pub entries: Vec<StackMapFrame>,
}

impl StackMapTableAttribute {
    pub fn new(entries: Vec<StackMapFrame>) -> Self {
        StackMapTableAttribute { entries }
    }
}
