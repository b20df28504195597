use crate::attribute_info::{
    StackMapFrame, StackMapFrameInner, StackMapTableAttribute, VerificationTypeInfo,
};
use crate::constant_info::ConstantPool;
use crate::error::Result;

/// Verification type of one local slot or operand stack entry.
///
/// Class names are internal names (`java/lang/String`), array classes use
/// their descriptor (`[I`, `[Ljava/lang/String;`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VType {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    /// Result of the `new` at this byte offset, before its constructor ran.
    Uninitialized(u32),
    Object(String),
}

impl VType {
    pub fn object(name: impl Into<String>) -> VType {
        VType::Object(name.into())
    }

    /// Verification type of a value with this field descriptor.
    pub fn from_descriptor(descriptor: &str) -> VType {
        match descriptor.as_bytes().first() {
            Some(b'Z' | b'B' | b'C' | b'S' | b'I') => VType::Integer,
            Some(b'F') => VType::Float,
            Some(b'J') => VType::Long,
            Some(b'D') => VType::Double,
            Some(b'[') => VType::Object(descriptor.to_string()),
            Some(b'L') => VType::Object(descriptor[1..descriptor.len() - 1].to_string()),
            _ => VType::Top,
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, VType::Long | VType::Double)
    }

    /// Words occupied on the operand stack or in the local array.
    pub fn size(&self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            VType::Null | VType::UninitializedThis | VType::Uninitialized(_) | VType::Object(_)
        )
    }

    fn to_verification_type_info(&self, pool: &mut ConstantPool) -> Result<VerificationTypeInfo> {
        Ok(match self {
            VType::Top => VerificationTypeInfo::Top,
            VType::Integer => VerificationTypeInfo::Integer,
            VType::Float => VerificationTypeInfo::Float,
            VType::Long => VerificationTypeInfo::Long,
            VType::Double => VerificationTypeInfo::Double,
            VType::Null => VerificationTypeInfo::Null,
            VType::UninitializedThis => VerificationTypeInfo::UninitializedThis,
            VType::Uninitialized(offset) => VerificationTypeInfo::Uninitialized { offset: *offset as u16 },
            VType::Object(name) => VerificationTypeInfo::Object {
                class: pool.class(name)?,
            },
        })
    }
}

/// Frame state at a branch target or handler, as computed by the stack analysis.
///
/// `locals` has one entry per slot (a long or double is followed by `Top`);
/// `stack` has one entry per value.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub bytecode_offset: u32,
    pub locals: Vec<VType>,
    pub stack: Vec<VType>,
}

/// Collects frame snapshots and encodes them as a `StackMapTable`.
pub struct FrameTracker {
    initial_locals: Vec<VType>,
    snapshots: Vec<FrameSnapshot>,
}

impl FrameTracker {
    /// `initial_locals` is the implicit frame at offset 0, slot by slot.
    pub fn new(initial_locals: Vec<VType>) -> Self {
        FrameTracker {
            initial_locals: compact_locals(&initial_locals),
            snapshots: Vec::new(),
        }
    }

    pub fn record_frame(&mut self, snapshot: FrameSnapshot) {
        if let Some(existing) = self
            .snapshots
            .iter_mut()
            .find(|s| s.bytecode_offset == snapshot.bytecode_offset)
        {
            *existing = snapshot;
            return;
        }
        self.snapshots.push(snapshot);
    }

    /// Encode the recorded frames. Class entries are added to `pool` as needed.
    pub fn build(mut self, pool: &mut ConstantPool) -> Result<Option<StackMapTableAttribute>> {
        if self.snapshots.is_empty() {
            return Ok(None);
        }

        self.snapshots.sort_by_key(|s| s.bytecode_offset);

        let mut entries = Vec::with_capacity(self.snapshots.len());
        let mut prev_offset: i64 = -1;
        let mut prev_locals = self.initial_locals;

        for snapshot in &self.snapshots {
            let offset_delta = (snapshot.bytecode_offset as i64 - prev_offset - 1) as u16;
            prev_offset = snapshot.bytecode_offset as i64;

            let locals = compact_locals(&snapshot.locals);
            entries.push(encode_frame(&prev_locals, &locals, &snapshot.stack, offset_delta, pool)?);
            prev_locals = locals;
        }

        Ok(Some(StackMapTableAttribute::new(entries)))
    }
}

/// Frame form of a local array: the `Top` after a long/double is implied and
/// trailing `Top` entries are dropped.
pub fn compact_locals(locals: &[VType]) -> Vec<VType> {
    let mut out = Vec::with_capacity(locals.len());
    let mut i = 0;
    while i < locals.len() {
        let v = &locals[i];
        out.push(v.clone());
        i += if v.is_wide() { 2 } else { 1 };
    }
    while out.last() == Some(&VType::Top) {
        out.pop();
    }
    out
}

fn encode_all(types: &[VType], pool: &mut ConstantPool) -> Result<Vec<VerificationTypeInfo>> {
    types.iter().map(|v| v.to_verification_type_info(pool)).collect()
}

/// Choose the most compact frame encoding relative to the previous frame's locals.
fn encode_frame(
    prev_locals: &[VType],
    locals: &[VType],
    stack: &[VType],
    offset_delta: u16,
    pool: &mut ConstantPool,
) -> Result<StackMapFrame> {
    let same_locals = prev_locals == locals;

    if stack.is_empty() && same_locals {
        return Ok(if offset_delta <= 63 {
            StackMapFrame {
                frame_type: offset_delta as u8,
                inner: StackMapFrameInner::SameFrame {},
            }
        } else {
            StackMapFrame {
                frame_type: 251,
                inner: StackMapFrameInner::SameFrameExtended { offset_delta },
            }
        });
    }

    if stack.len() == 1 && same_locals {
        let stack_item = stack[0].to_verification_type_info(pool)?;
        return Ok(if offset_delta <= 63 {
            StackMapFrame {
                frame_type: 64 + offset_delta as u8,
                inner: StackMapFrameInner::SameLocals1StackItemFrame { stack: stack_item },
            }
        } else {
            StackMapFrame {
                frame_type: 247,
                inner: StackMapFrameInner::SameLocals1StackItemFrameExtended {
                    offset_delta,
                    stack: stack_item,
                },
            }
        });
    }

    if stack.is_empty() && locals.len() > prev_locals.len() {
        let extra = locals.len() - prev_locals.len();
        if extra <= 3 && locals[..prev_locals.len()] == *prev_locals {
            return Ok(StackMapFrame {
                frame_type: 251 + extra as u8,
                inner: StackMapFrameInner::AppendFrame {
                    offset_delta,
                    locals: encode_all(&locals[prev_locals.len()..], pool)?,
                },
            });
        }
    }

    if stack.is_empty() && locals.len() < prev_locals.len() {
        let chopped = prev_locals.len() - locals.len();
        if chopped <= 3 && prev_locals[..locals.len()] == *locals {
            return Ok(StackMapFrame {
                frame_type: (251 - chopped) as u8,
                inner: StackMapFrameInner::ChopFrame { offset_delta },
            });
        }
    }

    Ok(StackMapFrame {
        frame_type: 255,
        inner: StackMapFrameInner::FullFrame {
            offset_delta,
            locals: encode_all(locals, pool)?,
            stack: encode_all(stack, pool)?,
        },
    })
}
