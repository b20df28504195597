use crate::attribute_info::ExceptionEntry;
use crate::code_attribute::{instruction_addresses, Instruction};
use crate::constant_info::ConstantPool;
use crate::error::{LowerError, Result};
use crate::model::{PrimitiveType, TypeDef};

use super::stackmap::VType;

/// Jump target inside one method body.
pub type Label = usize;

/// Longest `code` array a method may have.
const MAX_CODE_LENGTH: u32 = 65535;

/// Computational category of a value, which picks the typed instruction family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    /// Kind of an erased type. `void` has no kind and maps to `Reference`;
    /// callers check for it first.
    pub fn of(ty: &TypeDef) -> ValueKind {
        match ty.as_primitive() {
            Some(PrimitiveType::Long) => ValueKind::Long,
            Some(PrimitiveType::Float) => ValueKind::Float,
            Some(PrimitiveType::Double) => ValueKind::Double,
            Some(PrimitiveType::Void) | None => ValueKind::Reference,
            Some(_) => ValueKind::Int,
        }
    }

    pub fn size(self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Clone, Debug)]
enum SwitchPatchKind {
    Table {
        low: i32,
        high: i32,
        /// One label per key in `low..=high`.
        case_labels: Vec<Label>,
        default_label: Label,
    },
    Lookup {
        /// Sorted by key.
        pairs: Vec<(i32, Label)>,
        default_label: Label,
    },
}

#[derive(Clone, Debug)]
struct SwitchPatch {
    instr_idx: usize,
    kind: SwitchPatchKind,
}

#[derive(Clone, Debug)]
struct PendingExceptionEntry {
    start_label: Label,
    end_label: Label,
    handler_label: Label,
    catch_type: u16,
}

#[derive(Clone, Debug, Default)]
struct LabelSlot {
    /// Index of the instruction the label precedes.
    position: Option<usize>,
    /// Some reachable jump, switch or exception range leads here.
    targeted: bool,
    /// The label was bound while the preceding code could fall into it.
    bound_reachable: bool,
}

/// Instruction list under construction for one method body.
///
/// Branches are emitted with placeholder offsets and patched in [`CodeBuffer::finish`]
/// once byte addresses are known. The buffer also tracks whether the current
/// position is reachable: after `goto`, a return, `athrow` or a switch, nothing
/// is emitted until a label that something jumps to is bound.
#[derive(Debug)]
pub struct CodeBuffer {
    instructions: Vec<Instruction>,
    labels: Vec<LabelSlot>,
    patches: Vec<(usize, Label)>,
    switch_patches: Vec<SwitchPatch>,
    pending_exceptions: Vec<PendingExceptionEntry>,
    stack_hints: Vec<(Label, Vec<VType>)>,
    reachable: bool,
}

/// Output of [`CodeBuffer::finish`]: patched instructions and byte-level metadata.
#[derive(Clone, Debug)]
pub struct ResolvedCode {
    pub instructions: Vec<Instruction>,
    /// Byte address of each instruction.
    pub addresses: Vec<u32>,
    pub code_length: u32,
    pub exception_table: Vec<ExceptionEntry>,
    /// Operand stack types forced at a merge address, topmost last.
    pub stack_hints: Vec<(u32, Vec<VType>)>,
    label_addresses: Vec<Option<u32>>,
}

impl ResolvedCode {
    pub fn label_address(&self, label: Label) -> Option<u32> {
        self.label_addresses.get(label).copied().flatten()
    }
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuffer {
    pub fn new() -> Self {
        CodeBuffer {
            instructions: Vec::new(),
            labels: Vec::new(),
            patches: Vec::new(),
            switch_patches: Vec::new(),
            pending_exceptions: Vec::new(),
            stack_hints: Vec::new(),
            reachable: true,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn new_label(&mut self) -> Label {
        let id = self.labels.len();
        self.labels.push(LabelSlot::default());
        id
    }

    pub fn bind_label(&mut self, label: Label) {
        let slot = &mut self.labels[label];
        slot.position = Some(self.instructions.len());
        slot.bound_reachable = self.reachable;
        if slot.targeted {
            self.reachable = true;
        }
    }

    /// Instruction index a bound label precedes.
    pub fn position(&self, label: Label) -> Option<usize> {
        self.labels.get(label).and_then(|slot| slot.position)
    }

    /// Create a label bound at the current position.
    pub fn here(&mut self) -> Label {
        let label = self.new_label();
        self.bind_label(label);
        label
    }

    pub fn emit(&mut self, instr: Instruction) {
        if !self.reachable {
            return;
        }
        let terminal = instr.is_terminal();
        self.instructions.push(instr);
        if terminal {
            self.reachable = false;
        }
    }

    /// Mark a label as a jump target, refusing targets that were bound inside dead code.
    fn target(&mut self, label: Label) -> Result<()> {
        let slot = &mut self.labels[label];
        if slot.position.is_some() && !slot.bound_reachable && !slot.targeted {
            return Err(LowerError::codegen(format!(
                "backward jump to label {} bound in unreachable code",
                label
            )));
        }
        slot.targeted = true;
        Ok(())
    }

    pub fn emit_branch(&mut self, instr_fn: fn(i16) -> Instruction, label: Label) -> Result<()> {
        if !self.reachable {
            return Ok(());
        }
        self.target(label)?;
        let idx = self.instructions.len();
        self.emit(instr_fn(0));
        self.patches.push((idx, label));
        Ok(())
    }

    pub fn emit_goto(&mut self, label: Label) -> Result<()> {
        self.emit_branch(Instruction::Goto, label)
    }

    /// Dense switch over `low..=high`; `case_labels` has one entry per key.
    pub fn emit_table_switch(
        &mut self,
        low: i32,
        high: i32,
        case_labels: Vec<Label>,
        default_label: Label,
    ) -> Result<()> {
        if !self.reachable {
            return Ok(());
        }
        for &label in case_labels.iter().chain(std::iter::once(&default_label)) {
            self.target(label)?;
        }
        let instr_idx = self.instructions.len();
        self.emit(Instruction::Tableswitch {
            default: 0,
            low,
            high,
            offsets: vec![0; case_labels.len()],
        });
        self.switch_patches.push(SwitchPatch {
            instr_idx,
            kind: SwitchPatchKind::Table {
                low,
                high,
                case_labels,
                default_label,
            },
        });
        Ok(())
    }

    /// Sparse switch; pairs are sorted here.
    pub fn emit_lookup_switch(&mut self, mut pairs: Vec<(i32, Label)>, default_label: Label) -> Result<()> {
        if !self.reachable {
            return Ok(());
        }
        pairs.sort_by_key(|(key, _)| *key);
        for &(_, label) in &pairs {
            self.target(label)?;
        }
        self.target(default_label)?;
        let instr_idx = self.instructions.len();
        self.emit(Instruction::Lookupswitch {
            default: 0,
            npairs: pairs.len() as u32,
            pairs: pairs.iter().map(|(key, _)| (*key, 0)).collect(),
        });
        self.switch_patches.push(SwitchPatch {
            instr_idx,
            kind: SwitchPatchKind::Lookup { pairs, default_label },
        });
        Ok(())
    }

    /// Register a protected range. `start` and `end` must already be bound and
    /// `handler` not yet. Empty ranges are dropped and do not make the handler reachable.
    pub fn add_exception_entry(&mut self, start: Label, end: Label, handler: Label, catch_type: u16) -> Result<()> {
        let (Some(from), Some(to)) = (self.labels[start].position, self.labels[end].position) else {
            return Err(LowerError::codegen("exception range registered before its bounds"));
        };
        if to <= from {
            return Ok(());
        }
        self.labels[handler].targeted = true;
        self.pending_exceptions.push(PendingExceptionEntry {
            start_label: start,
            end_label: end,
            handler_label: handler,
            catch_type,
        });
        Ok(())
    }

    /// Force the operand stack types at `label` (topmost last) when control merges there.
    pub fn hint_stack(&mut self, label: Label, types: Vec<VType>) {
        self.stack_hints.push((label, types));
    }

    pub fn emit_load(&mut self, kind: ValueKind, slot: u16) {
        self.emit(local_instruction(kind, slot, false));
    }

    pub fn emit_store(&mut self, kind: ValueKind, slot: u16) {
        self.emit(local_instruction(kind, slot, true));
    }

    pub fn emit_pop(&mut self, kind: ValueKind) {
        self.emit(if kind.size() == 2 { Instruction::Pop2 } else { Instruction::Pop });
    }

    pub fn emit_return(&mut self, kind: Option<ValueKind>) {
        self.emit(match kind {
            None => Instruction::Return,
            Some(ValueKind::Int) => Instruction::Ireturn,
            Some(ValueKind::Long) => Instruction::Lreturn,
            Some(ValueKind::Float) => Instruction::Freturn,
            Some(ValueKind::Double) => Instruction::Dreturn,
            Some(ValueKind::Reference) => Instruction::Areturn,
        });
    }

    pub fn emit_int_const(&mut self, value: i32, pool: &mut ConstantPool) -> Result<()> {
        let instr = match value {
            -1 => Instruction::Iconstm1,
            0 => Instruction::Iconst0,
            1 => Instruction::Iconst1,
            2 => Instruction::Iconst2,
            3 => Instruction::Iconst3,
            4 => Instruction::Iconst4,
            5 => Instruction::Iconst5,
            v if (-128..=127).contains(&v) => Instruction::Bipush(v as i8),
            v if (-32768..=32767).contains(&v) => Instruction::Sipush(v as i16),
            v => {
                let cp_idx = pool.integer(v)?;
                self.emit_ldc(cp_idx);
                return Ok(());
            }
        };
        self.emit(instr);
        Ok(())
    }

    pub fn emit_long_const(&mut self, value: i64, pool: &mut ConstantPool) -> Result<()> {
        match value {
            0 => self.emit(Instruction::Lconst0),
            1 => self.emit(Instruction::Lconst1),
            _ => {
                let cp_idx = pool.long(value)?;
                self.emit(Instruction::Ldc2W(cp_idx));
            }
        }
        Ok(())
    }

    pub fn emit_float_const(&mut self, value: f32, pool: &mut ConstantPool) -> Result<()> {
        if value == 0.0 && value.is_sign_positive() {
            self.emit(Instruction::Fconst0);
        } else if value == 1.0 {
            self.emit(Instruction::Fconst1);
        } else if value == 2.0 {
            self.emit(Instruction::Fconst2);
        } else {
            let cp_idx = pool.float(value)?;
            self.emit_ldc(cp_idx);
        }
        Ok(())
    }

    pub fn emit_double_const(&mut self, value: f64, pool: &mut ConstantPool) -> Result<()> {
        if value == 0.0 && value.is_sign_positive() {
            self.emit(Instruction::Dconst0);
        } else if value == 1.0 {
            self.emit(Instruction::Dconst1);
        } else {
            let cp_idx = pool.double(value)?;
            self.emit(Instruction::Ldc2W(cp_idx));
        }
        Ok(())
    }

    pub fn emit_ldc(&mut self, cp_idx: u16) {
        if cp_idx <= 255 {
            self.emit(Instruction::Ldc(cp_idx as u8));
        } else {
            self.emit(Instruction::LdcW(cp_idx));
        }
    }

    /// Resolve labels to byte addresses and patch every branch and switch.
    pub fn finish(mut self) -> Result<ResolvedCode> {
        let (addresses, code_length) = instruction_addresses(&self.instructions);
        if code_length > MAX_CODE_LENGTH {
            return Err(LowerError::codegen(format!(
                "method body is {} bytes, the limit is {}",
                code_length, MAX_CODE_LENGTH
            )));
        }

        let label_addresses: Vec<Option<u32>> = self
            .labels
            .iter()
            .map(|slot| {
                slot.position
                    .map(|idx| addresses.get(idx).copied().unwrap_or(code_length))
            })
            .collect();
        let resolve = |label: Label| -> Result<i32> {
            label_addresses[label]
                .map(|a| a as i32)
                .ok_or_else(|| LowerError::codegen(format!("unresolved label {}", label)))
        };

        for &(instr_idx, label) in &self.patches {
            let source = addresses[instr_idx] as i32;
            let offset = resolve(label)? - source;
            let offset16 = i16::try_from(offset).map_err(|_| {
                LowerError::codegen(format!("branch offset {} at {} does not fit 16 bits", offset, source))
            })?;
            let patched = self.instructions[instr_idx]
                .with_branch_offset(offset16)
                .ok_or_else(|| {
                    LowerError::codegen(format!(
                        "cannot patch branch offset on {:?}",
                        self.instructions[instr_idx]
                    ))
                })?;
            self.instructions[instr_idx] = patched;
        }

        for patch in &self.switch_patches {
            let source = addresses[patch.instr_idx] as i32;
            self.instructions[patch.instr_idx] = match &patch.kind {
                SwitchPatchKind::Table {
                    low,
                    high,
                    case_labels,
                    default_label,
                } => Instruction::Tableswitch {
                    default: resolve(*default_label)? - source,
                    low: *low,
                    high: *high,
                    offsets: case_labels
                        .iter()
                        .map(|l| resolve(*l).map(|a| a - source))
                        .collect::<Result<Vec<_>>>()?,
                },
                SwitchPatchKind::Lookup { pairs, default_label } => {
                    let pairs = pairs
                        .iter()
                        .map(|(key, l)| resolve(*l).map(|a| (*key, a - source)))
                        .collect::<Result<Vec<_>>>()?;
                    Instruction::Lookupswitch {
                        default: resolve(*default_label)? - source,
                        npairs: pairs.len() as u32,
                        pairs,
                    }
                }
            };
        }

        let mut exception_table = Vec::with_capacity(self.pending_exceptions.len());
        for pending in &self.pending_exceptions {
            let start_pc = resolve(pending.start_label)? as u16;
            let end_pc = resolve(pending.end_label)? as u16;
            if start_pc == end_pc {
                continue;
            }
            exception_table.push(ExceptionEntry {
                start_pc,
                end_pc,
                handler_pc: resolve(pending.handler_label)? as u16,
                catch_type: pending.catch_type,
            });
        }

        let stack_hints = self
            .stack_hints
            .iter()
            .filter_map(|(label, types)| label_addresses[*label].map(|a| (a, types.clone())))
            .collect();

        Ok(ResolvedCode {
            instructions: self.instructions,
            addresses,
            code_length,
            exception_table,
            stack_hints,
            label_addresses,
        })
    }
}

/// The shortest load or store form for a slot.
fn local_instruction(kind: ValueKind, slot: u16, store: bool) -> Instruction {
    use Instruction::*;
    let short: [Instruction; 4] = match (kind, store) {
        (ValueKind::Int, false) => [Iload0, Iload1, Iload2, Iload3],
        (ValueKind::Long, false) => [Lload0, Lload1, Lload2, Lload3],
        (ValueKind::Float, false) => [Fload0, Fload1, Fload2, Fload3],
        (ValueKind::Double, false) => [Dload0, Dload1, Dload2, Dload3],
        (ValueKind::Reference, false) => [Aload0, Aload1, Aload2, Aload3],
        (ValueKind::Int, true) => [Istore0, Istore1, Istore2, Istore3],
        (ValueKind::Long, true) => [Lstore0, Lstore1, Lstore2, Lstore3],
        (ValueKind::Float, true) => [Fstore0, Fstore1, Fstore2, Fstore3],
        (ValueKind::Double, true) => [Dstore0, Dstore1, Dstore2, Dstore3],
        (ValueKind::Reference, true) => [Astore0, Astore1, Astore2, Astore3],
    };
    if slot <= 3 {
        return short[slot as usize].clone();
    }
    if slot <= 255 {
        let s = slot as u8;
        return match (kind, store) {
            (ValueKind::Int, false) => Iload(s),
            (ValueKind::Long, false) => Lload(s),
            (ValueKind::Float, false) => Fload(s),
            (ValueKind::Double, false) => Dload(s),
            (ValueKind::Reference, false) => Aload(s),
            (ValueKind::Int, true) => Istore(s),
            (ValueKind::Long, true) => Lstore(s),
            (ValueKind::Float, true) => Fstore(s),
            (ValueKind::Double, true) => Dstore(s),
            (ValueKind::Reference, true) => Astore(s),
        };
    }
    match (kind, store) {
        (ValueKind::Int, false) => IloadWide(slot),
        (ValueKind::Long, false) => LloadWide(slot),
        (ValueKind::Float, false) => FloadWide(slot),
        (ValueKind::Double, false) => DloadWide(slot),
        (ValueKind::Reference, false) => AloadWide(slot),
        (ValueKind::Int, true) => IstoreWide(slot),
        (ValueKind::Long, true) => LstoreWide(slot),
        (ValueKind::Float, true) => FstoreWide(slot),
        (ValueKind::Double, true) => DstoreWide(slot),
        (ValueKind::Reference, true) => AstoreWide(slot),
    }
}
