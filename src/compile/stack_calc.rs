use std::collections::{BTreeSet, HashMap};

use log::warn;

use crate::code_attribute::Instruction;
use crate::constant_info::{ConstantPool, LoadableKind};
use crate::error::{LowerError, Result};

use super::codegen::{ResolvedCode, ValueKind};
use super::descriptor::parse_method_descriptor;
use super::hierarchy::ClassHierarchy;
use super::stackmap::{FrameSnapshot, VType};

const OBJECT: &str = "java/lang/Object";

/// Everything the analysis needs besides the instructions themselves.
pub struct AnalysisInput<'a> {
    pub code: &'a ResolvedCode,
    pub pool: &'a ConstantPool,
    pub hierarchy: &'a ClassHierarchy,
    /// Declared type of every local slot; reference stores take this type.
    pub slot_types: &'a [VType],
    /// Locals on method entry, slot by slot.
    pub entry_locals: Vec<VType>,
    /// Internal name of the class being written, for `uninitializedThis`.
    pub this_class: Option<String>,
    /// Fail on an inconsistency instead of logging it.
    pub strict: bool,
}

/// Result of the dataflow pass.
#[derive(Clone, Debug)]
pub struct StackAnalysis {
    pub max_stack: u16,
    /// One frame per branch target and exception handler, by offset.
    pub frames: Vec<FrameSnapshot>,
}

#[derive(Clone, Debug, PartialEq)]
struct Frame {
    locals: Vec<VType>,
    stack: Vec<VType>,
}

impl Frame {
    fn depth(&self) -> u32 {
        self.stack.iter().map(|v| u32::from(v.size())).sum()
    }
}

struct Handler {
    start: usize,
    end: usize,
    handler: usize,
    catch_type: VType,
}

/// Simulate verification types over every control-flow path.
///
/// Computes `max_stack`, checks that merge points agree on the stack shape
/// and collects the frames a `StackMapTable` needs.
pub fn analyze(input: &AnalysisInput) -> Result<StackAnalysis> {
    Analyzer::new(input)?.run()
}

struct Analyzer<'a> {
    input: &'a AnalysisInput<'a>,
    index_of: HashMap<u32, usize>,
    handlers: Vec<Handler>,
    hints: HashMap<usize, Vec<VType>>,
    states: Vec<Option<Frame>>,
    targets: BTreeSet<usize>,
}

impl<'a> Analyzer<'a> {
    fn new(input: &'a AnalysisInput<'a>) -> Result<Self> {
        let code = input.code;
        let mut index_of: HashMap<u32, usize> = code
            .addresses
            .iter()
            .enumerate()
            .map(|(i, a)| (*a, i))
            .collect();
        index_of.insert(code.code_length, code.instructions.len());

        let lookup = |address: u16| -> Result<usize> {
            index_of
                .get(&u32::from(address))
                .copied()
                .ok_or_else(|| LowerError::codegen(format!("exception range bound {} is not an instruction", address)))
        };
        let mut handlers = Vec::with_capacity(code.exception_table.len());
        let mut targets = BTreeSet::new();
        for entry in &code.exception_table {
            let catch_type = if entry.catch_type == 0 {
                VType::object("java/lang/Throwable")
            } else {
                VType::Object(input.pool.class_name_at(entry.catch_type).ok_or_else(|| {
                    LowerError::codegen(format!("catch type {} is not a class constant", entry.catch_type))
                })?)
            };
            let handler = lookup(entry.handler_pc)?;
            targets.insert(handler);
            handlers.push(Handler {
                start: lookup(entry.start_pc)?,
                end: lookup(entry.end_pc)?,
                handler,
                catch_type,
            });
        }

        for (i, instr) in code.instructions.iter().enumerate() {
            let offsets: Vec<i32> = match instr {
                Instruction::Tableswitch { default, offsets, .. } => {
                    std::iter::once(*default).chain(offsets.iter().copied()).collect()
                }
                Instruction::Lookupswitch { default, pairs, .. } => {
                    std::iter::once(*default).chain(pairs.iter().map(|(_, o)| *o)).collect()
                }
                other => other.branch_offset().map(i32::from).into_iter().collect(),
            };
            for offset in offsets {
                let target = i64::from(code.addresses[i]) + i64::from(offset);
                let idx = u32::try_from(target)
                    .ok()
                    .and_then(|a| index_of.get(&a).copied())
                    .ok_or_else(|| LowerError::codegen(format!("branch to {} is not an instruction boundary", target)))?;
                targets.insert(idx);
            }
        }

        let mut hints = HashMap::new();
        for (address, types) in &code.stack_hints {
            if let Some(&idx) = index_of.get(address) {
                hints.insert(idx, types.clone());
            }
        }

        Ok(Analyzer {
            input,
            index_of,
            handlers,
            hints,
            states: vec![None; code.instructions.len()],
            targets,
        })
    }

    fn fail(&self, message: String) -> Result<()> {
        if self.input.strict {
            Err(LowerError::codegen(message))
        } else {
            warn!("stack analysis: {}", message);
            Ok(())
        }
    }

    fn run(mut self) -> Result<StackAnalysis> {
        let input = self.input;
        let instructions = &input.code.instructions;
        if instructions.is_empty() {
            return Ok(StackAnalysis {
                max_stack: 0,
                frames: Vec::new(),
            });
        }

        let mut locals = input.entry_locals.clone();
        locals.resize(input.slot_types.len().max(locals.len()), VType::Top);
        self.states[0] = Some(Frame {
            locals,
            stack: Vec::new(),
        });

        let mut max_stack = 0u32;
        let mut worklist = vec![0usize];
        while let Some(i) = worklist.pop() {
            let Some(frame) = self.states[i].clone() else {
                continue;
            };
            max_stack = max_stack.max(frame.depth());

            let covering: Vec<(usize, VType)> = self
                .handlers
                .iter()
                .filter(|h| h.start <= i && i < h.end)
                .map(|h| (h.handler, h.catch_type.clone()))
                .collect();
            for (handler, catch_type) in covering {
                let incoming = Frame {
                    locals: frame.locals.clone(),
                    stack: vec![catch_type],
                };
                if self.merge_into(handler, incoming)? {
                    worklist.push(handler);
                }
            }

            let mut out = frame;
            let successors = self.execute(i, &mut out)?;
            max_stack = max_stack.max(out.depth());
            for s in successors {
                if s >= instructions.len() {
                    self.fail(format!(
                        "execution falls off the end of the code after offset {}",
                        input.code.addresses[i]
                    ))?;
                    continue;
                }
                if self.merge_into(s, out.clone())? {
                    worklist.push(s);
                }
            }
        }

        let frames = self
            .targets
            .iter()
            .filter_map(|&idx| {
                self.states.get(idx).cloned().flatten().map(|f| FrameSnapshot {
                    bytecode_offset: input.code.addresses[idx],
                    locals: f.locals,
                    stack: f.stack,
                })
            })
            .collect();

        let max_stack = u16::try_from(max_stack)
            .map_err(|_| LowerError::codegen(format!("operand stack depth {} exceeds 65535", max_stack)))?;
        Ok(StackAnalysis { max_stack, frames })
    }

    /// Merge `incoming` into the state at `idx`; true when the state changed.
    fn merge_into(&mut self, idx: usize, incoming: Frame) -> Result<bool> {
        let merged = match &self.states[idx] {
            None => incoming,
            Some(existing) => {
                if existing.stack.len() != incoming.stack.len() || existing.depth() != incoming.depth() {
                    self.fail(format!(
                        "stack depth mismatch at offset {}: {} vs {}",
                        self.input.code.addresses[idx],
                        existing.depth(),
                        incoming.depth()
                    ))?;
                    return Ok(false);
                }
                let mut stack = Vec::with_capacity(existing.stack.len());
                for (a, b) in existing.stack.iter().zip(&incoming.stack) {
                    match self.merge_value(a, b) {
                        Some(v) => stack.push(v),
                        None => {
                            self.fail(format!(
                                "incompatible stack entries {:?} and {:?} at offset {}",
                                a, b, self.input.code.addresses[idx]
                            ))?;
                            stack.push(VType::Top);
                        }
                    }
                }
                let locals = existing
                    .locals
                    .iter()
                    .zip(&incoming.locals)
                    .map(|(a, b)| self.merge_value(a, b).unwrap_or(VType::Top))
                    .collect();
                Frame { locals, stack }
            }
        };
        let merged = self.apply_hint(idx, merged);
        if self.states[idx].as_ref() == Some(&merged) {
            return Ok(false);
        }
        self.states[idx] = Some(merged);
        Ok(true)
    }

    fn apply_hint(&self, idx: usize, mut frame: Frame) -> Frame {
        if let Some(hint) = self.hints.get(&idx) {
            if hint.len() <= frame.stack.len() {
                let base = frame.stack.len() - hint.len();
                for (slot, ty) in frame.stack[base..].iter_mut().zip(hint) {
                    if slot.is_reference() && ty.is_reference() {
                        *slot = ty.clone();
                    }
                }
            }
        }
        frame
    }

    fn merge_value(&self, a: &VType, b: &VType) -> Option<VType> {
        if a == b {
            return Some(a.clone());
        }
        match (a, b) {
            (VType::Null, VType::Object(_)) => Some(b.clone()),
            (VType::Object(_), VType::Null) => Some(a.clone()),
            (VType::Object(x), VType::Object(y)) => Some(VType::Object(self.common_superclass(x, y))),
            _ => None,
        }
    }

    fn common_superclass(&self, a: &str, b: &str) -> String {
        if a == b {
            return a.to_string();
        }
        match (a.strip_prefix('['), b.strip_prefix('[')) {
            (Some(ea), Some(eb)) => {
                if ea == eb {
                    return a.to_string();
                }
                let class_a = ea.strip_prefix('L').and_then(|s| s.strip_suffix(';'));
                let class_b = eb.strip_prefix('L').and_then(|s| s.strip_suffix(';'));
                match (class_a, class_b) {
                    (Some(x), Some(y)) => format!("[L{};", self.common_superclass(x, y)),
                    _ if ea.starts_with('[') && eb.starts_with('[') => {
                        format!("[{}", self.common_superclass(ea, eb))
                    }
                    _ => OBJECT.to_string(),
                }
            }
            (None, None) => self.input.hierarchy.common_superclass(a, b),
            _ => OBJECT.to_string(),
        }
    }

    fn pop(&self, frame: &mut Frame, at: usize) -> Result<VType> {
        match frame.stack.pop() {
            Some(v) => Ok(v),
            None => {
                self.fail(format!("stack underflow at offset {}", self.input.code.addresses[at]))?;
                Ok(VType::Top)
            }
        }
    }

    fn pop_n(&self, frame: &mut Frame, n: usize, at: usize) -> Result<()> {
        for _ in 0..n {
            self.pop(frame, at)?;
        }
        Ok(())
    }

    /// Pop values totalling `words` stack words, topmost first.
    fn pop_words(&self, frame: &mut Frame, words: u16, at: usize) -> Result<Vec<VType>> {
        let mut taken = Vec::new();
        let mut total = 0;
        while total < words {
            let v = self.pop(frame, at)?;
            total += v.size();
            taken.push(v);
        }
        if total != words {
            self.fail(format!(
                "stack manipulation splits a long or double at offset {}",
                self.input.code.addresses[at]
            ))?;
        }
        Ok(taken)
    }

    /// `dup`-family: copy the top `copy` words below the `skip` words under them.
    fn dup(&self, frame: &mut Frame, copy: u16, skip: u16, at: usize) -> Result<()> {
        let top = self.pop_words(frame, copy, at)?;
        let under = self.pop_words(frame, skip, at)?;
        frame.stack.extend(top.iter().rev().cloned());
        frame.stack.extend(under.into_iter().rev());
        frame.stack.extend(top.into_iter().rev());
        Ok(())
    }

    fn class_at(&self, index: u16) -> Result<String> {
        self.input
            .pool
            .class_name_at(index)
            .ok_or_else(|| LowerError::codegen(format!("constant {} is not a class", index)))
    }

    fn branch_target(&self, at: usize, offset: i32) -> Result<usize> {
        let address = self.input.code.addresses[at] as i64 + i64::from(offset);
        u32::try_from(address)
            .ok()
            .and_then(|a| self.index_of.get(&a).copied())
            .ok_or_else(|| LowerError::codegen(format!("branch to {} is not an instruction boundary", address)))
    }

    fn store(&self, frame: &mut Frame, slot: u16, value: VType, kind: ValueKind) {
        let slot = usize::from(slot);
        let needed = slot + usize::from(kind.size());
        if frame.locals.len() < needed {
            frame.locals.resize(needed, VType::Top);
        }
        let stored = match (kind, self.input.slot_types.get(slot)) {
            (ValueKind::Reference, Some(declared @ VType::Object(_))) if value != VType::UninitializedThis => {
                declared.clone()
            }
            _ => value,
        };
        if slot > 0 && frame.locals[slot - 1].is_wide() {
            frame.locals[slot - 1] = VType::Top;
        }
        frame.locals[slot] = stored;
        if kind.size() == 2 {
            frame.locals[slot + 1] = VType::Top;
        }
    }

    fn load(&self, frame: &mut Frame, slot: u16, kind: ValueKind, at: usize) -> Result<()> {
        let current = frame.locals.get(usize::from(slot)).cloned().unwrap_or(VType::Top);
        let pushed = match kind {
            ValueKind::Int => VType::Integer,
            ValueKind::Long => VType::Long,
            ValueKind::Float => VType::Float,
            ValueKind::Double => VType::Double,
            ValueKind::Reference => current.clone(),
        };
        let matches = match kind {
            ValueKind::Reference => current.is_reference(),
            _ => current == pushed,
        };
        if !matches {
            self.fail(format!(
                "load of slot {} holding {:?} at offset {}",
                slot, current, self.input.code.addresses[at]
            ))?;
        }
        frame.stack.push(pushed);
        Ok(())
    }

    /// Replace every copy of an uninitialized value once its constructor ran.
    fn initialize(&self, frame: &mut Frame, receiver: &VType) -> Result<()> {
        let class = match receiver {
            VType::UninitializedThis => self.input.this_class.clone().unwrap_or_else(|| OBJECT.to_string()),
            VType::Uninitialized(offset) => {
                let idx = self.index_of.get(offset).copied();
                match idx.map(|i| &self.input.code.instructions[i]) {
                    Some(Instruction::New(index)) => self.class_at(*index)?,
                    _ => {
                        return Err(LowerError::codegen(format!("no `new` at offset {}", offset)));
                    }
                }
            }
            _ => return Ok(()),
        };
        let initialized = VType::Object(class);
        for v in frame.locals.iter_mut().chain(frame.stack.iter_mut()) {
            if v == receiver {
                *v = initialized.clone();
            }
        }
        Ok(())
    }

    fn invoke(&self, frame: &mut Frame, index: u16, has_receiver: bool, at: usize) -> Result<()> {
        let member = self
            .input
            .pool
            .member_at(index)
            .ok_or_else(|| LowerError::codegen(format!("constant {} is not a method reference", index)))?;
        let (params, ret) = parse_method_descriptor(&member.descriptor)
            .ok_or_else(|| LowerError::codegen(format!("malformed descriptor {}", member.descriptor)))?;
        self.pop_n(frame, params.len(), at)?;
        if has_receiver {
            let receiver = self.pop(frame, at)?;
            if member.name == "<init>" {
                self.initialize(frame, &receiver)?;
            }
        }
        if ret != "V" {
            frame.stack.push(VType::from_descriptor(&ret));
        }
        Ok(())
    }

    /// Apply instruction `i` to `frame` and return its successors.
    fn execute(&self, i: usize, frame: &mut Frame) -> Result<Vec<usize>> {
        use Instruction::*;
        let instr = &self.input.code.instructions[i];
        let next = vec![i + 1];

        if let Some((kind, slot, store)) = local_access(instr) {
            if store {
                let value = self.pop(frame, i)?;
                self.store(frame, slot, value, kind);
            } else {
                self.load(frame, slot, kind, i)?;
            }
            return Ok(next);
        }

        match instr {
            Nop | Iinc { .. } | IincWide { .. } => {}
            Aconstnull => frame.stack.push(VType::Null),
            Iconstm1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 | Bipush(_) | Sipush(_) => {
                frame.stack.push(VType::Integer)
            }
            Lconst0 | Lconst1 => frame.stack.push(VType::Long),
            Fconst0 | Fconst1 | Fconst2 => frame.stack.push(VType::Float),
            Dconst0 | Dconst1 => frame.stack.push(VType::Double),
            Ldc(_) | LdcW(_) | Ldc2W(_) => {
                let index = match instr {
                    Ldc(idx) => u16::from(*idx),
                    LdcW(idx) | Ldc2W(idx) => *idx,
                    _ => 0,
                };
                let pushed = match self.input.pool.loadable_kind(index) {
                    Some(LoadableKind::Integer) => VType::Integer,
                    Some(LoadableKind::Float) => VType::Float,
                    Some(LoadableKind::Long) => VType::Long,
                    Some(LoadableKind::Double) => VType::Double,
                    Some(LoadableKind::String) => VType::object("java/lang/String"),
                    Some(LoadableKind::Class) => VType::object("java/lang/Class"),
                    None => {
                        return Err(LowerError::codegen(format!("constant {} is not loadable", index)));
                    }
                };
                frame.stack.push(pushed);
            }

            Iaload | Baload | Caload | Saload | Laload | Faload | Daload | Aaload => {
                self.pop(frame, i)?;
                let array = self.pop(frame, i)?;
                frame.stack.push(match instr {
                    Laload => VType::Long,
                    Faload => VType::Float,
                    Daload => VType::Double,
                    Aaload => element_of(&array),
                    _ => VType::Integer,
                });
            }
            Iastore | Bastore | Castore | Sastore | Lastore | Fastore | Dastore | Aastore => {
                self.pop_n(frame, 3, i)?;
            }

            Pop => {
                self.pop_words(frame, 1, i)?;
            }
            Pop2 => {
                self.pop_words(frame, 2, i)?;
            }
            Dup => self.dup(frame, 1, 0, i)?,
            Dupx1 => self.dup(frame, 1, 1, i)?,
            Dupx2 => self.dup(frame, 1, 2, i)?,
            Dup2 => self.dup(frame, 2, 0, i)?,
            Dup2x1 => self.dup(frame, 2, 1, i)?,
            Dup2x2 => self.dup(frame, 2, 2, i)?,
            Swap => {
                let a = self.pop(frame, i)?;
                let b = self.pop(frame, i)?;
                frame.stack.push(a);
                frame.stack.push(b);
            }

            Iadd | Isub | Imul | Idiv | Irem | Ishl | Ishr | Iushr | Iand | Ior | Ixor => {
                self.pop_n(frame, 2, i)?;
                frame.stack.push(VType::Integer);
            }
            Ladd | Lsub | Lmul | Ldiv | Lrem | Lshl | Lshr | Lushr | Land | Lor | Lxor => {
                self.pop_n(frame, 2, i)?;
                frame.stack.push(VType::Long);
            }
            Fadd | Fsub | Fmul | Fdiv | Frem => {
                self.pop_n(frame, 2, i)?;
                frame.stack.push(VType::Float);
            }
            Dadd | Dsub | Dmul | Ddiv | Drem => {
                self.pop_n(frame, 2, i)?;
                frame.stack.push(VType::Double);
            }
            Ineg | Lneg | Fneg | Dneg => {
                let v = self.pop(frame, i)?;
                frame.stack.push(v);
            }
            I2l | F2l | D2l => {
                self.pop(frame, i)?;
                frame.stack.push(VType::Long);
            }
            I2f | L2f | D2f => {
                self.pop(frame, i)?;
                frame.stack.push(VType::Float);
            }
            I2d | L2d | F2d => {
                self.pop(frame, i)?;
                frame.stack.push(VType::Double);
            }
            L2i | F2i | D2i | I2b | I2c | I2s => {
                self.pop(frame, i)?;
                frame.stack.push(VType::Integer);
            }
            Lcmp | Fcmpl | Fcmpg | Dcmpl | Dcmpg => {
                self.pop_n(frame, 2, i)?;
                frame.stack.push(VType::Integer);
            }

            Ifeq(o) | Ifne(o) | Iflt(o) | Ifge(o) | Ifgt(o) | Ifle(o) | Ifnull(o) | Ifnonnull(o) => {
                self.pop(frame, i)?;
                return Ok(vec![self.branch_target(i, i32::from(*o))?, i + 1]);
            }
            IfIcmpeq(o) | IfIcmpne(o) | IfIcmplt(o) | IfIcmpge(o) | IfIcmpgt(o) | IfIcmple(o) | IfAcmpeq(o)
            | IfAcmpne(o) => {
                self.pop_n(frame, 2, i)?;
                return Ok(vec![self.branch_target(i, i32::from(*o))?, i + 1]);
            }
            Goto(o) => return Ok(vec![self.branch_target(i, i32::from(*o))?]),
            Tableswitch { default, offsets, .. } => {
                self.pop(frame, i)?;
                let mut out = vec![self.branch_target(i, *default)?];
                for o in offsets {
                    out.push(self.branch_target(i, *o)?);
                }
                out.sort_unstable();
                out.dedup();
                return Ok(out);
            }
            Lookupswitch { default, pairs, .. } => {
                self.pop(frame, i)?;
                let mut out = vec![self.branch_target(i, *default)?];
                for (_, o) in pairs {
                    out.push(self.branch_target(i, *o)?);
                }
                out.sort_unstable();
                out.dedup();
                return Ok(out);
            }
            Ireturn | Lreturn | Freturn | Dreturn | Areturn | Athrow => {
                self.pop(frame, i)?;
                return Ok(Vec::new());
            }
            Return => return Ok(Vec::new()),

            Getstatic(index) | Putstatic(index) | Getfield(index) | Putfield(index) => {
                let member = self
                    .input
                    .pool
                    .member_at(*index)
                    .ok_or_else(|| LowerError::codegen(format!("constant {} is not a field reference", index)))?;
                match instr {
                    Getstatic(_) => frame.stack.push(VType::from_descriptor(&member.descriptor)),
                    Putstatic(_) => {
                        self.pop(frame, i)?;
                    }
                    Getfield(_) => {
                        self.pop(frame, i)?;
                        frame.stack.push(VType::from_descriptor(&member.descriptor));
                    }
                    _ => self.pop_n(frame, 2, i)?,
                }
            }
            Invokevirtual(index) | Invokespecial(index) => self.invoke(frame, *index, true, i)?,
            Invokestatic(index) => self.invoke(frame, *index, false, i)?,
            Invokeinterface { index, .. } => self.invoke(frame, *index, true, i)?,

            New(_) => frame.stack.push(VType::Uninitialized(self.input.code.addresses[i])),
            Newarray(atype) => {
                self.pop(frame, i)?;
                let descriptor = match atype {
                    4 => "[Z",
                    5 => "[C",
                    6 => "[F",
                    7 => "[D",
                    8 => "[B",
                    9 => "[S",
                    10 => "[I",
                    11 => "[J",
                    other => {
                        return Err(LowerError::codegen(format!("unknown newarray type {}", other)));
                    }
                };
                frame.stack.push(VType::object(descriptor));
            }
            Anewarray(index) => {
                self.pop(frame, i)?;
                let component = self.class_at(*index)?;
                frame.stack.push(VType::Object(array_of(&component)));
            }
            Multianewarray { index, dimensions } => {
                self.pop_n(frame, usize::from(*dimensions), i)?;
                frame.stack.push(VType::Object(self.class_at(*index)?));
            }
            Arraylength | Instanceof(_) => {
                self.pop(frame, i)?;
                frame.stack.push(VType::Integer);
            }
            Checkcast(index) => {
                self.pop(frame, i)?;
                frame.stack.push(VType::Object(self.class_at(*index)?));
            }
            Monitorenter | Monitorexit => {
                self.pop(frame, i)?;
            }
            other => {
                return Err(LowerError::codegen(format!("no stack model for {:?}", other)));
            }
        }
        Ok(next)
    }
}

/// Array class name for a component class name.
fn array_of(component: &str) -> String {
    if component.starts_with('[') {
        format!("[{}", component)
    } else {
        format!("[L{};", component)
    }
}

/// Element type loaded by `aaload` from an array of this type.
fn element_of(array: &VType) -> VType {
    match array {
        VType::Object(name) => match name.strip_prefix('[') {
            Some(element) if element.starts_with('[') => VType::Object(element.to_string()),
            Some(element) => VType::from_descriptor(element),
            None => VType::object(OBJECT),
        },
        VType::Null => VType::Null,
        _ => VType::object(OBJECT),
    }
}

/// Slot access encoded by a load or store instruction.
fn local_access(instr: &Instruction) -> Option<(ValueKind, u16, bool)> {
    use Instruction::*;
    use ValueKind::*;
    Some(match instr {
        Iload0 => (Int, 0, false),
        Iload1 => (Int, 1, false),
        Iload2 => (Int, 2, false),
        Iload3 => (Int, 3, false),
        Iload(s) => (Int, u16::from(*s), false),
        IloadWide(s) => (Int, *s, false),
        Lload0 => (Long, 0, false),
        Lload1 => (Long, 1, false),
        Lload2 => (Long, 2, false),
        Lload3 => (Long, 3, false),
        Lload(s) => (Long, u16::from(*s), false),
        LloadWide(s) => (Long, *s, false),
        Fload0 => (Float, 0, false),
        Fload1 => (Float, 1, false),
        Fload2 => (Float, 2, false),
        Fload3 => (Float, 3, false),
        Fload(s) => (Float, u16::from(*s), false),
        FloadWide(s) => (Float, *s, false),
        Dload0 => (Double, 0, false),
        Dload1 => (Double, 1, false),
        Dload2 => (Double, 2, false),
        Dload3 => (Double, 3, false),
        Dload(s) => (Double, u16::from(*s), false),
        DloadWide(s) => (Double, *s, false),
        Aload0 => (Reference, 0, false),
        Aload1 => (Reference, 1, false),
        Aload2 => (Reference, 2, false),
        Aload3 => (Reference, 3, false),
        Aload(s) => (Reference, u16::from(*s), false),
        AloadWide(s) => (Reference, *s, false),
        Istore0 => (Int, 0, true),
        Istore1 => (Int, 1, true),
        Istore2 => (Int, 2, true),
        Istore3 => (Int, 3, true),
        Istore(s) => (Int, u16::from(*s), true),
        IstoreWide(s) => (Int, *s, true),
        Lstore0 => (Long, 0, true),
        Lstore1 => (Long, 1, true),
        Lstore2 => (Long, 2, true),
        Lstore3 => (Long, 3, true),
        Lstore(s) => (Long, u16::from(*s), true),
        LstoreWide(s) => (Long, *s, true),
        Fstore0 => (Float, 0, true),
        Fstore1 => (Float, 1, true),
        Fstore2 => (Float, 2, true),
        Fstore3 => (Float, 3, true),
        Fstore(s) => (Float, u16::from(*s), true),
        FstoreWide(s) => (Float, *s, true),
        Dstore0 => (Double, 0, true),
        Dstore1 => (Double, 1, true),
        Dstore2 => (Double, 2, true),
        Dstore3 => (Double, 3, true),
        Dstore(s) => (Double, u16::from(*s), true),
        DstoreWide(s) => (Double, *s, true),
        Astore0 => (Reference, 0, true),
        Astore1 => (Reference, 1, true),
        Astore2 => (Reference, 2, true),
        Astore3 => (Reference, 3, true),
        Astore(s) => (Reference, u16::from(*s), true),
        AstoreWide(s) => (Reference, *s, true),
        _ => return None,
    })
}
