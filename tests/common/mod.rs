//! Shared helpers for the integration tests: a small interpreter for the
//! int/boolean/reference subset of the instruction set, and builders for
//! throwaway classes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::process::Command;

use classgen::code_attribute::{instruction_addresses, Instruction};
use classgen::compile::{java_string_hash, lower_method, GeneratedCode, WriterOptions};
use classgen::constant_info::{ConstantInfo, ConstantPool, MemberRef};
use classgen::model::{ClassDef, MethodDef, Modifier, ObjectDef, StatementDef, TypeDef};
use classgen::LowerError;

/// Owner of the static probe methods tests call to observe execution.
pub const PROBE: &str = "demo.Probe";

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Null,
    Str(String),
    Object { class: String, id: usize },
    /// Second word of a long, or an unassigned slot.
    Top,
}

impl Value {
    pub fn int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            other => panic!("expected an int, got {:?}", other),
        }
    }

    fn class(&self) -> &str {
        match self {
            Value::Str(_) => "java/lang/String",
            Value::Object { class, .. } => class,
            other => panic!("no class for {:?}", other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Returned(Option<Value>),
    Threw(Value),
}

#[derive(Debug)]
pub struct Trace {
    pub outcome: Outcome,
    /// `Owner.name` of every call handed to the host, in order.
    pub calls: Vec<String>,
    pub monitor_enters: u32,
    pub monitor_exits: u32,
    pub max_depth: usize,
    pub steps: usize,
}

impl Trace {
    pub fn returned_int(&self) -> i32 {
        match &self.outcome {
            Outcome::Returned(Some(v)) => v.int(),
            other => panic!("expected an int return, got {:?}", other),
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

/// Result of a call the interpreter does not model itself.
pub type HostResult = Result<Option<Value>, Value>;

const STEP_LIMIT: usize = 100_000;

/// Exception classes a catch of the key type also catches.
fn catches(catch: &str, thrown: &str) -> bool {
    catch == thrown
        || catch == "java/lang/Throwable"
        || (catch == "java/lang/Exception" && thrown != "java/lang/Error")
        || (catch == "java/lang/RuntimeException" && thrown.ends_with("Exception") && thrown != "java/lang/Exception")
}

/// Number of parameters in a method descriptor; each is one interpreter value.
fn argument_count(descriptor: &str) -> usize {
    let params = &descriptor[1..descriptor.find(')').expect("method descriptor")];
    let mut count = 0;
    let mut chars = params.chars();
    while let Some(mut c) = chars.next() {
        while c == '[' {
            c = chars.next().expect("array component");
        }
        if c == 'L' {
            chars.by_ref().find(|c| *c == ';');
        }
        count += 1;
    }
    count
}

fn returns_value(descriptor: &str) -> bool {
    !descriptor.ends_with(")V")
}

/// Run `code` with `args` in the parameter slots.
///
/// `host` answers every invocation except `String.hashCode` and
/// `String.equals`, which are built in.
pub fn run(
    code: &GeneratedCode,
    pool: &ConstantPool,
    args: Vec<Value>,
    host: &mut dyn FnMut(&MemberRef, &[Value]) -> HostResult,
) -> Trace {
    let (addresses, _) = instruction_addresses(&code.instructions);
    let index_of: HashMap<u32, usize> = addresses.iter().enumerate().map(|(i, a)| (*a, i)).collect();
    let target = |pc: usize, offset: i32| -> usize {
        let address = (addresses[pc] as i64 + offset as i64) as u32;
        *index_of.get(&address).unwrap_or_else(|| panic!("branch into the middle of an instruction at {}", address))
    };

    let mut locals = vec![Value::Top; code.max_locals as usize];
    let mut slot = 0;
    for arg in args {
        let wide = matches!(arg, Value::Long(_));
        locals[slot] = arg;
        slot += if wide { 2 } else { 1 };
    }

    let mut trace = Trace {
        outcome: Outcome::Returned(None),
        calls: Vec::new(),
        monitor_enters: 0,
        monitor_exits: 0,
        max_depth: 0,
        steps: 0,
    };
    let mut stack: Vec<Value> = Vec::new();
    let mut next_id = 0;
    let mut pc = 0;

    loop {
        trace.steps += 1;
        assert!(trace.steps < STEP_LIMIT, "step limit exceeded");
        trace.max_depth = trace.max_depth.max(stack.iter().map(|v| if matches!(v, Value::Long(_)) { 2 } else { 1 }).sum());
        let instr = &code.instructions[pc];
        let mut next = pc + 1;
        let mut thrown: Option<Value> = None;

        macro_rules! pop {
            () => {
                stack.pop().expect("stack underflow")
            };
        }
        macro_rules! pop_int {
            () => {
                pop!().int()
            };
        }
        macro_rules! branch {
            ($cond:expr, $offset:expr) => {
                if $cond {
                    next = target(pc, *$offset as i32);
                }
            };
        }

        use Instruction::*;
        match instr {
            Nop => {}
            Aconstnull => stack.push(Value::Null),
            Iconstm1 => stack.push(Value::Int(-1)),
            Iconst0 => stack.push(Value::Int(0)),
            Iconst1 => stack.push(Value::Int(1)),
            Iconst2 => stack.push(Value::Int(2)),
            Iconst3 => stack.push(Value::Int(3)),
            Iconst4 => stack.push(Value::Int(4)),
            Iconst5 => stack.push(Value::Int(5)),
            Lconst0 => stack.push(Value::Long(0)),
            Lconst1 => stack.push(Value::Long(1)),
            Bipush(v) => stack.push(Value::Int(*v as i32)),
            Sipush(v) => stack.push(Value::Int(*v as i32)),
            Ldc(index) => stack.push(constant(pool, *index as u16)),
            LdcW(index) | Ldc2W(index) => stack.push(constant(pool, *index)),
            Iload(s) | Lload(s) | Aload(s) => stack.push(locals[*s as usize].clone()),
            IloadWide(s) | LloadWide(s) | AloadWide(s) => stack.push(locals[*s as usize].clone()),
            Iload0 | Lload0 | Aload0 => stack.push(locals[0].clone()),
            Iload1 | Lload1 | Aload1 => stack.push(locals[1].clone()),
            Iload2 | Lload2 | Aload2 => stack.push(locals[2].clone()),
            Iload3 | Lload3 | Aload3 => stack.push(locals[3].clone()),
            Istore(s) | Lstore(s) | Astore(s) => locals[*s as usize] = pop!(),
            IstoreWide(s) | LstoreWide(s) | AstoreWide(s) => locals[*s as usize] = pop!(),
            Istore0 | Lstore0 | Astore0 => locals[0] = pop!(),
            Istore1 | Lstore1 | Astore1 => locals[1] = pop!(),
            Istore2 | Lstore2 | Astore2 => locals[2] = pop!(),
            Istore3 | Lstore3 | Astore3 => locals[3] = pop!(),
            Pop => {
                pop!();
            }
            Dup => {
                let top = stack.last().expect("stack underflow").clone();
                stack.push(top);
            }
            Swap => {
                let a = pop!();
                let b = pop!();
                stack.push(a);
                stack.push(b);
            }
            Iadd | Isub | Imul | Idiv | Irem | Iand | Ior | Ixor | Ishl | Ishr | Iushr => {
                let b = pop_int!();
                let a = pop_int!();
                let v = match instr {
                    Iadd => a.wrapping_add(b),
                    Isub => a.wrapping_sub(b),
                    Imul => a.wrapping_mul(b),
                    Idiv => a.wrapping_div(b),
                    Irem => a.wrapping_rem(b),
                    Iand => a & b,
                    Ior => a | b,
                    Ixor => a ^ b,
                    Ishl => a.wrapping_shl(b as u32 & 31),
                    Ishr => a.wrapping_shr(b as u32 & 31),
                    _ => ((a as u32) >> (b as u32 & 31)) as i32,
                };
                stack.push(Value::Int(v));
            }
            Ineg => {
                let a = pop_int!();
                stack.push(Value::Int(a.wrapping_neg()));
            }
            Iinc { index, value } => {
                let v = locals[*index as usize].int();
                locals[*index as usize] = Value::Int(v.wrapping_add(*value as i32));
            }
            I2b => {
                let a = pop_int!();
                stack.push(Value::Int(a as i8 as i32));
            }
            I2c => {
                let a = pop_int!();
                stack.push(Value::Int(a as u16 as i32));
            }
            I2s => {
                let a = pop_int!();
                stack.push(Value::Int(a as i16 as i32));
            }
            Ifeq(o) => branch!(pop_int!() == 0, o),
            Ifne(o) => branch!(pop_int!() != 0, o),
            Iflt(o) => branch!(pop_int!() < 0, o),
            Ifge(o) => branch!(pop_int!() >= 0, o),
            Ifgt(o) => branch!(pop_int!() > 0, o),
            Ifle(o) => branch!(pop_int!() <= 0, o),
            IfIcmpeq(o) | IfIcmpne(o) | IfIcmplt(o) | IfIcmpge(o) | IfIcmpgt(o) | IfIcmple(o) => {
                let b = pop_int!();
                let a = pop_int!();
                let taken = match instr {
                    IfIcmpeq(_) => a == b,
                    IfIcmpne(_) => a != b,
                    IfIcmplt(_) => a < b,
                    IfIcmpge(_) => a >= b,
                    IfIcmpgt(_) => a > b,
                    _ => a <= b,
                };
                branch!(taken, o);
            }
            IfAcmpeq(o) | IfAcmpne(o) => {
                let b = pop!();
                let a = pop!();
                let same = a == b;
                branch!(if matches!(instr, IfAcmpeq(_)) { same } else { !same }, o);
            }
            Ifnull(o) => branch!(pop!() == Value::Null, o),
            Ifnonnull(o) => branch!(pop!() != Value::Null, o),
            Goto(o) => next = target(pc, *o as i32),
            Tableswitch {
                default,
                low,
                high,
                offsets,
            } => {
                let key = pop_int!();
                let offset = if key >= *low && key <= *high {
                    offsets[(key - low) as usize]
                } else {
                    *default
                };
                next = target(pc, offset);
            }
            Lookupswitch { default, pairs, .. } => {
                let key = pop_int!();
                let offset = pairs.iter().find(|(k, _)| *k == key).map_or(*default, |(_, o)| *o);
                next = target(pc, offset);
            }
            Ireturn | Lreturn | Areturn => {
                trace.outcome = Outcome::Returned(Some(pop!()));
                return trace;
            }
            Return => {
                trace.outcome = Outcome::Returned(None);
                return trace;
            }
            Athrow => {
                let value = pop!();
                assert_ne!(value, Value::Null, "athrow of null");
                thrown = Some(value);
            }
            New(index) => {
                let class = pool.class_name_at(*index).expect("class constant");
                next_id += 1;
                stack.push(Value::Object { class, id: next_id });
            }
            Checkcast(_) => {}
            Instanceof(index) => {
                let class = pool.class_name_at(*index).expect("class constant");
                let value = pop!();
                let hit = value != Value::Null && value.class() == class;
                stack.push(Value::Int(hit as i32));
            }
            Monitorenter => {
                assert_ne!(pop!(), Value::Null, "monitorenter on null");
                trace.monitor_enters += 1;
            }
            Monitorexit => {
                pop!();
                trace.monitor_exits += 1;
            }
            Getstatic(index) => {
                let member = pool.member_at(*index).expect("field reference");
                trace.calls.push(format!("{}.{}", member.owner.replace('/', "."), member.name));
                match host(&member, &[]) {
                    Ok(Some(v)) => stack.push(v),
                    Ok(None) => panic!("host returned nothing for field {}", member.name),
                    Err(e) => thrown = Some(e),
                }
            }
            Invokevirtual(index) | Invokespecial(index) | Invokestatic(index) | Invokeinterface { index, .. } => {
                let member = pool.member_at(*index).expect("method reference");
                let mut words = argument_count(&member.descriptor);
                if !matches!(instr, Invokestatic(_)) {
                    words += 1;
                }
                let args = stack.split_off(stack.len() - words);
                let result = match (member.owner.as_str(), member.name.as_str(), args.as_slice()) {
                    ("java/lang/String", "hashCode", [Value::Str(s)]) => Ok(Some(Value::Int(java_string_hash(s)))),
                    ("java/lang/String", "equals", [Value::Str(a), b]) => {
                        Ok(Some(Value::Int((Value::Str(a.clone()) == *b) as i32)))
                    }
                    (_, "<init>", _) => Ok(None),
                    _ => {
                        trace.calls.push(format!("{}.{}", member.owner.replace('/', "."), member.name));
                        host(&member, &args)
                    }
                };
                match result {
                    Ok(Some(v)) => {
                        assert!(returns_value(&member.descriptor), "void call {} produced a value", member.name);
                        stack.push(v);
                    }
                    Ok(None) => {
                        assert!(!returns_value(&member.descriptor), "call {} produced no value", member.name);
                    }
                    Err(e) => thrown = Some(e),
                }
            }
            other => panic!("instruction outside the interpreted subset: {:?}", other),
        }

        if let Some(exception) = thrown {
            let address = addresses[pc];
            let handler = code.exception_table.iter().find(|e| {
                u32::from(e.start_pc) <= address
                    && address < u32::from(e.end_pc)
                    && (e.catch_type == 0
                        || catches(&pool.class_name_at(e.catch_type).expect("catch class"), exception.class()))
            });
            match handler {
                Some(entry) => {
                    stack.clear();
                    stack.push(exception);
                    next = index_of[&u32::from(entry.handler_pc)];
                }
                None => {
                    trace.outcome = Outcome::Threw(exception);
                    return trace;
                }
            }
        }
        pc = next;
    }
}

fn constant(pool: &ConstantPool, index: u16) -> Value {
    match pool.get(index).expect("constant") {
        ConstantInfo::Integer(c) => Value::Int(c.value),
        ConstantInfo::Long(c) => Value::Long(c.value),
        ConstantInfo::String(s) => Value::Str(pool.utf8_at(s.string_index).expect("string text")),
        other => panic!("ldc of {:?} is outside the interpreted subset", other),
    }
}

/// A host for bodies that only call `demo.Probe` hooks: `hit()V` and
/// friends return nothing, `fail()V` throws `java/lang/IllegalStateException`.
pub fn probe_host(member: &MemberRef, _args: &[Value]) -> HostResult {
    match member.name.as_str() {
        "fail" => Err(Value::Object {
            class: "java/lang/IllegalStateException".to_string(),
            id: usize::MAX,
        }),
        _ if returns_value(&member.descriptor) => Ok(Some(Value::Int(0))),
        _ => Ok(None),
    }
}

/// `demo.Probe.<name>()` as a statement.
pub fn probe(name: &str) -> StatementDef {
    use classgen::model::{ClassTypeDef, ExpressionDef, MethodSig};
    ExpressionDef::invoke_static(ClassTypeDef::new(PROBE), MethodSig::new(name, Vec::new(), TypeDef::VOID), Vec::new())
        .as_statement()
}

/// `public static` method with int parameters named `a`, `b`, ...
pub fn static_method(name: &str, params: &[(&str, TypeDef)], ret: TypeDef, statements: Vec<StatementDef>) -> MethodDef {
    let mut method = MethodDef::new(name, ret)
        .with_modifiers(&[Modifier::Public, Modifier::Static])
        .with_statements(statements);
    for (param, ty) in params {
        method = method.with_parameter(*param, ty.clone());
    }
    method
}

/// Lower `method` as a member of a fresh `demo.Subject` class.
pub fn lower(method: MethodDef) -> Result<(GeneratedCode, ConstantPool), LowerError> {
    let mut class = ClassDef::new("demo.Subject");
    class.modifiers.insert(Modifier::Public);
    lower_in(class, method)
}

/// Lower `method` after adding it to `class`, next to its other members.
pub fn lower_in(mut class: ClassDef, method: MethodDef) -> Result<(GeneratedCode, ConstantPool), LowerError> {
    class.methods.push(method.clone());
    let object = ObjectDef::Class(class);
    let mut pool = ConstantPool::new();
    let code = lower_method(Some(&object), &method, &mut pool, &WriterOptions::default())?;
    Ok((code, pool))
}

pub fn java_available() -> bool {
    Command::new("java")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
