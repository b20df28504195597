use std::collections::HashMap;

use crate::attribute_info::LocalVariableTableItem;
use crate::constant_info::ConstantPool;
use crate::error::{LowerError, Result};
use crate::model::TypeDef;

use super::codegen::{Label, ResolvedCode, ValueKind};
use super::stackmap::VType;

/// One slot allocation: a named local, a parameter, `this`, or a synthetic temporary.
#[derive(Clone, Debug)]
struct LocalBinding {
    name: Option<String>,
    /// Erased type.
    ty: TypeDef,
    descriptor: String,
    slot: u16,
    start: Label,
    /// Set when the enclosing scope ends; live bindings run to the end of the method.
    end: Option<Label>,
}

/// A resolved local read or write target.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotRef {
    pub slot: u16,
    pub ty: TypeDef,
}

impl SlotRef {
    pub fn kind(&self) -> ValueKind {
        ValueKind::of(&self.ty)
    }
}

/// Scope and catch depth at the point a finally body was registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeMark {
    scopes: usize,
    exceptions: usize,
}

/// Bindings taken out of view by [`MethodContext::hide_since`].
#[derive(Debug, Default)]
pub struct HiddenNames {
    names: Vec<(String, usize)>,
    exceptions: Vec<usize>,
}

/// Per-method slot allocator and name scopes.
///
/// Slots are handed out in order and never reused, so every slot has exactly
/// one declared verification type. Locals and parameters live in separate
/// namespaces; the caught exception is a stack so nested catch bodies shadow
/// and then restore the outer one.
#[derive(Debug)]
pub struct MethodContext {
    bindings: Vec<LocalBinding>,
    parameters: HashMap<String, usize>,
    live: HashMap<String, usize>,
    scopes: Vec<Vec<String>>,
    exceptions: Vec<usize>,
    this_binding: Option<usize>,
    slot_types: Vec<VType>,
    entry_slots: usize,
    method_start: Label,
}

impl MethodContext {
    pub fn new(method_start: Label) -> Self {
        MethodContext {
            bindings: Vec::new(),
            parameters: HashMap::new(),
            live: HashMap::new(),
            scopes: vec![Vec::new()],
            exceptions: Vec::new(),
            this_binding: None,
            slot_types: Vec::new(),
            entry_slots: 0,
            method_start,
        }
    }

    fn allocate(&mut self, name: Option<String>, ty: TypeDef, descriptor: String, start: Label) -> Result<usize> {
        let slot = u16::try_from(self.slot_types.len())
            .map_err(|_| LowerError::codegen("more than 65535 local slots"))?;
        let vtype = VType::from_descriptor(&descriptor);
        if vtype.is_wide() {
            self.slot_types.push(vtype);
            self.slot_types.push(VType::Top);
        } else {
            self.slot_types.push(vtype);
        }
        if self.slot_types.len() > usize::from(u16::MAX) {
            return Err(LowerError::codegen("more than 65535 local slots"));
        }
        self.bindings.push(LocalBinding {
            name,
            ty,
            descriptor,
            slot,
            start,
            end: None,
        });
        Ok(self.bindings.len() - 1)
    }

    /// Slot 0 of an instance method.
    pub fn declare_this(&mut self, ty: TypeDef, descriptor: String) -> Result<u16> {
        let idx = self.allocate(Some("this".to_string()), ty, descriptor, self.method_start)?;
        self.this_binding = Some(idx);
        self.entry_slots = self.slot_types.len();
        Ok(self.bindings[idx].slot)
    }

    pub fn declare_parameter(&mut self, name: &str, ty: TypeDef, descriptor: String) -> Result<u16> {
        if self.parameters.contains_key(name) {
            return Err(LowerError::type_contract(format!("duplicate parameter `{}`", name)));
        }
        let idx = self.allocate(Some(name.to_string()), ty, descriptor, self.method_start)?;
        self.parameters.insert(name.to_string(), idx);
        self.entry_slots = self.slot_types.len();
        Ok(self.bindings[idx].slot)
    }

    /// Bind a new named local in the innermost scope, starting at `start`.
    pub fn define_local(&mut self, name: &str, ty: TypeDef, descriptor: String, start: Label) -> Result<u16> {
        if self.live.contains_key(name) {
            return Err(LowerError::type_contract(format!(
                "local `{}` is already defined in this scope",
                name
            )));
        }
        let idx = self.allocate(Some(name.to_string()), ty, descriptor, start)?;
        self.live.insert(name.to_string(), idx);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_string());
        }
        Ok(self.bindings[idx].slot)
    }

    /// A slot that never appears in the local variable table.
    pub fn allocate_temp(&mut self, ty: TypeDef, descriptor: String, start: Label) -> Result<u16> {
        let idx = self.allocate(None, ty, descriptor, start)?;
        Ok(self.bindings[idx].slot)
    }

    fn slot_ref(&self, idx: usize) -> SlotRef {
        let b = &self.bindings[idx];
        SlotRef {
            slot: b.slot,
            ty: b.ty.clone(),
        }
    }

    pub fn local(&self, name: &str) -> Option<SlotRef> {
        self.live.get(name).map(|&idx| self.slot_ref(idx))
    }

    pub fn parameter(&self, name: &str) -> Option<SlotRef> {
        self.parameters.get(name).map(|&idx| self.slot_ref(idx))
    }

    pub fn this(&self) -> Option<SlotRef> {
        self.this_binding.map(|idx| self.slot_ref(idx))
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Retire the names defined since the matching [`enter_scope`](Self::enter_scope).
    pub fn exit_scope(&mut self, end: Label) {
        let Some(names) = self.scopes.pop() else {
            return;
        };
        for name in names {
            if let Some(idx) = self.live.remove(&name) {
                self.bindings[idx].end = Some(end);
            }
        }
    }

    pub fn mark(&self) -> ScopeMark {
        ScopeMark {
            scopes: self.scopes.len(),
            exceptions: self.exceptions.len(),
        }
    }

    /// Hide every name and caught exception bound since `mark`. Slots stay
    /// allocated; only lookups are affected until [`restore`](Self::restore).
    pub fn hide_since(&mut self, mark: ScopeMark) -> HiddenNames {
        let mut names = Vec::new();
        let from = mark.scopes.min(self.scopes.len());
        for scope in &self.scopes[from..] {
            for name in scope {
                if let Some(idx) = self.live.remove(name) {
                    names.push((name.clone(), idx));
                }
            }
        }
        let from = mark.exceptions.min(self.exceptions.len());
        let exceptions = self.exceptions.split_off(from);
        HiddenNames { names, exceptions }
    }

    pub fn restore(&mut self, hidden: HiddenNames) {
        for (name, idx) in hidden.names {
            self.live.insert(name, idx);
        }
        self.exceptions.extend(hidden.exceptions);
    }

    /// Bind the caught exception of a catch body, shadowing any outer one.
    pub fn push_exception(&mut self, ty: TypeDef, descriptor: String, start: Label) -> Result<u16> {
        let idx = self.allocate(None, ty, descriptor, start)?;
        self.exceptions.push(idx);
        Ok(self.bindings[idx].slot)
    }

    pub fn pop_exception(&mut self) {
        self.exceptions.pop();
    }

    pub fn current_exception(&self) -> Option<SlotRef> {
        self.exceptions.last().map(|&idx| self.slot_ref(idx))
    }

    pub fn max_locals(&self) -> u16 {
        self.slot_types.len() as u16
    }

    /// Declared verification type of every slot.
    pub fn slot_types(&self) -> &[VType] {
        &self.slot_types
    }

    /// Slots filled on method entry: `this` and the parameters.
    pub fn entry_slots(&self) -> usize {
        self.entry_slots
    }

    /// `LocalVariableTable` rows for named bindings with a non-empty range.
    pub fn local_variable_items(
        &self,
        code: &ResolvedCode,
        pool: &mut ConstantPool,
    ) -> Result<Vec<LocalVariableTableItem>> {
        let mut items = Vec::new();
        for binding in &self.bindings {
            let Some(name) = &binding.name else {
                continue;
            };
            let start = code.label_address(binding.start).unwrap_or(0);
            let end = binding
                .end
                .and_then(|l| code.label_address(l))
                .unwrap_or(code.code_length);
            if end <= start {
                continue;
            }
            items.push(LocalVariableTableItem {
                start_pc: start as u16,
                length: (end - start) as u16,
                name_index: pool.utf8(name)?,
                descriptor_index: pool.utf8(&binding.descriptor)?,
                index: binding.slot,
            });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_attribute::Instruction;
    use crate::compile::codegen::CodeBuffer;

    #[test]
    fn wide_values_take_two_slots() {
        let mut code = CodeBuffer::new();
        let start = code.here();
        let mut ctx = MethodContext::new(start);
        assert_eq!(ctx.declare_this(TypeDef::object(), "Ljava/lang/Object;".into()).unwrap(), 0);
        assert_eq!(ctx.declare_parameter("a", TypeDef::LONG, "J".into()).unwrap(), 1);
        assert_eq!(ctx.declare_parameter("b", TypeDef::INT, "I".into()).unwrap(), 3);
        assert_eq!(ctx.entry_slots(), 4);
        assert_eq!(ctx.define_local("x", TypeDef::DOUBLE, "D".into(), start).unwrap(), 4);
        assert_eq!(ctx.max_locals(), 6);
        assert_eq!(ctx.slot_types()[1], VType::Long);
        assert_eq!(ctx.slot_types()[2], VType::Top);
    }

    #[test]
    fn names_can_be_rebound_after_their_scope_ends() {
        let mut code = CodeBuffer::new();
        let start = code.here();
        let mut ctx = MethodContext::new(start);
        ctx.enter_scope();
        let first = ctx.define_local("i", TypeDef::INT, "I".into(), start).unwrap();
        assert!(matches!(
            ctx.define_local("i", TypeDef::INT, "I".into(), start),
            Err(LowerError::TypeContractViolation { .. })
        ));
        let end = code.here();
        ctx.exit_scope(end);
        assert!(ctx.local("i").is_none());
        let second = ctx.define_local("i", TypeDef::INT, "I".into(), end).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn nested_exceptions_shadow_and_restore() {
        let mut code = CodeBuffer::new();
        let start = code.here();
        let mut ctx = MethodContext::new(start);
        let outer = ctx.push_exception(TypeDef::class("java.lang.Exception"), "Ljava/lang/Exception;".into(), start).unwrap();
        let inner = ctx.push_exception(TypeDef::class("java.lang.Error"), "Ljava/lang/Error;".into(), start).unwrap();
        assert_eq!(ctx.current_exception().unwrap().slot, inner);
        ctx.pop_exception();
        assert_eq!(ctx.current_exception().unwrap().slot, outer);
    }

    #[test]
    fn hidden_names_can_be_rebound_and_come_back() {
        let mut code = CodeBuffer::new();
        let start = code.here();
        let mut ctx = MethodContext::new(start);
        ctx.define_local("kept", TypeDef::INT, "I".into(), start).unwrap();
        let mark = ctx.mark();
        ctx.enter_scope();
        let outer = ctx.define_local("x", TypeDef::INT, "I".into(), start).unwrap();
        ctx.push_exception(TypeDef::class("java.lang.Error"), "Ljava/lang/Error;".into(), start).unwrap();

        let hidden = ctx.hide_since(mark);
        assert!(ctx.local("x").is_none());
        assert!(ctx.local("kept").is_some());
        assert!(ctx.current_exception().is_none());
        ctx.enter_scope();
        let copy = ctx.define_local("x", TypeDef::INT, "I".into(), start).unwrap();
        assert_ne!(copy, outer);
        let end = code.here();
        ctx.exit_scope(end);
        ctx.restore(hidden);

        assert_eq!(ctx.local("x").unwrap().slot, outer);
        assert!(ctx.current_exception().is_some());
    }

    #[test]
    fn table_rows_cover_scopes_and_skip_temporaries() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuffer::new();
        let start = code.here();
        let mut ctx = MethodContext::new(start);
        ctx.declare_parameter("p", TypeDef::INT, "I".into()).unwrap();
        code.emit(Instruction::Iconst0);
        let scoped_start = code.here();
        ctx.enter_scope();
        ctx.define_local("s", TypeDef::INT, "I".into(), scoped_start).unwrap();
        ctx.allocate_temp(TypeDef::INT, "I".into(), scoped_start).unwrap();
        code.emit(Instruction::Istore1);
        let scoped_end = code.here();
        ctx.exit_scope(scoped_end);
        code.emit(Instruction::Return);

        let resolved = code.finish().unwrap();
        let items = ctx.local_variable_items(&resolved, &mut pool).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].start_pc, items[0].length, items[0].index), (0, 3, 0));
        assert_eq!((items[1].start_pc, items[1].length, items[1].index), (1, 1, 1));
    }
}
