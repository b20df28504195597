use std::sync::Arc;

use log::{debug, trace};

use crate::code_attribute::Instruction;
use crate::constant_info::ConstantPool;
use crate::error::{LowerError, Result};
use crate::model::{MethodDef, ObjectDef, StatementDef, TypeDef};

use super::codegen::{CodeBuffer, Label, ValueKind};
use super::context::{MethodContext, ScopeMark};
use super::descriptor::{
    class_entry_name, descriptor_size, erase, field_descriptor, method_descriptor, parse_method_descriptor,
};
use super::hierarchy::ClassHierarchy;
use super::stack_calc::{analyze, AnalysisInput};
use super::stackmap::VType;
use super::{GeneratedCode, WriterOptions};

/// Deferred work that every exit from a guarded region must run.
#[derive(Clone, Debug)]
pub(super) enum Cleanup {
    /// The body and the scope it was registered in; locals opened after
    /// `mark` are out of view while a copy is lowered.
    Finally { body: Arc<StatementDef>, mark: ScopeMark },
    MonitorExit { slot: u16 },
}

/// A try body, catch body or synchronized body whose exception-table
/// coverage must skip the finally copies emitted inside it.
#[derive(Debug)]
pub(super) struct ProtectedRegion {
    /// `cleanups.len()` when the region opened.
    pub(super) depth: usize,
    pub(super) gaps: Vec<(Label, Label)>,
}

/// The switch-expression arm whose `return` yields a value.
#[derive(Clone, Debug)]
pub(super) struct YieldTarget {
    pub(super) ty: TypeDef,
    pub(super) end: Label,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum InvokeKind {
    Virtual,
    Interface,
    Special,
    Static,
}

/// Lowers one method body. Expression, condition, switch and statement
/// lowering live in sibling modules as further `impl` blocks.
pub(super) struct MethodCompiler<'a> {
    pub(super) object: Option<&'a ObjectDef>,
    pub(super) method: &'a MethodDef,
    pub(super) pool: &'a mut ConstantPool,
    pub(super) hierarchy: &'a ClassHierarchy,
    pub(super) code: CodeBuffer,
    pub(super) ctx: MethodContext,
    pub(super) cleanups: Vec<Cleanup>,
    pub(super) regions: Vec<ProtectedRegion>,
    pub(super) yields: Vec<YieldTarget>,
    pub(super) return_type: TypeDef,
    /// An `invokestatic`/`invokespecial` went through an `InterfaceMethodref`.
    pub(super) interface_calls: bool,
}

impl<'a> MethodCompiler<'a> {
    pub(super) fn new(
        object: Option<&'a ObjectDef>,
        method: &'a MethodDef,
        pool: &'a mut ConstantPool,
        hierarchy: &'a ClassHierarchy,
    ) -> Result<Self> {
        let mut code = CodeBuffer::new();
        let start = code.here();
        let return_type = erase(&method.return_type, object)?;
        Ok(MethodCompiler {
            object,
            method,
            pool,
            hierarchy,
            code,
            ctx: MethodContext::new(start),
            cleanups: Vec::new(),
            regions: Vec::new(),
            yields: Vec::new(),
            return_type,
            interface_calls: false,
        })
    }

    pub(super) fn erase(&self, ty: &TypeDef) -> Result<TypeDef> {
        erase(ty, self.object)
    }

    pub(super) fn descriptor(&self, ty: &TypeDef) -> Result<String> {
        field_descriptor(ty, self.object)
    }

    pub(super) fn vtype(&self, ty: &TypeDef) -> Result<VType> {
        Ok(VType::from_descriptor(&self.descriptor(ty)?))
    }

    pub(super) fn class_index(&mut self, ty: &TypeDef) -> Result<u16> {
        let name = class_entry_name(ty, self.object)?;
        self.pool.class(&name)
    }

    pub(super) fn this_type(&self) -> Result<TypeDef> {
        self.object
            .map(|o| o.as_type())
            .ok_or_else(|| LowerError::type_contract("`this` used without an enclosing object"))
    }

    pub(super) fn is_interface(&self, ty: &TypeDef) -> bool {
        ty.is_interface()
            || ty
                .class_name()
                .is_some_and(|name| self.hierarchy.is_interface(&name.replace('.', "/")))
    }

    /// Emit a call. `owner` is an erased class or array type.
    pub(super) fn invoke(
        &mut self,
        kind: InvokeKind,
        owner: &TypeDef,
        name: &str,
        parameters: &[TypeDef],
        return_type: &TypeDef,
    ) -> Result<()> {
        let owner_name = class_entry_name(owner, self.object)?;
        let descriptor = method_descriptor(parameters, return_type, self.object)?;
        let interface = match kind {
            InvokeKind::Interface => true,
            InvokeKind::Virtual => false,
            InvokeKind::Special | InvokeKind::Static => self.is_interface(owner),
        };
        self.invoke_raw(kind, &owner_name, interface, name, &descriptor)
    }

    /// Emit a call against an internal owner name and a raw descriptor.
    pub(super) fn invoke_raw(
        &mut self,
        kind: InvokeKind,
        owner: &str,
        interface: bool,
        name: &str,
        descriptor: &str,
    ) -> Result<()> {
        let index = self.pool.method_ref(owner, name, descriptor, interface)?;
        match kind {
            InvokeKind::Virtual => self.code.emit(Instruction::Invokevirtual(index)),
            InvokeKind::Special => self.code.emit(Instruction::Invokespecial(index)),
            InvokeKind::Static => self.code.emit(Instruction::Invokestatic(index)),
            InvokeKind::Interface => {
                let (params, _) = parse_method_descriptor(descriptor)
                    .ok_or_else(|| LowerError::codegen(format!("bad method descriptor {}", descriptor)))?;
                let words: u16 = params.iter().map(|p| descriptor_size(p)).sum();
                let count = u8::try_from(words + 1)
                    .map_err(|_| LowerError::codegen(format!("too many arguments for {}", name)))?;
                self.code.emit(Instruction::Invokeinterface {
                    index,
                    count,
                    filler: 0,
                });
            }
        }
        if interface && matches!(kind, InvokeKind::Static | InvokeKind::Special) && self.code.is_reachable() {
            self.interface_calls = true;
        }
        Ok(())
    }

    pub(super) fn field_instruction(
        &mut self,
        make: fn(u16) -> Instruction,
        owner: &TypeDef,
        name: &str,
        ty: &TypeDef,
    ) -> Result<()> {
        let owner_name = class_entry_name(owner, self.object)?;
        let descriptor = self.descriptor(ty)?;
        let index = self.pool.field_ref(&owner_name, name, &descriptor)?;
        self.code.emit(make(index));
        Ok(())
    }

    /// Lower the whole body and run the stack analysis over the result.
    pub(super) fn compile(mut self, options: &WriterOptions) -> Result<GeneratedCode> {
        let method = self.method;
        let object = self.object;
        let is_constructor = method.is_constructor();

        if !method.is_static() {
            let ty = match object {
                Some(o) => o.as_type(),
                None => TypeDef::object(),
            };
            let descriptor = self.descriptor(&ty)?;
            self.ctx.declare_this(ty, descriptor)?;
        }
        for parameter in &method.parameters {
            let ty = self.erase(&parameter.ty)?;
            let descriptor = self.descriptor(&ty)?;
            self.ctx.declare_parameter(&parameter.name, ty, descriptor)?;
        }

        if !self.return_type.is_void() && !method.statements.last().is_some_and(|s| s.always_exits()) {
            return Err(LowerError::type_contract(format!(
                "method {}{} does not return a value on every path",
                object.map(|o| format!("{}.", o.name())).unwrap_or_default(),
                method.name
            )));
        }

        for statement in &method.statements {
            self.gen_stmt(statement)?;
        }

        if self.code.is_reachable() {
            if !self.return_type.is_void() {
                return Err(LowerError::type_contract(format!(
                    "end of non-void method {} is reachable",
                    method.name
                )));
            }
            self.code.emit(Instruction::Return);
        }

        let MethodCompiler {
            pool,
            hierarchy,
            code,
            ctx,
            interface_calls,
            ..
        } = self;

        let resolved = code.finish()?;
        let mut entry_locals = ctx.slot_types()[..ctx.entry_slots()].to_vec();
        if is_constructor {
            if let Some(first) = entry_locals.first_mut() {
                *first = VType::UninitializedThis;
            }
        }
        let this_class = match object {
            Some(o) => Some(class_entry_name(&o.as_type(), object)?),
            None => None,
        };
        let analysis = analyze(&AnalysisInput {
            code: &resolved,
            pool: &*pool,
            hierarchy,
            slot_types: ctx.slot_types(),
            entry_locals: entry_locals.clone(),
            this_class,
            strict: options.verify_stack,
        })?;

        let local_variables = if options.local_variable_table {
            ctx.local_variable_items(&resolved, pool)?
        } else {
            Vec::new()
        };

        let descriptor = method_descriptor(&method.parameter_types(), &method.return_type, object)?;
        debug!(
            "lowered {}{} ({} bytes, max_stack {}, max_locals {})",
            method.name,
            descriptor,
            resolved.code_length,
            analysis.max_stack,
            ctx.max_locals()
        );

        Ok(GeneratedCode {
            instructions: resolved.instructions,
            code_length: resolved.code_length,
            max_stack: analysis.max_stack,
            max_locals: ctx.max_locals(),
            exception_table: resolved.exception_table,
            frames: analysis.frames,
            entry_locals,
            local_variables,
            interface_calls,
        })
    }

    /// Run every pending cleanup, innermost first. The cleanup being run is
    /// not active while its own code is emitted.
    pub(super) fn run_cleanups(&mut self) -> Result<()> {
        for i in (0..self.cleanups.len()).rev() {
            let rest = self.cleanups.split_off(i);
            let result = self.run_cleanup(i, &rest[0]);
            self.cleanups.extend(rest);
            result?;
        }
        Ok(())
    }

    fn run_cleanup(&mut self, index: usize, cleanup: &Cleanup) -> Result<()> {
        match cleanup {
            Cleanup::MonitorExit { slot } => {
                trace!("inline monitor release of slot {}", slot);
                self.code.emit_load(ValueKind::Reference, *slot);
                self.code.emit(Instruction::Monitorexit);
            }
            Cleanup::Finally { body, mark } => {
                trace!("inline finally copy at cleanup depth {}", index);
                let start = self.code.here();
                let hidden = self.ctx.hide_since(*mark);
                let lowered = self.gen_scoped(body);
                self.ctx.restore(hidden);
                lowered?;
                let end = self.code.here();
                for region in self.regions.iter_mut().filter(|r| r.depth > index) {
                    region.gaps.push((start, end));
                }
            }
        }
        Ok(())
    }

    /// The reload and return that follow inline cleanups. Every region a
    /// cleanup belongs to stops short of them.
    pub(super) fn emit_released_return(&mut self, value: Option<(ValueKind, u16)>) {
        let start = self.code.here();
        if let Some((kind, slot)) = value {
            self.code.emit_load(kind, slot);
        }
        self.code.emit_return(value.map(|(kind, _)| kind));
        let end = self.code.here();
        for region in self.regions.iter_mut().filter(|r| r.depth > 0) {
            region.gaps.push((start, end));
        }
    }

    pub(super) fn open_region(&mut self) -> Label {
        let start = self.code.here();
        self.regions.push(ProtectedRegion {
            depth: self.cleanups.len(),
            gaps: Vec::new(),
        });
        start
    }

    /// Close the innermost region, returning its covered ranges.
    pub(super) fn close_region(&mut self, start: Label) -> Vec<(Label, Label)> {
        let end = self.code.here();
        let mut gaps = self.regions.pop().map(|r| r.gaps).unwrap_or_default();
        // gaps nest when a finally copy itself returns
        gaps.sort_by_key(|(gap_start, _)| self.code.position(*gap_start));
        let mut ranges = Vec::with_capacity(gaps.len() + 1);
        let mut from = start;
        for (gap_start, gap_end) in gaps {
            if self.code.position(gap_end) <= self.code.position(from) {
                continue;
            }
            ranges.push((from, gap_start));
            from = gap_end;
        }
        ranges.push((from, end));
        ranges
    }
}
