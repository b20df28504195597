use std::sync::Arc;

use log::trace;

use crate::code_attribute::Instruction;
use crate::error::{LowerError, Result};
use crate::model::{CatchDef, ExpressionDef, StatementDef, TryDef, TypeDef};

use super::codegen::{Label, ValueKind};
use super::context::ScopeMark;
use super::expr::{array_store, element_type};
use super::method::{Cleanup, MethodCompiler};

const THROWABLE: &str = "java.lang.Throwable";

impl<'a> MethodCompiler<'a> {
    /// Lower `statement` inside its own name scope.
    pub(super) fn gen_scoped(&mut self, statement: &StatementDef) -> Result<()> {
        self.ctx.enter_scope();
        let lowered = self.gen_stmt(statement);
        let end = self.code.here();
        self.ctx.exit_scope(end);
        lowered
    }

    pub(super) fn gen_stmt(&mut self, statement: &StatementDef) -> Result<()> {
        match statement {
            StatementDef::Expression(expr) => self.gen_discarded(expr),
            StatementDef::Multi(statements) => {
                for s in statements {
                    self.gen_stmt(s)?;
                }
                Ok(())
            }
            StatementDef::DefineAndAssign { name, ty, value } => {
                let ty = self.erase(ty)?;
                self.gen_expr(value, &ty)?;
                let start = self.code.new_label();
                let descriptor = self.descriptor(&ty)?;
                let kind = ValueKind::of(&ty);
                let slot = self.ctx.define_local(name, ty, descriptor, start)?;
                self.code.emit_store(kind, slot);
                self.code.bind_label(start);
                Ok(())
            }
            StatementDef::Assign { name, value, .. } => {
                let target = self
                    .ctx
                    .local(name)
                    .or_else(|| self.ctx.parameter(name))
                    .ok_or_else(|| LowerError::type_contract(format!("assignment to unknown variable `{}`", name)))?;
                self.gen_expr(value, &target.ty)?;
                self.code.emit_store(target.kind(), target.slot);
                Ok(())
            }
            StatementDef::PutField {
                instance,
                name,
                ty,
                value,
            } => {
                let owner = self.push_reference(instance)?;
                let ty = self.erase(ty)?;
                self.gen_expr(value, &ty)?;
                self.field_instruction(Instruction::Putfield, &owner, name, &ty)
            }
            StatementDef::PutStaticField { owner, name, ty, value } => {
                let owner = self.erase(owner)?;
                let ty = self.erase(ty)?;
                self.gen_expr(value, &ty)?;
                self.field_instruction(Instruction::Putstatic, &owner, name, &ty)
            }
            StatementDef::PutArrayElement { array, index, value } => {
                let array_ty = self.push_expr(array, None)?;
                let element = element_type(&array_ty)?;
                self.gen_expr(index, &TypeDef::INT)?;
                self.gen_expr(value, &element)?;
                self.code.emit(array_store(&element));
                Ok(())
            }
            StatementDef::Return(value) => self.gen_return(value.as_ref()),
            StatementDef::Throw(value) => {
                let ty = self.push_reference(value)?;
                if ty.is_array() {
                    return Err(LowerError::type_contract(format!("cannot throw a value of type {}", ty)));
                }
                self.cast(&ty, &TypeDef::class(THROWABLE))?;
                self.code.emit(Instruction::Athrow);
                Ok(())
            }
            StatementDef::If { condition, body } => {
                let end = self.code.new_label();
                self.jump_if(condition, false, end)?;
                self.gen_scoped(body)?;
                self.code.bind_label(end);
                Ok(())
            }
            StatementDef::IfElse {
                condition,
                body,
                otherwise,
            } => {
                let otherwise_label = self.code.new_label();
                let end = self.code.new_label();
                self.jump_if(condition, false, otherwise_label)?;
                self.gen_scoped(body)?;
                self.code.emit_goto(end)?;
                self.code.bind_label(otherwise_label);
                self.gen_scoped(otherwise)?;
                self.code.bind_label(end);
                Ok(())
            }
            StatementDef::While { condition, body } => {
                let top = self.code.here();
                let end = self.code.new_label();
                self.jump_if(condition, false, end)?;
                self.gen_scoped(body)?;
                self.code.emit_goto(top)?;
                self.code.bind_label(end);
                Ok(())
            }
            StatementDef::Switch { expr, cases, default } => self.gen_switch(expr, cases, default.as_ref()),
            StatementDef::Try(t) => self.gen_try(t),
            StatementDef::Synchronized { monitor, body } => self.gen_synchronized(monitor, body),
        }
    }

    fn gen_return(&mut self, value: Option<&ExpressionDef>) -> Result<()> {
        if let Some(target) = self.yields.last().cloned() {
            let value = value.ok_or_else(|| LowerError::type_contract("switch yield case returns without a value"))?;
            self.gen_expr(value, &target.ty)?;
            return self.code.emit_goto(target.end);
        }

        let return_type = self.return_type.clone();
        match value {
            None => {
                if !return_type.is_void() {
                    return Err(LowerError::type_contract(format!(
                        "missing return value in method {} returning {}",
                        self.method.name, return_type
                    )));
                }
                self.run_cleanups()?;
                self.emit_released_return(None);
            }
            Some(value) => {
                if return_type.is_void() {
                    return Err(LowerError::type_contract(format!(
                        "void method {} returns a value",
                        self.method.name
                    )));
                }
                self.gen_expr(value, &return_type)?;
                let kind = ValueKind::of(&return_type);
                if self.cleanups.is_empty() {
                    self.code.emit_return(Some(kind));
                } else {
                    let start = self.code.new_label();
                    let descriptor = self.descriptor(&return_type)?;
                    let slot = self.ctx.allocate_temp(return_type, descriptor, start)?;
                    self.code.emit_store(kind, slot);
                    self.code.bind_label(start);
                    self.run_cleanups()?;
                    self.emit_released_return(Some((kind, slot)));
                }
            }
        }
        Ok(())
    }

    fn reject_inside_yield(&self, what: &str) -> Result<()> {
        if self.yields.is_empty() {
            Ok(())
        } else {
            Err(LowerError::unsupported(format!("{} inside a switch yield case", what)))
        }
    }

    /// try/catch/finally. Finally bodies are copied onto every exit path and
    /// once more into a catch-all handler that rethrows.
    fn gen_try(&mut self, t: &TryDef) -> Result<()> {
        self.reject_inside_yield("try")?;
        let after = self.code.new_label();
        let mark = self.ctx.mark();

        if let Some(finally) = &t.finally {
            self.cleanups.push(Cleanup::Finally {
                body: finally.clone(),
                mark,
            });
        }
        let start = self.open_region();
        let body = self.gen_scoped(&t.body);
        let try_ranges = self.close_region(start);
        if t.finally.is_some() {
            self.cleanups.pop();
        }
        body?;
        if let Some(finally) = &t.finally {
            if self.code.is_reachable() {
                self.gen_scoped(finally)?;
            }
        }
        self.code.emit_goto(after)?;

        let mut guarded = try_ranges.clone();
        for catch in &t.catches {
            let handler = self.code.new_label();
            let exception = self.erase(&catch.exception)?;
            if exception.is_primitive() || exception.is_array() || exception.is_void() {
                return Err(LowerError::type_contract(format!("cannot catch {}", exception)));
            }
            let catch_type = self.class_index(&exception)?;
            for (from, to) in &try_ranges {
                self.code.add_exception_entry(*from, *to, handler, catch_type)?;
            }
            self.code.bind_label(handler);
            let ranges = self.gen_catch(catch, exception, t.finally.as_ref(), mark)?;
            guarded.extend(ranges);
            if let Some(finally) = &t.finally {
                if self.code.is_reachable() {
                    self.gen_scoped(finally)?;
                }
            }
            self.code.emit_goto(after)?;
        }

        if let Some(finally) = &t.finally {
            let handler = self.code.new_label();
            for (from, to) in &guarded {
                self.code.add_exception_entry(*from, *to, handler, 0)?;
            }
            self.code.bind_label(handler);
            trace!("finally handler covering {} ranges", guarded.len());
            let throwable = TypeDef::class(THROWABLE);
            let start = self.code.new_label();
            let descriptor = self.descriptor(&throwable)?;
            let slot = self.ctx.allocate_temp(throwable, descriptor, start)?;
            self.code.emit_store(ValueKind::Reference, slot);
            self.code.bind_label(start);
            self.gen_scoped(finally)?;
            self.code.emit_load(ValueKind::Reference, slot);
            self.code.emit(Instruction::Athrow);
        }

        self.code.bind_label(after);
        Ok(())
    }

    /// One catch body, entered with the exception on the stack. Returns the
    /// ranges a surrounding finally must guard.
    fn gen_catch(
        &mut self,
        catch: &CatchDef,
        exception: TypeDef,
        finally: Option<&Arc<StatementDef>>,
        mark: ScopeMark,
    ) -> Result<Vec<(Label, Label)>> {
        let start = self.code.new_label();
        let descriptor = self.descriptor(&exception)?;
        self.ctx.enter_scope();
        let slot = self.ctx.push_exception(exception, descriptor, start)?;
        self.code.emit_store(ValueKind::Reference, slot);
        self.code.bind_label(start);

        if let Some(finally) = finally {
            self.cleanups.push(Cleanup::Finally {
                body: finally.clone(),
                mark,
            });
        }
        let region = finally.map(|_| self.open_region());
        let lowered = self.gen_stmt(&catch.body);
        let ranges = region.map(|r| self.close_region(r)).unwrap_or_default();
        if finally.is_some() {
            self.cleanups.pop();
        }
        self.ctx.pop_exception();
        let end = self.code.here();
        self.ctx.exit_scope(end);
        lowered?;
        Ok(ranges)
    }

    /// `monitorenter` on a spilled reference, with a catch-all handler that
    /// releases the monitor and rethrows.
    fn gen_synchronized(&mut self, monitor: &ExpressionDef, body: &StatementDef) -> Result<()> {
        self.reject_inside_yield("synchronized")?;
        let ty = self.push_reference(monitor)?;
        self.code.emit(Instruction::Dup);
        let start = self.code.new_label();
        let descriptor = self.descriptor(&ty)?;
        let slot = self.ctx.allocate_temp(ty, descriptor, start)?;
        self.code.emit_store(ValueKind::Reference, slot);
        self.code.bind_label(start);
        self.code.emit(Instruction::Monitorenter);

        self.cleanups.push(Cleanup::MonitorExit { slot });
        let region = self.open_region();
        let lowered = self.gen_scoped(body);
        self.cleanups.pop();
        lowered?;
        self.code.emit_load(ValueKind::Reference, slot);
        self.code.emit(Instruction::Monitorexit);
        let ranges = self.close_region(region);
        let after = self.code.new_label();
        self.code.emit_goto(after)?;

        let handler = self.code.new_label();
        for (from, to) in &ranges {
            self.code.add_exception_entry(*from, *to, handler, 0)?;
        }
        self.code.bind_label(handler);
        let throwable = TypeDef::class(THROWABLE);
        let exception_start = self.code.new_label();
        let descriptor = self.descriptor(&throwable)?;
        let exception = self.ctx.allocate_temp(throwable, descriptor, exception_start)?;
        self.code.emit_store(ValueKind::Reference, exception);
        self.code.bind_label(exception_start);
        self.code.emit_load(ValueKind::Reference, slot);
        self.code.emit(Instruction::Monitorexit);
        let release_end = self.code.here();
        // a failed release retries through the same handler
        self.code.add_exception_entry(handler, release_end, handler, 0)?;
        self.code.emit_load(ValueKind::Reference, exception);
        self.code.emit(Instruction::Athrow);

        self.code.bind_label(after);
        Ok(())
    }
}
