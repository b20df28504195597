use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{trace, warn};

use crate::code_attribute::Instruction;
use crate::error::{LowerError, Result};
use crate::model::{numeric_kind, ExpressionDef, PrimitiveType, StatementDef, SwitchCase, SwitchKey, TypeDef};

use super::codegen::{CodeBuffer, Label, ValueKind};
use super::method::{InvokeKind, MethodCompiler};

/// Minimum ratio of keys to key span for a `tableswitch`.
const TABLE_DENSITY: f64 = 0.5;

/// `String.hashCode()` as the JVM computes it, over UTF-16 units.
pub fn java_string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Labels for the distinct case bodies of one switch.
struct ArmPlan<T> {
    /// Each body once, in first-use order.
    bodies: Vec<(Arc<T>, Label)>,
    keys: Vec<(SwitchKey, Label)>,
    default: Option<Label>,
}

fn label_for<T>(code: &mut CodeBuffer, bodies: &mut Vec<(Arc<T>, Label)>, body: &Arc<T>) -> Label {
    if let Some((_, label)) = bodies.iter().find(|(b, _)| Arc::ptr_eq(b, body)) {
        return *label;
    }
    let label = code.new_label();
    bodies.push((body.clone(), label));
    label
}

/// Assign labels to arms. Bodies that are the same `Arc` share one label.
fn plan_arms<T>(code: &mut CodeBuffer, cases: &[SwitchCase<T>], default: Option<&Arc<T>>) -> Result<ArmPlan<T>> {
    let mut seen = HashSet::new();
    let mut bodies = Vec::new();
    let mut keys = Vec::with_capacity(cases.len());
    for case in cases {
        if !seen.insert(&case.key) {
            return Err(LowerError::ambiguity(format!("duplicate switch key {:?}", case.key)));
        }
        let label = label_for(code, &mut bodies, &case.body);
        keys.push((case.key.clone(), label));
    }
    let default = default.map(|body| label_for(code, &mut bodies, body));
    Ok(ArmPlan { bodies, keys, default })
}

impl<'a> MethodCompiler<'a> {
    pub(super) fn gen_switch(
        &mut self,
        selector: &ExpressionDef,
        cases: &[SwitchCase<StatementDef>],
        default: Option<&Arc<StatementDef>>,
    ) -> Result<()> {
        let end = self.code.new_label();
        let plan = plan_arms(&mut self.code, cases, default)?;
        let default_label = plan.default.unwrap_or(end);
        self.emit_key_dispatch(selector, &plan.keys, default_label)?;
        for (body, label) in &plan.bodies {
            self.code.bind_label(*label);
            self.gen_scoped(body)?;
            self.code.emit_goto(end)?;
        }
        self.code.bind_label(end);
        Ok(())
    }

    pub(super) fn push_switch(
        &mut self,
        selector: &ExpressionDef,
        ty: &TypeDef,
        cases: &[SwitchCase<ExpressionDef>],
        default: &ExpressionDef,
    ) -> Result<TypeDef> {
        let target = self.erase(ty)?;
        let end = self.code.new_label();
        let plan = plan_arms(&mut self.code, cases, None)?;
        let default_label = self.code.new_label();
        self.emit_key_dispatch(selector, &plan.keys, default_label)?;
        for (body, label) in &plan.bodies {
            self.code.bind_label(*label);
            self.gen_expr(body, &target)?;
            self.code.emit_goto(end)?;
        }
        self.code.bind_label(default_label);
        self.gen_expr(default, &target)?;
        self.code.bind_label(end);
        let vtype = self.vtype(&target)?;
        self.code.hint_stack(end, vec![vtype]);
        Ok(target)
    }

    fn emit_key_dispatch(&mut self, selector: &ExpressionDef, keys: &[(SwitchKey, Label)], default: Label) -> Result<()> {
        let ty = self.erase(&selector.ty())?;
        if ty.is_string() {
            let mut pairs = Vec::with_capacity(keys.len());
            for (key, label) in keys {
                match key {
                    SwitchKey::Str(s) => pairs.push((s.as_str(), *label)),
                    SwitchKey::Int(i) => {
                        return Err(LowerError::type_contract(format!("int key {} in a string switch", i)));
                    }
                }
            }
            return self.emit_string_dispatch(selector, &pairs, default);
        }

        match numeric_kind(&ty) {
            Some(PrimitiveType::Int | PrimitiveType::Short | PrimitiveType::Byte | PrimitiveType::Char) => {}
            _ => {
                return Err(LowerError::type_contract(format!("cannot switch on a value of type {}", ty)));
            }
        }
        let mut pairs = Vec::with_capacity(keys.len());
        for (key, label) in keys {
            match key {
                SwitchKey::Int(i) => pairs.push((*i, *label)),
                SwitchKey::Str(s) => {
                    return Err(LowerError::type_contract(format!("string key {:?} in an int switch", s)));
                }
            }
        }
        self.gen_expr(selector, &TypeDef::INT)?;
        self.emit_int_dispatch(pairs, default)
    }

    /// Dispatch on the int on top of the stack.
    fn emit_int_dispatch(&mut self, mut pairs: Vec<(i32, Label)>, default: Label) -> Result<()> {
        if pairs.is_empty() {
            self.code.emit(Instruction::Pop);
            return self.code.emit_goto(default);
        }
        pairs.sort_by_key(|(key, _)| *key);
        let low = pairs[0].0;
        let high = pairs[pairs.len() - 1].0;
        let span = i64::from(high) - i64::from(low) + 1;
        let density = pairs.len() as f64 / span as f64;
        if density >= TABLE_DENSITY {
            trace!(
                "tableswitch over {}..={} ({} keys, density {:.2})",
                low,
                high,
                pairs.len(),
                density
            );
            let mut labels = vec![default; span as usize];
            for (key, label) in &pairs {
                labels[(i64::from(*key) - i64::from(low)) as usize] = *label;
            }
            self.code.emit_table_switch(low, high, labels, default)
        } else {
            trace!("lookupswitch with {} keys (density {:.2})", pairs.len(), density);
            self.code.emit_lookup_switch(pairs, default)
        }
    }

    /// Hash the selector, dispatch on the hash, then confirm with `equals`.
    fn emit_string_dispatch(&mut self, selector: &ExpressionDef, keys: &[(&str, Label)], default: Label) -> Result<()> {
        let string = TypeDef::string();
        self.gen_expr(selector, &string)?;
        let start = self.code.new_label();
        let descriptor = self.descriptor(&string)?;
        let slot = self.ctx.allocate_temp(string, descriptor, start)?;
        self.code.emit_store(ValueKind::Reference, slot);
        self.code.bind_label(start);

        let mut buckets: BTreeMap<i32, Vec<(&str, Label)>> = BTreeMap::new();
        for (key, label) in keys {
            buckets.entry(java_string_hash(key)).or_default().push((key, *label));
        }
        for (hash, entries) in &buckets {
            if entries.len() > 1 {
                let names: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
                warn!("string switch keys {:?} share hash code {}", names, hash);
            }
        }

        self.code.emit_load(ValueKind::Reference, slot);
        self.invoke_raw(InvokeKind::Virtual, "java/lang/String", false, "hashCode", "()I")?;
        let bucket_labels: Vec<(i32, Label)> = buckets.keys().map(|hash| (*hash, self.code.new_label())).collect();
        self.emit_int_dispatch(bucket_labels.clone(), default)?;

        for ((_, entries), (_, bucket_label)) in buckets.iter().zip(&bucket_labels) {
            self.code.bind_label(*bucket_label);
            for (key, label) in entries {
                self.code.emit_load(ValueKind::Reference, slot);
                let index = self.pool.string(key)?;
                self.code.emit_ldc(index);
                self.invoke_raw(
                    InvokeKind::Virtual,
                    "java/lang/String",
                    false,
                    "equals",
                    "(Ljava/lang/Object;)Z",
                )?;
                self.code.emit_branch(Instruction::Ifne, *label)?;
            }
            self.code.emit_goto(default)?;
        }
        Ok(())
    }
}
