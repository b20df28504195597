use std::sync::Arc;

use crate::error::{LowerError, Result};

use super::expr::ExpressionDef;
use super::types::TypeDef;

/// Key of one switch arm.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SwitchKey {
    Int(i32),
    Str(String),
}

impl From<i32> for SwitchKey {
    fn from(value: i32) -> Self {
        SwitchKey::Int(value)
    }
}

impl From<&str> for SwitchKey {
    fn from(value: &str) -> Self {
        SwitchKey::Str(value.to_string())
    }
}

/// One switch arm. Arms whose bodies are the same `Arc` share a single
/// emitted copy of the body.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase<T> {
    pub key: SwitchKey,
    pub body: Arc<T>,
}

impl<T> SwitchCase<T> {
    pub fn new(key: impl Into<SwitchKey>, body: Arc<T>) -> Self {
        SwitchCase {
            key: key.into(),
            body,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchDef {
    pub exception: TypeDef,
    pub body: StatementDef,
}

/// `try` with ordered catch clauses and at most one `finally`.
#[derive(Clone, Debug, PartialEq)]
pub struct TryDef {
    pub body: Box<StatementDef>,
    pub catches: Vec<CatchDef>,
    pub finally: Option<Arc<StatementDef>>,
}

impl TryDef {
    pub fn new(body: StatementDef) -> Self {
        TryDef {
            body: Box::new(body),
            catches: Vec::new(),
            finally: None,
        }
    }

    pub fn do_catch(mut self, exception: TypeDef, body: StatementDef) -> Self {
        self.catches.push(CatchDef { exception, body });
        self
    }

    pub fn do_finally(mut self, body: StatementDef) -> Result<Self> {
        if self.finally.is_some() {
            return Err(LowerError::ambiguity("finally block is already declared on this try"));
        }
        self.finally = Some(Arc::new(body));
        Ok(self)
    }
}

impl From<TryDef> for StatementDef {
    fn from(value: TryDef) -> Self {
        StatementDef::Try(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StatementDef {
    Expression(ExpressionDef),
    Multi(Vec<StatementDef>),
    DefineAndAssign {
        name: String,
        ty: TypeDef,
        value: ExpressionDef,
    },
    Assign {
        name: String,
        ty: TypeDef,
        value: ExpressionDef,
    },
    PutField {
        instance: ExpressionDef,
        name: String,
        ty: TypeDef,
        value: ExpressionDef,
    },
    PutStaticField {
        owner: TypeDef,
        name: String,
        ty: TypeDef,
        value: ExpressionDef,
    },
    PutArrayElement {
        array: ExpressionDef,
        index: ExpressionDef,
        value: ExpressionDef,
    },
    Return(Option<ExpressionDef>),
    Throw(ExpressionDef),
    If {
        condition: ExpressionDef,
        body: Box<StatementDef>,
    },
    IfElse {
        condition: ExpressionDef,
        body: Box<StatementDef>,
        otherwise: Box<StatementDef>,
    },
    While {
        condition: ExpressionDef,
        body: Box<StatementDef>,
    },
    Switch {
        expr: ExpressionDef,
        cases: Vec<SwitchCase<StatementDef>>,
        default: Option<Arc<StatementDef>>,
    },
    Try(TryDef),
    Synchronized {
        monitor: ExpressionDef,
        body: Box<StatementDef>,
    },
}

impl StatementDef {
    pub fn multi(statements: Vec<StatementDef>) -> Self {
        StatementDef::Multi(statements)
    }

    pub fn define(name: impl Into<String>, ty: TypeDef, value: ExpressionDef) -> Self {
        StatementDef::DefineAndAssign {
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn assign(name: impl Into<String>, ty: TypeDef, value: ExpressionDef) -> Self {
        StatementDef::Assign {
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn put_field(instance: ExpressionDef, name: impl Into<String>, ty: TypeDef, value: ExpressionDef) -> Self {
        StatementDef::PutField {
            instance,
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn put_static(owner: TypeDef, name: impl Into<String>, ty: TypeDef, value: ExpressionDef) -> Self {
        StatementDef::PutStaticField {
            owner,
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn put_element(array: ExpressionDef, index: ExpressionDef, value: ExpressionDef) -> Self {
        StatementDef::PutArrayElement { array, index, value }
    }

    pub fn return_void() -> Self {
        StatementDef::Return(None)
    }

    pub fn if_then(condition: ExpressionDef, body: StatementDef) -> Self {
        StatementDef::If {
            condition,
            body: Box::new(body),
        }
    }

    pub fn if_else(condition: ExpressionDef, body: StatementDef, otherwise: StatementDef) -> Self {
        StatementDef::IfElse {
            condition,
            body: Box::new(body),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn while_loop(condition: ExpressionDef, body: StatementDef) -> Self {
        StatementDef::While {
            condition,
            body: Box::new(body),
        }
    }

    pub fn switch(
        expr: ExpressionDef,
        cases: Vec<SwitchCase<StatementDef>>,
        default: Option<Arc<StatementDef>>,
    ) -> Self {
        StatementDef::Switch { expr, cases, default }
    }

    pub fn synchronized(monitor: ExpressionDef, body: StatementDef) -> Self {
        StatementDef::Synchronized {
            monitor,
            body: Box::new(body),
        }
    }

    /// Nested `Multi` blocks flattened into one sequence.
    pub fn flatten(&self) -> Vec<&StatementDef> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a StatementDef>) {
        match self {
            StatementDef::Multi(statements) => {
                for s in statements {
                    s.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }

    /// Conservative check that every path through this statement ends in
    /// `return` or `throw`.
    pub fn always_exits(&self) -> bool {
        let flat = self.flatten();
        let Some(last) = flat.last() else {
            return false;
        };
        match last {
            StatementDef::Return(_) | StatementDef::Throw(_) => true,
            StatementDef::IfElse { body, otherwise, .. } => body.always_exits() && otherwise.always_exits(),
            // Catch bodies are not inspected; one that falls through leaves the
            // method end reachable, which lowering rejects on its own.
            StatementDef::Try(t) => t.body.always_exits() || t.finally.as_ref().is_some_and(|f| f.always_exits()),
            StatementDef::Synchronized { body, .. } => body.always_exits(),
            StatementDef::Switch { cases, default, .. } => match default {
                Some(default) => default.always_exits() && cases.iter().all(|c| c.body.always_exits()),
                None => false,
            },
            _ => false,
        }
    }
}

impl From<ExpressionDef> for StatementDef {
    fn from(value: ExpressionDef) -> Self {
        StatementDef::Expression(value)
    }
}
