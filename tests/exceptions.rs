mod common;

use classgen::code_attribute::{instruction_addresses, Instruction};
use classgen::model::{ExpressionDef, StatementDef, TryDef, TypeDef};
use classgen::LowerError;
use pretty_assertions::assert_eq;

use common::{lower, probe, probe_host, run, static_method, Outcome, Value};

const FINALLY: &str = "demo.Probe.fin";
const CAUGHT: &str = "demo.Probe.caught";

fn illegal_state() -> TypeDef {
    TypeDef::class("java.lang.IllegalStateException")
}

/// `try { if (fail) fail(); if (early) return 1; } catch (IllegalStateException e) { caught(); } finally { fin(); } return 2;`
fn guarded() -> classgen::model::MethodDef {
    let body = StatementDef::multi(vec![
        StatementDef::if_then(ExpressionDef::param("fail", TypeDef::BOOLEAN), probe("fail")),
        StatementDef::if_then(ExpressionDef::param("early", TypeDef::BOOLEAN), ExpressionDef::int(1).returning()),
    ]);
    let t = TryDef::new(body)
        .do_catch(illegal_state(), probe("caught"))
        .do_finally(probe("fin"))
        .unwrap();
    static_method(
        "guarded",
        &[("fail", TypeDef::BOOLEAN), ("early", TypeDef::BOOLEAN)],
        TypeDef::INT,
        vec![t.into(), ExpressionDef::int(2).returning()],
    )
}

#[test]
fn finally_runs_once_on_every_exit() {
    let (code, pool) = lower(guarded()).unwrap();

    let fallthrough = run(&code, &pool, vec![Value::Int(0), Value::Int(0)], &mut probe_host);
    assert_eq!(fallthrough.returned_int(), 2);
    assert_eq!(fallthrough.count(FINALLY), 1);

    let early = run(&code, &pool, vec![Value::Int(0), Value::Int(1)], &mut probe_host);
    assert_eq!(early.returned_int(), 1);
    assert_eq!(early.count(FINALLY), 1);

    let thrown = run(&code, &pool, vec![Value::Int(1), Value::Int(1)], &mut probe_host);
    assert_eq!(thrown.returned_int(), 2);
    assert_eq!(thrown.count(CAUGHT), 1);
    assert_eq!(thrown.count(FINALLY), 1);
}

#[test]
fn uncaught_exception_runs_finally_and_propagates() {
    let t = TryDef::new(probe("fail")).do_finally(probe("fin")).unwrap();
    let method = static_method("leaky", &[], TypeDef::VOID, vec![t.into()]);
    let (code, pool) = lower(method).unwrap();
    let trace = run(&code, &pool, vec![], &mut probe_host);
    assert!(matches!(trace.outcome, Outcome::Threw(_)));
    assert_eq!(trace.count(FINALLY), 1);
}

#[test]
fn exception_in_catch_body_runs_finally_once() {
    let t = TryDef::new(probe("fail"))
        .do_catch(illegal_state(), probe("fail"))
        .do_finally(probe("fin"))
        .unwrap();
    let method = static_method("rethrow", &[], TypeDef::VOID, vec![t.into()]);
    let (code, pool) = lower(method).unwrap();
    let trace = run(&code, &pool, vec![], &mut probe_host);
    assert!(matches!(trace.outcome, Outcome::Threw(_)));
    assert_eq!(trace.count(FINALLY), 1);
}

#[test]
fn nested_finally_blocks_run_inner_first() {
    let inner = TryDef::new(ExpressionDef::int(5).returning())
        .do_finally(probe("inner"))
        .unwrap();
    let outer = TryDef::new(inner.into()).do_finally(probe("outer")).unwrap();
    let method = static_method("nested", &[], TypeDef::INT, vec![outer.into()]);
    let (code, pool) = lower(method).unwrap();
    let trace = run(&code, &pool, vec![], &mut probe_host);
    assert_eq!(trace.returned_int(), 5);
    assert_eq!(trace.calls, vec!["demo.Probe.inner", "demo.Probe.outer"]);
}

#[test]
fn caught_exception_is_bound_in_the_catch_body() {
    let t = TryDef::new(probe("fail")).do_catch(
        illegal_state(),
        ExpressionDef::exception(illegal_state()).throwing(),
    );
    let method = static_method("rebind", &[], TypeDef::VOID, vec![t.into()]);
    let (code, pool) = lower(method).unwrap();
    let trace = run(&code, &pool, vec![], &mut probe_host);
    match trace.outcome {
        Outcome::Threw(Value::Object { class, .. }) => assert_eq!(class, "java/lang/IllegalStateException"),
        other => panic!("expected the exception to propagate, got {:?}", other),
    }
}

#[test]
fn synchronized_releases_on_every_exit() {
    let body = StatementDef::multi(vec![
        StatementDef::if_then(ExpressionDef::param("fail", TypeDef::BOOLEAN), probe("fail")),
        ExpressionDef::int(3).returning(),
    ]);
    let method = static_method(
        "locked",
        &[("lock", TypeDef::object()), ("fail", TypeDef::BOOLEAN)],
        TypeDef::INT,
        vec![StatementDef::synchronized(ExpressionDef::param("lock", TypeDef::object()), body)],
    );
    let (code, pool) = lower(method).unwrap();
    let lock = || Value::Object {
        class: "java/lang/Object".to_string(),
        id: 99,
    };

    let normal = run(&code, &pool, vec![lock(), Value::Int(0)], &mut probe_host);
    assert_eq!(normal.returned_int(), 3);
    assert_eq!((normal.monitor_enters, normal.monitor_exits), (1, 1));

    let failed = run(&code, &pool, vec![lock(), Value::Int(1)], &mut probe_host);
    assert!(matches!(failed.outcome, Outcome::Threw(_)));
    assert_eq!((failed.monitor_enters, failed.monitor_exits), (1, 1));
}

#[test]
fn handler_entries_list_inner_ranges_first() {
    let inner = TryDef::new(probe("fail")).do_catch(illegal_state(), probe("caught"));
    let outer = TryDef::new(inner.into()).do_catch(TypeDef::class("java.lang.RuntimeException"), probe("outer"));
    let method = static_method("layers", &[], TypeDef::VOID, vec![outer.into()]);
    let (code, pool) = lower(method).unwrap();
    assert_eq!(code.exception_table.len(), 2);
    let inner_type = pool.class_name_at(code.exception_table[0].catch_type).unwrap();
    assert_eq!(inner_type, "java/lang/IllegalStateException");
    let trace = run(&code, &pool, vec![], &mut probe_host);
    assert_eq!(trace.calls, vec!["demo.Probe.fail", "demo.Probe.caught"]);
}

#[test]
fn finally_may_reuse_a_name_from_the_try_body() {
    let body = StatementDef::multi(vec![
        StatementDef::define("x", TypeDef::INT, ExpressionDef::int(1)),
        ExpressionDef::local("x", TypeDef::INT).returning(),
    ]);
    let finally = StatementDef::multi(vec![
        StatementDef::define("x", TypeDef::INT, ExpressionDef::int(2)),
        probe("fin"),
    ]);
    let t = TryDef::new(body).do_finally(finally).unwrap();
    let method = static_method("shadow", &[], TypeDef::INT, vec![t.into()]);
    let (code, pool) = lower(method).unwrap();
    let trace = run(&code, &pool, vec![], &mut probe_host);
    assert_eq!(trace.returned_int(), 1);
    assert_eq!(trace.count(FINALLY), 1);
}

#[test]
fn finally_may_reuse_a_name_from_a_catch_body() {
    let catch = StatementDef::multi(vec![
        StatementDef::define("y", TypeDef::INT, ExpressionDef::int(7)),
        ExpressionDef::local("y", TypeDef::INT).returning(),
    ]);
    let finally = StatementDef::multi(vec![
        StatementDef::define("y", TypeDef::INT, ExpressionDef::int(8)),
        probe("fin"),
    ]);
    let t = TryDef::new(probe("fail"))
        .do_catch(illegal_state(), catch)
        .do_finally(finally)
        .unwrap();
    let method = static_method(
        "recover",
        &[],
        TypeDef::INT,
        vec![t.into(), ExpressionDef::int(0).returning()],
    );
    let (code, pool) = lower(method).unwrap();
    let trace = run(&code, &pool, vec![], &mut probe_host);
    assert_eq!(trace.returned_int(), 7);
    assert_eq!(trace.count(FINALLY), 1);
}

#[test]
fn returning_finally_completes_a_non_void_method() {
    let body = StatementDef::multi(vec![
        StatementDef::if_then(ExpressionDef::param("fail", TypeDef::BOOLEAN), probe("fail")),
        ExpressionDef::int(1).returning(),
    ]);
    let t = TryDef::new(body)
        .do_catch(illegal_state(), probe("caught"))
        .do_finally(ExpressionDef::int(3).returning())
        .unwrap();
    let method = static_method("settle", &[("fail", TypeDef::BOOLEAN)], TypeDef::INT, vec![t.into()]);
    let (code, pool) = lower(method).unwrap();
    assert_eq!(run(&code, &pool, vec![Value::Int(0)], &mut probe_host).returned_int(), 3);
    let failed = run(&code, &pool, vec![Value::Int(1)], &mut probe_host);
    assert_eq!(failed.returned_int(), 3);
    assert_eq!(failed.count(CAUGHT), 1);
}

#[test]
fn catch_falling_off_a_non_void_method_is_rejected() {
    let t = TryDef::new(ExpressionDef::int(1).returning()).do_catch(illegal_state(), probe("caught"));
    let method = static_method("leaks", &[], TypeDef::INT, vec![t.into()]);
    assert!(matches!(lower(method), Err(LowerError::TypeContractViolation { .. })));
}

#[test]
fn monitor_ranges_stop_before_the_return() {
    let method = static_method(
        "held",
        &[("lock", TypeDef::object())],
        TypeDef::INT,
        vec![StatementDef::synchronized(
            ExpressionDef::param("lock", TypeDef::object()),
            ExpressionDef::int(3).returning(),
        )],
    );
    let (code, pool) = lower(method).unwrap();
    let (addresses, _) = instruction_addresses(&code.instructions);
    let at = |wanted: fn(&Instruction) -> bool| -> Vec<u32> {
        code.instructions
            .iter()
            .zip(&addresses)
            .filter(|(i, _)| wanted(i))
            .map(|(_, a)| *a)
            .collect()
    };
    let covered = |address: u32| {
        code.exception_table
            .iter()
            .any(|e| u32::from(e.start_pc) <= address && address < u32::from(e.end_pc))
    };
    let returns = at(|i| matches!(i, Instruction::Ireturn));
    assert_eq!(returns.len(), 1);
    assert!(!covered(returns[0]));
    let releases = at(|i| matches!(i, Instruction::Monitorexit));
    assert!(releases.iter().all(|a| covered(*a)));

    let lock = Value::Object {
        class: "java/lang/Object".to_string(),
        id: 7,
    };
    let trace = run(&code, &pool, vec![lock], &mut probe_host);
    assert_eq!(trace.returned_int(), 3);
    assert_eq!((trace.monitor_enters, trace.monitor_exits), (1, 1));
}

#[test]
fn return_inside_a_finally_copy_keeps_ranges_ordered() {
    let finally = StatementDef::multi(vec![
        StatementDef::if_then(ExpressionDef::param("early", TypeDef::BOOLEAN), ExpressionDef::int(2).returning()),
        probe("fin"),
    ]);
    let inner = TryDef::new(ExpressionDef::int(1).returning()).do_finally(finally).unwrap();
    let outer = TryDef::new(inner.into())
        .do_catch(illegal_state(), probe("caught"))
        .do_finally(probe("outer"))
        .unwrap();
    let method = static_method(
        "layered",
        &[("early", TypeDef::BOOLEAN)],
        TypeDef::INT,
        vec![outer.into(), ExpressionDef::int(0).returning()],
    );
    let (code, pool) = lower(method).unwrap();
    assert!(code.exception_table.iter().all(|e| e.start_pc < e.end_pc));

    let plain = run(&code, &pool, vec![Value::Int(0)], &mut probe_host);
    assert_eq!(plain.returned_int(), 1);
    assert_eq!(plain.calls, vec!["demo.Probe.fin", "demo.Probe.outer"]);
    let early = run(&code, &pool, vec![Value::Int(1)], &mut probe_host);
    assert_eq!(early.returned_int(), 2);
    assert_eq!(early.calls, vec!["demo.Probe.outer"]);
}
