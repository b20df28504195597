mod common;

use classgen::model::{ExpressionDef, StatementDef, TryDef, TypeDef};
use classgen::LowerError;

use common::{lower, probe, static_method};

fn type_contract(result: Result<impl std::fmt::Debug, LowerError>) {
    match result {
        Err(LowerError::TypeContractViolation { .. }) => {}
        other => panic!("expected a type contract violation, got {:?}", other),
    }
}

#[test]
fn void_method_returning_a_value() {
    type_contract(lower(static_method(
        "v",
        &[],
        TypeDef::VOID,
        vec![ExpressionDef::int(1).returning()],
    )));
}

#[test]
fn value_method_returning_nothing() {
    type_contract(lower(static_method("i", &[], TypeDef::INT, vec![StatementDef::return_void()])));
}

#[test]
fn value_method_without_a_proven_return() {
    let body = StatementDef::if_then(
        ExpressionDef::param("flag", TypeDef::BOOLEAN),
        ExpressionDef::int(1).returning(),
    );
    type_contract(lower(static_method("maybe", &[("flag", TypeDef::BOOLEAN)], TypeDef::INT, vec![body])));
}

#[test]
fn duplicate_local_in_one_scope() {
    type_contract(lower(static_method(
        "twice",
        &[],
        TypeDef::VOID,
        vec![
            StatementDef::define("x", TypeDef::INT, ExpressionDef::int(1)),
            StatementDef::define("x", TypeDef::INT, ExpressionDef::int(2)),
        ],
    )));
}

#[test]
fn sibling_scopes_may_reuse_a_name() {
    let flag = || ExpressionDef::param("flag", TypeDef::BOOLEAN);
    let define = || StatementDef::define("x", TypeDef::INT, ExpressionDef::int(1));
    let result = lower(static_method(
        "siblings",
        &[("flag", TypeDef::BOOLEAN)],
        TypeDef::VOID,
        vec![
            StatementDef::if_then(flag(), define()),
            StatementDef::if_then(flag(), define()),
        ],
    ));
    assert!(result.is_ok(), "{:?}", result.err());
}

#[test]
fn unknown_local_is_rejected() {
    type_contract(lower(static_method(
        "ghost",
        &[],
        TypeDef::INT,
        vec![ExpressionDef::local("missing", TypeDef::INT).returning()],
    )));
}

#[test]
fn non_boolean_condition() {
    let body = StatementDef::if_then(ExpressionDef::int(1), probe("hit"));
    type_contract(lower(static_method("cond", &[], TypeDef::VOID, vec![body])));
}

#[test]
fn throwing_a_primitive() {
    type_contract(lower(static_method("t", &[], TypeDef::VOID, vec![ExpressionDef::int(3).throwing()])));
}

#[test]
fn this_in_a_static_method() {
    type_contract(lower(static_method(
        "s",
        &[],
        TypeDef::object(),
        vec![ExpressionDef::this().returning()],
    )));
}

#[test]
fn second_finally_is_ambiguous() {
    let t = TryDef::new(probe("hit")).do_finally(probe("a")).unwrap();
    assert!(matches!(t.do_finally(probe("b")), Err(LowerError::StructuralAmbiguity { .. })));
}

#[test]
fn try_inside_a_yield_case_is_unsupported() {
    use classgen::model::{shared, SwitchCase};
    let t = TryDef::new(ExpressionDef::int(1).returning())
        .do_finally(probe("fin"))
        .unwrap();
    let arm = ExpressionDef::yield_case(TypeDef::INT, t.into());
    let value = ExpressionDef::switch(
        ExpressionDef::param("k", TypeDef::INT),
        TypeDef::INT,
        vec![SwitchCase::new(1, shared(arm))],
        ExpressionDef::int(0),
    );
    let result = lower(static_method("y", &[("k", TypeDef::INT)], TypeDef::INT, vec![value.returning()]));
    assert!(matches!(result, Err(LowerError::UnsupportedVariant { .. })), "{:?}", result.err());
}

#[test]
fn errors_render_their_category() {
    let err = LowerError::ambiguity("two finally blocks");
    assert_eq!(err.to_string(), "structural ambiguity: two finally blocks");
}
