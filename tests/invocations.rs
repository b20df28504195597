mod common;

use classgen::code_attribute::Instruction;
use classgen::constant_info::ConstantPool;
use classgen::model::{ClassDef, ExpressionDef, MethodDef, MethodSig, Modifier, StatementDef, TypeDef};
use pretty_assertions::assert_eq;

use common::lower_in;

/// `private void f(int)` beside `public void f(String)`.
fn overloaded() -> ClassDef {
    let mut class = ClassDef::new("demo.Subject");
    class.modifiers.insert(Modifier::Public);
    class.methods.push(
        MethodDef::new("f", TypeDef::VOID)
            .with_modifiers(&[Modifier::Private])
            .with_parameter("n", TypeDef::INT)
            .with_statement(StatementDef::return_void()),
    );
    class.methods.push(
        MethodDef::new("f", TypeDef::VOID)
            .with_modifiers(&[Modifier::Public])
            .with_parameter("s", TypeDef::string())
            .with_statement(StatementDef::return_void()),
    );
    class
}

fn calling(parameter: TypeDef, arg: ExpressionDef) -> MethodDef {
    let call = ExpressionDef::this().invoke(MethodSig::new("f", vec![parameter], TypeDef::VOID), vec![arg]);
    MethodDef::new("call", TypeDef::VOID)
        .with_modifiers(&[Modifier::Public])
        .with_statement(call.as_statement())
}

/// `(opcode, name, descriptor)` of every instance call in the body.
fn instance_calls(instructions: &[Instruction], pool: &ConstantPool) -> Vec<(&'static str, String, String)> {
    instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::Invokespecial(index) => Some(("invokespecial", *index)),
            Instruction::Invokevirtual(index) => Some(("invokevirtual", *index)),
            _ => None,
        })
        .map(|(op, index)| {
            let member = pool.member_at(index).unwrap();
            (op, member.name, member.descriptor)
        })
        .collect()
}

#[test]
fn public_overload_of_a_private_name_dispatches_virtually() {
    let (code, pool) = lower_in(overloaded(), calling(TypeDef::string(), ExpressionDef::string("x"))).unwrap();
    assert_eq!(
        instance_calls(&code.instructions, &pool),
        vec![("invokevirtual", "f".to_string(), "(Ljava/lang/String;)V".to_string())]
    );
}

#[test]
fn private_overload_dispatches_specially() {
    let (code, pool) = lower_in(overloaded(), calling(TypeDef::INT, ExpressionDef::int(1))).unwrap();
    assert_eq!(
        instance_calls(&code.instructions, &pool),
        vec![("invokespecial", "f".to_string(), "(I)V".to_string())]
    );
}

#[test]
fn private_name_with_other_return_type_dispatches_virtually() {
    let mut class = overloaded();
    class.methods.retain(|m| m.modifiers.contains(&Modifier::Private));
    let call = ExpressionDef::this().invoke(
        MethodSig::new("f", vec![TypeDef::INT], TypeDef::INT),
        vec![ExpressionDef::int(2)],
    );
    let method = MethodDef::new("call", TypeDef::VOID)
        .with_modifiers(&[Modifier::Public])
        .with_statement(call.as_statement());
    let (code, pool) = lower_in(class, method).unwrap();
    assert_eq!(
        instance_calls(&code.instructions, &pool),
        vec![("invokevirtual", "f".to_string(), "(I)I".to_string())]
    );
}
