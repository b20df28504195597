use crate::error::{LowerError, Result};
use crate::model::{
    ClassDef, ClassTypeDef, EnumConstantDef, EnumDef, ExpressionDef, FieldDef, MethodDef, MethodSig, Modifier,
    ParameterDef, StatementDef, TypeDef,
};

const VALUES_FIELD: &str = "$VALUES";
const VALUES_FACTORY: &str = "$values";
const NAME_PARAM: &str = "$name";
const ORDINAL_PARAM: &str = "$ordinal";

/// Constructor taking the synthetic name and ordinal ahead of `extra`.
fn synthetic_constructor(extra: &[ParameterDef]) -> MethodDef {
    let mut ctor = MethodDef::constructor()
        .with_modifiers(&[Modifier::Private])
        .with_parameter(NAME_PARAM, TypeDef::string())
        .with_parameter(ORDINAL_PARAM, TypeDef::INT);
    ctor.parameters.extend(extra.iter().cloned());
    let super_call = ExpressionDef::super_ref()
        .invoke(
            MethodSig::constructor(vec![TypeDef::string(), TypeDef::INT]),
            vec![
                ExpressionDef::param(NAME_PARAM, TypeDef::string()),
                ExpressionDef::param(ORDINAL_PARAM, TypeDef::INT),
            ],
        )
        .as_statement();
    ctor.with_statement(super_call)
}

fn parameter_types(parameters: &[ParameterDef]) -> Vec<TypeDef> {
    parameters.iter().map(|p| p.ty.clone()).collect()
}

/// The declared constructor a constant's arguments select, by arity.
fn select_constructor<'a>(
    enum_name: &str,
    constant: &EnumConstantDef,
    constructors: &'a [MethodDef],
) -> Result<Option<&'a MethodDef>> {
    if constructors.is_empty() {
        if constant.args.is_empty() {
            return Ok(None);
        }
        return Err(LowerError::type_contract(format!(
            "enum constant {}.{} passes {} arguments but no constructor is declared",
            enum_name,
            constant.name,
            constant.args.len()
        )));
    }
    let mut matching = constructors.iter().filter(|c| c.parameters.len() == constant.args.len());
    match (matching.next(), matching.next()) {
        (Some(ctor), None) => Ok(Some(ctor)),
        (None, _) => Err(LowerError::type_contract(format!(
            "no constructor of {} takes {} arguments for constant {}",
            enum_name,
            constant.args.len(),
            constant.name
        ))),
        (Some(_), Some(_)) => Err(LowerError::ambiguity(format!(
            "several constructors of {} take {} arguments for constant {}",
            enum_name,
            constant.args.len(),
            constant.name
        ))),
    }
}

/// Rewrite an enum into a final class extending `java.lang.Enum`.
///
/// Each constant becomes a `public static final` field initialized with
/// `new E("NAME", ordinal, args..)`. Declared constructors keep their
/// parameters behind the synthetic name and ordinal, and their bodies move to
/// private `$constructorN` methods called right after `super(name, ordinal)`.
/// `$VALUES`, `$values()`, `values()` and `valueOf(String)` are added as javac
/// does.
pub fn desugar_enum(def: EnumDef) -> Result<ClassDef> {
    let class_type = ClassTypeDef::new(def.name.clone());
    let this_type = TypeDef::Class(class_type.clone());
    let array_type = TypeDef::array(this_type.clone(), 1);

    let (declared, methods): (Vec<MethodDef>, Vec<MethodDef>) =
        def.methods.into_iter().partition(MethodDef::is_constructor);

    let mut constructors = Vec::with_capacity(declared.len().max(1));
    let mut helpers = Vec::with_capacity(declared.len());
    if declared.is_empty() {
        constructors.push(synthetic_constructor(&[]));
    }
    for (index, ctor) in declared.iter().enumerate() {
        if ctor
            .statements
            .iter()
            .any(|s| matches!(s, StatementDef::Expression(ExpressionDef::InvokeInstance { method, .. }) if method.is_constructor()))
        {
            return Err(LowerError::unsupported(format!(
                "explicit constructor call in a constructor of enum {}",
                def.name
            )));
        }
        let helper_name = format!("$constructor{}", index);
        let call = ExpressionDef::this()
            .invoke(
                MethodSig::new(helper_name.clone(), parameter_types(&ctor.parameters), TypeDef::VOID),
                ctor.parameters
                    .iter()
                    .map(|p| ExpressionDef::param(p.name.clone(), p.ty.clone()))
                    .collect(),
            )
            .as_statement();
        constructors.push(synthetic_constructor(&ctor.parameters).with_statement(call));

        let mut helper = MethodDef::new(helper_name, TypeDef::VOID)
            .with_modifiers(&[Modifier::Private, Modifier::Synthetic])
            .with_statements(ctor.statements.clone());
        helper.parameters = ctor.parameters.clone();
        helper.varargs = ctor.varargs;
        helpers.push(helper);
    }

    let mut fields = Vec::with_capacity(def.constants.len() + def.fields.len() + 1);
    for (ordinal, constant) in def.constants.iter().enumerate() {
        let ordinal = i32::try_from(ordinal)
            .map_err(|_| LowerError::codegen(format!("too many constants in enum {}", def.name)))?;
        let selected = select_constructor(&def.name, constant, &declared)?;
        let mut parameters = vec![TypeDef::string(), TypeDef::INT];
        parameters.extend(selected.map(|c| parameter_types(&c.parameters)).unwrap_or_default());
        let mut args = vec![ExpressionDef::string(constant.name.clone()), ExpressionDef::int(ordinal)];
        args.extend(constant.args.iter().cloned());
        fields.push(
            FieldDef::new(constant.name.clone(), this_type.clone())
                .with_modifiers(&[Modifier::Public, Modifier::Static, Modifier::Final, Modifier::Enum])
                .with_initializer(ExpressionDef::new_instance(class_type.clone(), parameters, args)),
        );
    }
    fields.push(
        FieldDef::new(VALUES_FIELD, array_type.clone())
            .with_modifiers(&[Modifier::Private, Modifier::Static, Modifier::Final, Modifier::Synthetic])
            .with_initializer(ExpressionDef::invoke_static(
                class_type.clone(),
                MethodSig::new(VALUES_FACTORY, Vec::new(), array_type.clone()),
                Vec::new(),
            )),
    );
    fields.extend(def.fields);

    let constants = def
        .constants
        .iter()
        .map(|c| ExpressionDef::static_field(this_type.clone(), c.name.clone(), this_type.clone()))
        .collect();
    let values_factory = MethodDef::new(VALUES_FACTORY, array_type.clone())
        .with_modifiers(&[Modifier::Private, Modifier::Static, Modifier::Synthetic])
        .with_statement(ExpressionDef::array_of(this_type.clone(), constants).returning());

    let values = MethodDef::new("values", array_type.clone())
        .with_modifiers(&[Modifier::Public, Modifier::Static])
        .with_statement(
            ExpressionDef::static_field(this_type.clone(), VALUES_FIELD, array_type.clone())
                .invoke(MethodSig::new("clone", Vec::new(), TypeDef::object()), Vec::new())
                .cast(array_type.clone())
                .returning(),
        );

    let enum_type = ClassTypeDef::new("java.lang.Enum");
    let value_of = MethodDef::new("valueOf", this_type.clone())
        .with_modifiers(&[Modifier::Public, Modifier::Static])
        .with_parameter("name", TypeDef::string())
        .with_statement(
            ExpressionDef::invoke_static(
                enum_type.clone(),
                MethodSig::new(
                    "valueOf",
                    vec![TypeDef::class("java.lang.Class"), TypeDef::string()],
                    TypeDef::Class(enum_type),
                ),
                vec![
                    ExpressionDef::class_literal(this_type.clone()),
                    ExpressionDef::param("name", TypeDef::string()),
                ],
            )
            .cast(this_type)
            .returning(),
        );

    let mut all_methods = Vec::with_capacity(constructors.len() + helpers.len() + methods.len() + 3);
    all_methods.push(values);
    all_methods.push(value_of);
    all_methods.extend(constructors);
    all_methods.extend(helpers);
    all_methods.extend(methods);
    all_methods.push(values_factory);

    let mut modifiers = def.modifiers;
    modifiers.insert(Modifier::Final);
    modifiers.insert(Modifier::Enum);

    Ok(ClassDef {
        name: def.name,
        modifiers,
        superclass: Some(ClassTypeDef::new("java.lang.Enum")),
        superinterfaces: def.superinterfaces,
        fields,
        methods: all_methods,
        properties: def.properties,
        static_initializer: None,
        inner_types: def.inner_types,
        record_components: Vec::new(),
        synthetic: def.synthetic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn method_names(class: &ClassDef) -> Vec<&str> {
        class.methods.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn plain_enum_gets_javac_members() {
        let mut def = EnumDef::new("demo.Color");
        def.constants = vec![EnumConstantDef::new("RED"), EnumConstantDef::new("GREEN")];
        let class = desugar_enum(def).unwrap();

        assert_eq!(class.superclass, Some(ClassTypeDef::new("java.lang.Enum")));
        assert!(class.modifiers.contains(&Modifier::Enum));
        assert!(class.modifiers.contains(&Modifier::Final));
        let fields: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["RED", "GREEN", "$VALUES"]);
        assert!(class.fields[0].modifiers.contains(&Modifier::Enum));
        assert_eq!(method_names(&class), vec!["values", "valueOf", "<init>", "$values"]);

        let ctor = &class.methods[2];
        assert!(ctor.modifiers.contains(&Modifier::Private));
        assert_eq!(ctor.parameter_types(), vec![TypeDef::string(), TypeDef::INT]);
    }

    #[test]
    fn constructor_bodies_move_to_helpers() {
        let mut def = EnumDef::new("demo.Planet");
        def.constants = vec![EnumConstantDef::with_args("EARTH", vec![ExpressionDef::double(5.97)])];
        def.fields.push(FieldDef::new("mass", TypeDef::DOUBLE).with_modifiers(&[Modifier::Private]));
        def.methods.push(
            MethodDef::constructor()
                .with_parameter("mass", TypeDef::DOUBLE)
                .with_statement(StatementDef::put_field(
                    ExpressionDef::this(),
                    "mass",
                    TypeDef::DOUBLE,
                    ExpressionDef::param("mass", TypeDef::DOUBLE),
                )),
        );
        let class = desugar_enum(def).unwrap();
        assert_eq!(
            method_names(&class),
            vec!["values", "valueOf", "<init>", "$constructor0", "$values"]
        );
        let ctor = &class.methods[2];
        assert_eq!(
            ctor.parameter_types(),
            vec![TypeDef::string(), TypeDef::INT, TypeDef::DOUBLE]
        );
        assert_eq!(ctor.statements.len(), 2);
        let ExpressionDef::NewInstance { parameters, args, .. } = class.fields[0].initializer.as_ref().unwrap() else {
            panic!("constant is not initialized with a constructor call");
        };
        assert_eq!(parameters.len(), 3);
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn constant_arguments_need_a_constructor() {
        let mut def = EnumDef::new("demo.Broken");
        def.constants = vec![EnumConstantDef::with_args("A", vec![ExpressionDef::int(1)])];
        assert!(matches!(
            desugar_enum(def),
            Err(LowerError::TypeContractViolation { .. })
        ));
    }
}
