mod common;

use std::io::Cursor;
use std::path::Path;
use std::process::Command;

use binrw::BinRead;
use classgen::attribute_info::{AttributeInfo, CodeAttribute};
use classgen::constant_info::ConstantInfo;
use classgen::field_info::FieldAccessFlags;
use classgen::model::{
    shared, ClassDef, ClassTypeDef, EnumConstantDef, EnumDef, ExpressionDef, InterfaceDef, MethodDef, MethodSig,
    Modifier, ObjectDef, ParameterDef, PropertyDef, RecordDef, StatementDef, SwitchCase, TypeDef,
};
use classgen::{ClassAccessFlags, ClassFile, ClassWriter, GeneratedClass, WriterOptions};
use pretty_assertions::assert_eq;

fn utf8(class_file: &ClassFile, index: u16) -> String {
    match &class_file.const_pool[usize::from(index) - 1] {
        ConstantInfo::Utf8(c) => c.to_string_lossy(),
        other => panic!("entry {} is not utf8: {:?}", index, other),
    }
}

fn attribute_names(class_file: &ClassFile, attributes: &[AttributeInfo]) -> Vec<String> {
    attributes
        .iter()
        .map(|a| utf8(class_file, a.attribute_name_index))
        .collect()
}

fn method_names(class_file: &ClassFile) -> Vec<String> {
    class_file
        .methods
        .iter()
        .map(|m| utf8(class_file, m.name_index))
        .collect()
}

fn code_of(class_file: &ClassFile, method: &str) -> CodeAttribute {
    let info = class_file
        .methods
        .iter()
        .find(|m| utf8(class_file, m.name_index) == method)
        .unwrap_or_else(|| panic!("no method {}", method));
    let code = info
        .attributes
        .iter()
        .find(|a| utf8(class_file, a.attribute_name_index) == "Code")
        .expect("method has no Code attribute");
    CodeAttribute::read_be(&mut Cursor::new(&code.info)).unwrap()
}

fn write(object: ObjectDef) -> Vec<GeneratedClass> {
    ClassWriter::new(WriterOptions::default()).write(&object).unwrap()
}

fn greeter() -> ClassDef {
    let mut class = ClassDef::new("demo.Greeter");
    class.modifiers.insert(Modifier::Public);
    class.methods.push(
        MethodDef::new("sign", TypeDef::INT)
            .with_modifiers(&[Modifier::Public, Modifier::Static])
            .with_parameter("n", TypeDef::INT)
            .with_statement(StatementDef::if_else(
                ExpressionDef::param("n", TypeDef::INT).compare(classgen::model::CompareOp::Lt, ExpressionDef::int(0)),
                ExpressionDef::int(-1).returning(),
                ExpressionDef::int(1).returning(),
            )),
    );
    class
}

#[test]
fn plain_class_targets_the_frameless_version() {
    let classes = write(ObjectDef::Class(greeter()));
    assert_eq!(classes.len(), 1);
    let bytes = classes[0].to_bytes().unwrap();
    assert_eq!(&bytes[..4], &[0xca, 0xfe, 0xba, 0xbe]);
    assert_eq!(&bytes[6..8], &[0, 49]);

    let class_file = &classes[0].class_file;
    assert_eq!(classes[0].name, "demo/Greeter");
    assert_eq!(classes[0].file_name(), "demo/Greeter.class");
    assert!(class_file.access_flags.contains(ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER));
    assert_eq!(method_names(class_file), vec!["<init>", "sign"]);

    let code = code_of(class_file, "sign");
    let names = attribute_names(class_file, &code.attributes);
    assert!(!names.contains(&"StackMapTable".to_string()));
    assert!(names.contains(&"LocalVariableTable".to_string()));
}

#[test]
fn explicit_target_version_adds_frames() {
    let options = WriterOptions {
        target_version: Some(52),
        ..WriterOptions::default()
    };
    let classes = ClassWriter::new(options).write(&ObjectDef::Class(greeter())).unwrap();
    let class_file = &classes[0].class_file;
    assert_eq!(class_file.major_version, 52);
    let code = code_of(class_file, "sign");
    assert!(attribute_names(class_file, &code.attributes).contains(&"StackMapTable".to_string()));
}

#[test]
fn interface_with_default_method_targets_java_8() {
    let mut interface = InterfaceDef::new("demo.Shape");
    interface.modifiers.insert(Modifier::Public);
    interface.methods.push(MethodDef::new("area", TypeDef::INT));
    interface.methods.push(
        MethodDef::new("doubled", TypeDef::INT)
            .with_modifiers(&[Modifier::Default])
            .with_statement(
                ExpressionDef::this()
                    .invoke(MethodSig::new("area", Vec::new(), TypeDef::INT), Vec::new())
                    .math(classgen::model::MathOp::Mul, ExpressionDef::int(2))
                    .returning(),
            ),
    );
    let classes = write(ObjectDef::Interface(interface));
    let class_file = &classes[0].class_file;
    assert_eq!(class_file.major_version, 52);
    assert!(class_file
        .access_flags
        .contains(ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT));
    assert_eq!(method_names(class_file), vec!["area", "doubled"]);
    assert!(class_file.methods[0].attributes.is_empty());
}

#[test]
fn inner_types_are_written_after_their_outer_type() {
    let mut outer = ClassDef::new("demo.Outer");
    outer.modifiers.insert(Modifier::Public);
    let mut inner = ClassDef::new("Inner");
    inner.modifiers.insert(Modifier::Public);
    inner.modifiers.insert(Modifier::Static);
    outer.inner_types.push(ObjectDef::Class(inner));

    let classes = write(ObjectDef::Class(outer));
    let names: Vec<_> = classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["demo/Outer", "demo/Outer$Inner"]);
    for class in &classes {
        let class_file = &class.class_file;
        assert!(attribute_names(class_file, &class_file.attributes).contains(&"InnerClasses".to_string()));
    }
}

#[test]
fn enums_are_flagged_and_get_their_members() {
    let mut color = EnumDef::new("demo.Color");
    color.modifiers.insert(Modifier::Public);
    for name in ["RED", "GREEN", "BLUE"] {
        color.constants.push(EnumConstantDef::new(name));
    }
    let classes = write(ObjectDef::Enum(color));
    let class_file = &classes[0].class_file;
    assert!(class_file
        .access_flags
        .contains(ClassAccessFlags::ENUM | ClassAccessFlags::FINAL));
    let enum_fields = class_file
        .fields
        .iter()
        .filter(|f| f.access_flags.contains(FieldAccessFlags::ENUM))
        .count();
    assert_eq!(enum_fields, 3);
    let methods = method_names(class_file);
    for expected in ["values", "valueOf", "<init>", "<clinit>"] {
        assert!(methods.iter().any(|m| m == expected), "missing {}", expected);
    }
}

#[test]
fn records_carry_the_record_attribute() {
    let mut point = RecordDef::new("demo.Point");
    point.modifiers.insert(Modifier::Public);
    point.components.push(ParameterDef::new("x", TypeDef::INT));
    point.components.push(ParameterDef::new("y", TypeDef::INT));
    let classes = write(ObjectDef::Record(point));
    let class_file = &classes[0].class_file;
    assert!(attribute_names(class_file, &class_file.attributes).contains(&"Record".to_string()));
    match &class_file.const_pool[usize::from(class_file.super_class) - 1] {
        ConstantInfo::Class(c) => assert_eq!(utf8(class_file, c.name_index), "java/lang/Record"),
        other => panic!("super class entry is {:?}", other),
    }
    assert_eq!(
        method_names(class_file),
        vec!["<init>", "x", "y", "equals", "hashCode", "toString"]
    );
}

#[test]
fn properties_become_fields_and_accessors() {
    let mut bean = ClassDef::new("demo.Bean");
    bean.properties.push(PropertyDef::new("count", TypeDef::INT));
    let classes = write(ObjectDef::Class(bean));
    let class_file = &classes[0].class_file;
    assert_eq!(class_file.fields.len(), 1);
    assert_eq!(utf8(class_file, class_file.fields[0].name_index), "count");
    assert_eq!(method_names(class_file), vec!["<init>", "getCount", "setCount"]);
}

#[test]
fn abstract_method_with_a_body_is_rejected() {
    let mut class = ClassDef::new("demo.Broken");
    class.modifiers.insert(Modifier::Abstract);
    class.methods.push(
        MethodDef::new("run", TypeDef::VOID)
            .with_modifiers(&[Modifier::Abstract])
            .with_statement(StatementDef::return_void()),
    );
    let result = ClassWriter::new(WriterOptions::default()).write(&ObjectDef::Class(class));
    assert!(matches!(result, Err(classgen::LowerError::TypeContractViolation { .. })));
}

fn save_all(classes: &[GeneratedClass], dir: &Path) {
    for class in classes {
        let path = dir.join(class.file_name());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, class.to_bytes().unwrap()).unwrap();
    }
}

#[test]
fn classes_save_under_their_package_path() {
    let dir = tempfile::tempdir().unwrap();
    save_all(&write(ObjectDef::Class(greeter())), dir.path());
    let written = std::fs::read(dir.path().join("demo").join("Greeter.class")).unwrap();
    assert_eq!(&written[..4], &[0xca, 0xfe, 0xba, 0xbe]);
}

fn println(value: ExpressionDef) -> StatementDef {
    let out = ExpressionDef::static_field(TypeDef::class("java.lang.System"), "out", TypeDef::class("java.io.PrintStream"));
    let ty = value.ty();
    out.invoke(MethodSig::new("println", vec![ty], TypeDef::VOID), vec![value])
        .as_statement()
}

/// `Main` with a nested `Color` enum, printing an int switch, an enum
/// ordinal and a string switch.
fn runnable_main() -> ObjectDef {
    let mut color = EnumDef::new("Color");
    color.modifiers.insert(Modifier::Public);
    for name in ["RED", "GREEN", "BLUE"] {
        color.constants.push(EnumConstantDef::new(name));
    }

    let int_switch = ExpressionDef::switch(
        ExpressionDef::int(3),
        TypeDef::INT,
        vec![
            SwitchCase::new(1, shared(ExpressionDef::int(10))),
            SwitchCase::new(3, shared(ExpressionDef::int(30))),
        ],
        ExpressionDef::int(-1),
    );
    let color_type = ClassTypeDef::new("demo.Main$Color");
    let ordinal = ExpressionDef::invoke_static(
        color_type.clone(),
        MethodSig::new("valueOf", vec![TypeDef::string()], color_type.as_type()),
        vec![ExpressionDef::string("GREEN")],
    )
    .invoke(MethodSig::new("ordinal", Vec::new(), TypeDef::INT), Vec::new());
    let string_switch = ExpressionDef::switch(
        ExpressionDef::string("BB"),
        TypeDef::INT,
        vec![
            SwitchCase::new("Aa", shared(ExpressionDef::int(1))),
            SwitchCase::new("BB", shared(ExpressionDef::int(2))),
        ],
        ExpressionDef::int(0),
    );

    let mut main = ClassDef::new("demo.Main");
    main.modifiers.insert(Modifier::Public);
    main.methods.push(
        MethodDef::new("main", TypeDef::VOID)
            .with_modifiers(&[Modifier::Public, Modifier::Static])
            .with_parameter("args", TypeDef::array(TypeDef::string(), 1))
            .with_statements(vec![println(int_switch), println(ordinal), println(string_switch)]),
    );
    main.inner_types.push(ObjectDef::Enum(color));
    ObjectDef::Class(main)
}

#[test]
fn generated_classes_run_on_a_jvm() {
    if !common::java_available() {
        eprintln!("skipping: no java on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    save_all(&write(runnable_main()), dir.path());
    let output = Command::new("java")
        .arg("-cp")
        .arg(dir.path())
        .arg("demo.Main")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines, vec!["30", "1", "2"]);
}
