#![cfg(feature = "jar")]

use std::io::Read;

use classgen::jar::JarArchive;
use classgen::model::{ClassDef, ExpressionDef, MethodDef, Modifier, ObjectDef, TypeDef};
use classgen::{ClassWriter, WriterOptions};
use pretty_assertions::assert_eq;

fn hello_classes() -> Vec<classgen::GeneratedClass> {
    let mut class = ClassDef::new("demo.Hello");
    class.modifiers.insert(Modifier::Public);
    class.methods.push(
        MethodDef::new("answer", TypeDef::INT)
            .with_modifiers(&[Modifier::Public, Modifier::Static])
            .with_statement(ExpressionDef::int(42).returning()),
    );
    let mut inner = ClassDef::new("Nested");
    inner.modifiers.insert(Modifier::Static);
    class.inner_types.push(ObjectDef::Class(inner));
    ClassWriter::new(WriterOptions::default())
        .write(&ObjectDef::Class(class))
        .unwrap()
}

#[test]
fn saved_jar_lists_manifest_first() {
    let mut jar = JarArchive::new();
    for class in hello_classes() {
        jar.add_class(&class).unwrap();
    }
    jar.set_main_class("demo/Hello");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.jar");
    jar.save(&path).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["META-INF/MANIFEST.MF", "demo/Hello$Nested.class", "demo/Hello.class"]
    );

    let mut manifest = String::new();
    archive
        .by_name("META-INF/MANIFEST.MF")
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    assert!(manifest.contains("Main-Class: demo.Hello\r\n"));

    let mut class_bytes = Vec::new();
    archive
        .by_name("demo/Hello.class")
        .unwrap()
        .read_to_end(&mut class_bytes)
        .unwrap();
    assert_eq!(Some(class_bytes.as_slice()), jar.get_entry("demo/Hello.class"));
}

#[test]
fn in_memory_jar_is_a_zip() {
    let mut jar = JarArchive::new();
    for class in hello_classes() {
        jar.add_class(&class).unwrap();
    }
    let bytes = jar.to_bytes().unwrap();
    assert_eq!(&bytes[..2], b"PK");
    assert_eq!(jar.entry_names().count(), 2);
}
