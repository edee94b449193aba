//! Method sets and function listings over checked packages.

use crate::common::{TestProject, tpkg};
use srcpkg::methods::reach;
use srcpkg::{PackageError, is_test_name};
use std::collections::BTreeSet;

#[test]
fn test_value_and_pointer_methods_are_merged() {
    let package = tpkg();
    let set = package.method_set("PublicStruct").unwrap();
    assert_eq!(set.name, "PublicStruct");
    assert_eq!(
        set.names(),
        vec![
            "MethodOne",
            "MethodOneP",
            "MethodThree",
            "MethodThreeP",
            "MethodTwo",
            "MethodTwoP",
        ]
    );
    assert!(set.get("MethodOneP").unwrap().has_pointer_receiver());
    assert!(!set.get("MethodOne").unwrap().has_pointer_receiver());

    let three = set.get("MethodThree").unwrap();
    assert_eq!(three.params(), "(int, string)");
    assert_eq!(three.results(), "(string)");
}

#[test]
fn test_method_set_matches_declared_methods() {
    let package = tpkg();
    let docs = package.docs().unwrap();
    for (type_name, declared) in docs.methods_by_type() {
        let set = package.method_set(type_name).unwrap();
        let declared: BTreeSet<&str> = declared.iter().map(|m| m.name.as_str()).collect();
        let resolved: BTreeSet<&str> = set.names().into_iter().collect();
        assert_eq!(declared, resolved, "method set of {type_name}");
    }
}

#[test]
fn test_methods_lists_exported_types_with_methods() {
    let methods = tpkg().methods().unwrap();
    let names: Vec<&str> = methods.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Mode", "PublicStruct"]);
    assert_eq!(methods["Mode"].names(), vec!["String"]);
}

#[test]
fn test_functions_skip_tests_and_examples() {
    let names: Vec<String> = tpkg()
        .functions()
        .unwrap()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["FuncOne", "FuncThree", "FuncTwo", "NewPublicStruct", "Open"]
    );
    assert!(names.iter().all(|name| !is_test_name(name, "Test")));
}

#[test]
fn test_test_like_names_are_filtered() {
    let project = TestProject::new();
    project.add_file(
        "n.go",
        r#"package n

func Test()        {}
func TestFoo()     {}
func Example()     {}
func ExampleBar()  {}
func Testicular()  {}
func Examplary()   {}
func unexported()  {}

type Testing struct{}

func (Testing) Run() {}
"#,
    );
    let package = project.import().unwrap();
    let names: Vec<String> = package
        .functions()
        .unwrap()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names, vec!["Examplary", "Testicular"]);

    for hidden in ["Test", "TestFoo", "Example", "ExampleBar"] {
        assert!(matches!(
            package.method_set(hidden),
            Err(PackageError::NotExported { .. })
        ));
    }
    assert_eq!(package.method_set("Testing").unwrap().names(), vec!["Run"]);
}

#[test]
fn test_promoted_methods() {
    let project = TestProject::new();
    project.add_file(
        "emb.go",
        r#"package emb

type Inner struct{}

func (Inner) Value()    {}
func (*Inner) Pointer() {}

type Outer struct {
	Inner
}

type OuterPtr struct {
	*Inner
}

type Shadow struct {
	Inner
	Value int
}
"#,
    );
    let package = project.import().unwrap();
    assert_eq!(
        package.method_set("Outer").unwrap().names(),
        vec!["Pointer", "Value"]
    );
    assert_eq!(
        package.method_set("OuterPtr").unwrap().names(),
        vec!["Pointer", "Value"]
    );
    assert_eq!(package.method_set("Shadow").unwrap().names(), vec!["Pointer"]);

    let scope = &package.to_types().unwrap().scope;
    let through_value = reach(scope, "Outer", "Pointer");
    assert!(!through_value.value);
    assert!(through_value.pointer);
    let through_pointer = reach(scope, "OuterPtr", "Pointer");
    assert!(through_pointer.value);
    assert!(through_pointer.pointer);
}

#[test]
fn test_types_defined_from_named_types() {
    let project = TestProject::new();
    project.add_file(
        "defs.go",
        r#"package defs

type Inner struct{}

func (Inner) Value()    {}
func (*Inner) Pointer() {}

type S struct {
	Inner
}

type U S

type I interface {
	M()
}

type J I
"#,
    );
    let package = project.import().unwrap();
    assert_eq!(
        package.method_set("U").unwrap().names(),
        vec!["Pointer", "Value"]
    );
    assert_eq!(package.method_set("J").unwrap().names(), vec!["M"]);

    let scope = &package.to_types().unwrap().scope;
    let value = reach(scope, "U", "Value");
    assert!(value.value);
    assert!(value.pointer);
    let pointer = reach(scope, "U", "Pointer");
    assert!(!pointer.value);
    assert!(pointer.pointer);
    let interface = reach(scope, "J", "M");
    assert!(interface.value);
    assert!(!interface.pointer);
}

#[test]
fn test_function_has_an_empty_method_set() {
    let set = tpkg().method_set("FuncOne").unwrap();
    assert!(set.is_empty());
}
