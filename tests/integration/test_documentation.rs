//! Documentation views of the fixture package.

use crate::common::{TestProject, tpkg};

#[test]
fn test_synopsis_and_package_doc() {
    let package = tpkg();
    assert_eq!(
        package.synopsis().unwrap(),
        "Package tpkg is used to exercise package introspection."
    );
    let docs = package.docs().unwrap();
    assert!(docs.package_doc().ends_with("The package is never compiled.\n"));
    assert_eq!(docs.package().import_path, "example.com/tpkg");
}

#[test]
fn test_grouped_values() {
    let docs = tpkg().docs().unwrap();

    let consts = docs.constants();
    assert_eq!(consts.len(), 1);
    assert_eq!(
        consts[0].names,
        vec!["ConstantOne", "ConstantTwo", "ConstantThree"]
    );
    assert_eq!(consts[0].doc, "Constants are grouped together in one block.\n");

    let vars = docs.variables();
    assert_eq!(vars.len(), 1);
    assert_eq!(
        vars[0].names,
        vec!["VariableOne", "VariableTwo", "VariableThree"]
    );
}

#[test]
fn test_types_collect_constructors_values_and_methods() {
    let docs = tpkg().docs().unwrap();
    let names: Vec<&str> = docs.types().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Mode", "PublicStruct"]);

    let mode = &docs.types()[0];
    assert_eq!(mode.consts.len(), 1);
    assert_eq!(mode.consts[0].names, vec!["ModeRead", "ModeWrite", "ModeExec"]);
    assert_eq!(mode.methods.len(), 1);
    assert_eq!(mode.methods[0].recv.as_deref(), Some("Mode"));

    let public = &docs.types()[1];
    assert_eq!(public.doc, "PublicStruct amet ultricies massa.\n");
    let ctors: Vec<&str> = public.funcs.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(ctors, vec!["NewPublicStruct", "Open"]);
    assert_eq!(public.methods.len(), 6);

    let funcs: Vec<&str> = docs.functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(funcs, vec!["FuncOne", "FuncThree", "FuncTwo"]);
}

#[test]
fn test_notes() {
    let docs = tpkg().docs().unwrap();
    let bugs = docs.notes("BUG");
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].uid, "tpkg");
    assert!(bugs[0].body.starts_with("HELLO is not a greeting"));

    let todos = docs.notes("TODO");
    assert_eq!(todos.len(), 1);
    assert!(todos[0].body.starts_with("WORLD should be configurable"));

    assert!(docs.notes("FIXME").is_empty());
    let tags: Vec<&str> = docs.all_notes().keys().map(String::as_str).collect();
    assert_eq!(tags, vec!["BUG", "TODO"]);
}

#[test]
fn test_examples_in_source_order() {
    let docs = tpkg().docs().unwrap();
    let names: Vec<&str> = docs.examples().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["PublicStruct", "PublicStruct_MethodTwo", "FuncOne"]
    );

    let first = &docs.examples()[0];
    assert_eq!(first.output, "hello\n");
    assert!(!first.unordered);
    assert!(first.code.contains("fmt.Println(s.ExportedStr)"));
    assert!(!first.code.contains("Output:"));

    let second = &docs.examples()[1];
    assert!(second.unordered);
    assert_eq!(second.output, "b\na\n");
    assert_eq!(second.suffix, "");

    assert!(!docs.examples()[2].has_output());
}

#[test]
fn test_file_names() {
    let package = tpkg();
    assert_eq!(
        package.files().names().unwrap(),
        vec![
            "doc.go",
            "example_test.go",
            "tpkg.go",
            "tpkg_private.go",
            "tpkg_test.go",
        ]
    );
    let paths = package.files().paths().unwrap();
    assert!(paths.iter().all(|p| p.starts_with(package.dir())));
}

#[test]
fn test_documentation_ignores_test_declarations() {
    let project = TestProject::new();
    project.add_file("p.go", "// Package p has one function.\npackage p\n\n// F is documented.\nfunc F() {}\n");
    project.add_file(
        "p_test.go",
        "package p\n\n// G lives in a test file.\nfunc G() {}\n\nfunc ExampleF() {\n\tF()\n\t// Output:\n}\n",
    );
    let docs = project.import().unwrap().docs().unwrap();
    let funcs: Vec<&str> = docs.functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(funcs, vec!["F"]);
    assert_eq!(docs.examples().len(), 1);
    assert!(docs.examples()[0].empty_output);
    assert_eq!(docs.synopsis(), "Package p has one function.");
}
