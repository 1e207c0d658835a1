//! Import resolution tests
//!
//! Modules live in temp directories that double as the search path.

use almac::Interp;
use alma_runtime::value::Value;
use alma_runtime::Stack;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

/// A temp module directory and an interpreter whose search path is it.
fn fixture(modules: &[(&str, &str)]) -> (TempDir, Interp) {
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in modules {
        fs::write(dir.path().join(name), source).unwrap();
    }
    let interp = Interp::new(dir.path().display().to_string()).unwrap();
    (dir, interp)
}

#[test]
fn test_import_with_alias_prefixes_names() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 42 ]\n")]);
    interp
        .compile_source("import \"m.alma\" as q", false)
        .unwrap();

    // q.foo resolves...
    interp.compile_source("r = [ q.foo ]", false).unwrap();
    // ...the unqualified name does not.
    let err = interp.compile_source("s = [ foo ]", false).unwrap_err();
    assert!(err.contains("unknown word 'foo'"));

    // And calling through the prefix reaches the module's definition.
    let mut stack = Stack::new();
    let id = interp.find_func("q.foo").unwrap();
    interp.eval_func(id, &mut stack);
    assert_eq!(stack.peek(0), Some(&Value::Int(42)));
}

#[test]
fn test_wildcard_import_uses_module_basename() {
    let (_dir, mut interp) = fixture(&[("geometry.alma", "area = [ * ]\n")]);
    let mut stack = Stack::new();
    interp
        .run_source("import geometry\nmain = [ 6 7 geometry.area ]", &mut stack)
        .unwrap();
    assert_eq!(stack.peek(0), Some(&Value::Int(42)));
}

#[test]
fn test_import_appends_extension_when_missing() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 1 ]\n")]);
    interp.compile_source("import m", false).unwrap();
    assert!(interp.find_func("m.foo").is_some());
}

#[test]
fn test_just_string_import_without_alias_stays_unprefixed() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 7 ]\n")]);
    interp.compile_source("import \"m.alma\"", false).unwrap();
    assert!(interp.find_func("foo").is_some());
    assert!(interp.find_func("m.foo").is_none());
}

#[test]
fn test_explicit_name_list() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 1 ]\nbar = [ 2 ]\n")]);
    interp.compile_source("import m ( foo )", false).unwrap();
    // Listed names come in unprefixed; unlisted ones don't come at all.
    assert!(interp.find_func("foo").is_some());
    assert!(interp.find_func("bar").is_none());
    assert!(interp.find_func("m.bar").is_none());
}

#[test]
fn test_explicit_name_list_with_alias() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 1 ]\n")]);
    interp
        .compile_source("import m ( foo ) as q", false)
        .unwrap();
    assert!(interp.find_func("q.foo").is_some());
    assert!(interp.find_func("foo").is_none());
}

#[test]
fn test_missing_name_in_list_is_not_fatal() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 1 ]\n")]);
    // `nope` logs a diagnostic and is skipped; the import succeeds.
    interp
        .compile_source("import m ( foo nope )", false)
        .unwrap();
    assert!(interp.find_func("foo").is_some());
    assert!(interp.find_func("nope").is_none());
}

#[test]
fn test_missing_module_is_compile_fail() {
    let (_dir, mut interp) = fixture(&[]);
    let err = interp.compile_source("import nowhere", false).unwrap_err();
    assert!(err.contains("couldn't find 'nowhere.alma'"));
}

#[test]
fn test_module_cannot_see_importer_locals() {
    let (_dir, mut interp) = fixture(&[("m.alma", "peek = [ secret ]\n")]);
    interp.compile_source("secret = [ 1 ]", false).unwrap();
    // The module compiles against the lib scope only, so `secret` is
    // unknown there even though the importer defines it.
    let err = interp.compile_source("import m", false).unwrap_err();
    assert!(err.contains("unknown word 'secret'"));
}

#[test]
fn test_module_words_call_each_other() {
    let (_dir, mut interp) = fixture(&[("m.alma", "base = [ 40 ]\nanswer = [ base 2 + ]\n")]);
    let mut stack = Stack::new();
    interp
        .run_source("import m\nmain = [ m.answer ]", &mut stack)
        .unwrap();
    assert_eq!(stack.peek(0), Some(&Value::Int(42)));
}

#[test]
fn test_wildcard_skips_entries_the_module_imported() {
    let (_dir, mut interp) = fixture(&[
        ("m.alma", "foo = [ 42 ]\n"),
        ("m2.alma", "import m\nbaz = [ m.foo 1 + ]\n"),
    ]);
    interp.compile_source("import m2", false).unwrap();
    // m2's own word is re-exported...
    assert!(interp.find_func("m2.baz").is_some());
    // ...but the entry m2 itself imported is not.
    assert!(interp.find_func("m2.m.foo").is_none());

    let mut stack = Stack::new();
    let id = interp.find_func("m2.baz").unwrap();
    interp.eval_func(id, &mut stack);
    assert_eq!(stack.peek(0), Some(&Value::Int(43)));
}

#[test]
fn test_duplicate_import_name_is_compile_fail() {
    let (_dir, mut interp) = fixture(&[("m.alma", "foo = [ 1 ]\n")]);
    interp.compile_source("foo = [ 9 ]", false).unwrap();
    let err = interp
        .compile_source("import m ( foo )", false)
        .unwrap_err();
    assert!(err.contains("duplicate definition of 'foo'"));
}

#[test]
fn test_imported_words_close_over_module_words() {
    // A module word returning a quotation that uses another module word.
    let (_dir, mut interp) = fixture(&[(
        "m.alma",
        "inc = [ 1 + ]\nmake = [ n -> [ n inc ] ]\n",
    )]);
    let mut stack = Stack::new();
    interp
        .run_source("import m\nmain = [ 5 m.make apply ]", &mut stack)
        .unwrap();
    assert_eq!(stack.peek(0), Some(&Value::Int(6)));
}

#[test]
#[serial]
fn test_search_path_comes_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("envmod.alma"), "foo = [ 11 ]\n").unwrap();

    let path = dir.path().display().to_string();
    unsafe { std::env::set_var("ALMA_PATH", &path) };
    let mut interp = Interp::from_env().unwrap();
    unsafe { std::env::remove_var("ALMA_PATH") };

    assert_eq!(interp.search_path, path);
    interp.compile_source("import envmod", false).unwrap();
    assert!(interp.find_func("envmod.foo").is_some());
}

#[test]
#[serial]
fn test_search_path_defaults_to_current_directory() {
    unsafe { std::env::remove_var("ALMA_PATH") };
    let interp = Interp::from_env().unwrap();
    assert_eq!(interp.search_path, ".");
}
