// Introspection end to end through the sandbox runtime.
use std::fs;

use serde_json::json;
use wpconf::api::{EntryKind, ErrorKind, Introspector, SandboxRuntime};

#[test]
fn entries_cover_variables_constants_and_includes() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("local-config.php"),
        "<?php\ndefine( 'WP_ENVIRONMENT_TYPE', 'local' );\n$local = true;\n",
    )
    .expect("write include");
    let path = temp.path().join("wp-config.php");
    fs::write(
        &path,
        "<?php\n\
         if ( file_exists( __DIR__ . '/local-config.php' ) ) {\n\
         \trequire_once __DIR__ . '/local-config.php';\n\
         }\n\
         define( 'DB_NAME', 'shop' );\n\
         $table_prefix = 'wp_';\n\
         define( 'ABSPATH', dirname( __FILE__ ) . '/' );\n\
         require_once ABSPATH . 'wp-settings.php';\n",
    )
    .expect("write config");

    let entries = Introspector::new(SandboxRuntime::new())
        .list(&path)
        .expect("list");
    let kinds: Vec<(&str, EntryKind)> = entries
        .iter()
        .map(|entry| (entry.name.as_str(), entry.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("local", EntryKind::Variable),
            ("table_prefix", EntryKind::Variable),
            ("WP_ENVIRONMENT_TYPE", EntryKind::Constant),
            ("DB_NAME", EntryKind::Constant),
            ("ABSPATH", EntryKind::Constant),
            ("local-config.php", EntryKind::Includes),
        ]
    );

    let abspath = entries
        .iter()
        .find(|entry| entry.name == "ABSPATH")
        .expect("ABSPATH");
    let dir = fs::canonicalize(temp.path()).expect("canonical dir");
    let expected = format!("{}/", path.parent().expect("parent").display());
    let canonical = format!("{}/", dir.display());
    assert!(abspath.value == json!(expected) || abspath.value == json!(canonical));
}

#[test]
fn execution_errors_surface_instead_of_partial_results() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("wp-config.php");
    fs::write(&path, "<?php\ndefine( 'A', 1 );\nundefined_helper();\n").expect("write");

    let err = Introspector::new(SandboxRuntime::new())
        .list(&path)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
}

#[test]
fn environment_lookups_are_evaluated() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("wp-config.php");
    fs::write(
        &path,
        "<?php\n$home = getenv( 'WPCONF_TEST_SURELY_UNSET_VAR' );\ndefine( 'HAS_HOME', $home !== false );\n",
    )
    .expect("write");

    let entries = Introspector::new(SandboxRuntime::new())
        .list(&path)
        .expect("list");
    assert_eq!(entries[0].name, "home");
    assert_eq!(entries[0].value, json!(false));
    assert_eq!(entries[1].name, "HAS_HOME");
    assert_eq!(entries[1].value, json!(false));
}
