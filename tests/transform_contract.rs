// Transformer contract: edits touch only the targeted statement.
use std::path::PathBuf;

use wpconf::api::{
    AnchorSpec, ConfigTransformer, DefinitionKind, DefinitionValue, EOF_ANCHOR, ErrorKind,
    KindFilter, Placement, TransformOptions,
};

const CONFIG: &str = "<?php\r\n\
/** Database */\r\n\
define(\"DB_NAME\",   \"shop\"); // keep this comment\r\n\
/** Database username */\r\n\
define( 'DB_USER', 'admin' );\r\n\
\t$table_prefix  =  'wp_';\r\n\
/**\r\n * Debugging mode.\r\n */\r\n\
define( 'WP_DEBUG', false ); define( 'SCRIPT_DEBUG', false );\r\n\
/* That's all, stop editing! Happy publishing. */\r\n\
require_once ABSPATH . 'wp-settings.php';\r\n";

fn fixture(text: &str) -> (tempfile::TempDir, PathBuf) {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("wp-config.php");
    std::fs::write(&path, text).expect("write");
    (temp, path)
}

fn read(path: &PathBuf) -> String {
    std::fs::read_to_string(path).expect("read")
}

#[test]
fn update_replaces_only_the_value() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);

    let result = transformer
        .update(DefinitionKind::Constant, "DB_NAME", "blog", &TransformOptions::default())
        .expect("update");
    assert!(!result.created);
    assert_eq!(
        read(&path),
        CONFIG.replace("\"shop\"", "'blog'"),
        "quoting style of the new value is canonical, everything else is untouched"
    );

    transformer
        .update(
            DefinitionKind::Variable,
            "table_prefix",
            "shop_",
            &TransformOptions::default(),
        )
        .expect("update variable");
    assert!(read(&path).contains("\t$table_prefix  =  'shop_';\r\n"));
}

#[test]
fn update_then_restore_round_trips_the_file() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);
    let raw = TransformOptions::default().with_raw(true);

    transformer
        .update(DefinitionKind::Constant, "SCRIPT_DEBUG", "true", &raw)
        .expect("update");
    assert!(read(&path).contains("define( 'WP_DEBUG', false ); define( 'SCRIPT_DEBUG', true );\r\n"));
    transformer
        .update(DefinitionKind::Constant, "SCRIPT_DEBUG", "false", &raw)
        .expect("restore");
    assert_eq!(read(&path), CONFIG);
}

#[test]
fn normalize_rewrites_the_whole_statement() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);
    let options = TransformOptions::default().with_normalize(true);

    transformer
        .update(DefinitionKind::Constant, "DB_NAME", "shop", &options)
        .expect("normalize");
    assert!(read(&path).contains("define('DB_NAME', 'shop'); // keep this comment\r\n"));
}

#[test]
fn add_respects_anchor_placement_and_separator() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);

    let missing = transformer
        .update(DefinitionKind::Constant, "WP_CACHE", "true", &TransformOptions::default())
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert_eq!(read(&path), CONFIG);

    let before = TransformOptions::default().with_raw(true).with_add(true);
    let result = transformer
        .update(DefinitionKind::Constant, "WP_CACHE", "true", &before)
        .expect("add");
    assert!(result.created);
    assert!(read(&path).contains(
        "define('WP_CACHE', true);\n/* That's all, stop editing! Happy publishing. */\r\n"
    ));

    let after = TransformOptions::default().with_add(true).with_anchor(
        AnchorSpec::new("/* That's all")
            .with_placement(Placement::After)
            .with_separator("\r\n"),
    );
    transformer
        .update(DefinitionKind::Variable, "site", "main", &after)
        .expect("add after");
    assert!(read(&path).contains("Happy publishing. */\r\n$site = 'main';\r\nrequire_once"));

    let eof = TransformOptions::default()
        .with_add(true)
        .with_anchor(AnchorSpec::new(EOF_ANCHOR));
    transformer
        .update(DefinitionKind::Constant, "LAST", "x", &eof)
        .expect("append");
    assert!(read(&path).ends_with("'wp-settings.php';\r\ndefine('LAST', 'x');\n"));

    let nowhere = TransformOptions::default()
        .with_add(true)
        .with_anchor(AnchorSpec::new("// not in this file"));
    let err = transformer
        .update(DefinitionKind::Constant, "NOWHERE", "x", &nowhere)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AnchorNotFound);
}

#[test]
fn remove_keeps_neighbours_on_shared_lines() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);

    transformer
        .remove(DefinitionKind::Constant, "SCRIPT_DEBUG")
        .expect("remove");
    assert!(read(&path).contains("define( 'WP_DEBUG', false );\r\n/* That's all"));

    transformer
        .remove(DefinitionKind::Constant, "DB_USER")
        .expect("remove line");
    assert!(!read(&path).contains("DB_USER"));
    assert!(read(&path).contains("/** Database username */\r\n\t$table_prefix"));

    let err = transformer
        .remove(DefinitionKind::Constant, "DB_USER")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn commented_out_definitions_are_invisible() {
    let text = "<?php\n// define( 'WP_HOME', 'http://old' );\n/* $x = 1; */\n# define('Y', 2);\n";
    let (_temp, path) = fixture(text);
    let transformer = ConfigTransformer::new(&path);

    assert!(!transformer.exists(DefinitionKind::Constant, "WP_HOME").expect("exists"));
    assert!(!transformer.exists(DefinitionKind::Variable, "x").expect("exists"));
    assert!(transformer.definitions().expect("definitions").is_empty());
}

#[test]
fn get_reports_raw_and_quoted_values() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);

    let name = transformer
        .get(DefinitionKind::Constant, "DB_NAME")
        .expect("get")
        .expect("defined");
    assert_eq!(name.value, DefinitionValue::Quoted("shop".into()));
    let debug = transformer
        .get(DefinitionKind::Constant, "WP_DEBUG")
        .expect("get")
        .expect("defined");
    assert!(debug.value.is_raw());
    assert_eq!(debug.value.as_str(), "false");
}

#[test]
fn dual_kind_names_are_ambiguous_without_a_filter() {
    let (_temp, path) = fixture("<?php\n$DB_HOST = 'a';\ndefine('DB_HOST', 'b');\n");
    let transformer = ConfigTransformer::new(&path);

    let err = transformer
        .resolve_kind(KindFilter::All, "DB_HOST")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousKind);
    assert_eq!(
        transformer
            .resolve_kind(KindFilter::Variable, "DB_HOST")
            .expect("resolve"),
        Some(DefinitionKind::Variable)
    );
    assert_eq!(
        transformer
            .resolve_kind(KindFilter::All, "MISSING")
            .expect("resolve"),
        None
    );
}

#[test]
fn update_all_applies_every_pair() {
    let (_temp, path) = fixture(CONFIG);
    let transformer = ConfigTransformer::new(&path);
    let options = TransformOptions::default().with_add(true);

    let results = transformer
        .update_all(
            DefinitionKind::Constant,
            &[("DB_USER", "root"), ("AUTH_KEY", "k")],
            &options,
        )
        .expect("update all");
    assert_eq!(results.len(), 2);
    assert!(!results[0].created);
    assert!(results[1].created);
    let text = read(&path);
    assert!(text.contains("define( 'DB_USER', 'root' );"));
    assert!(text.contains("define('AUTH_KEY', 'k');\n/* That's all"));
}

const STOCK: &str = r#"<?php
/**
 * The base configuration for WordPress
 *
 * @package WordPress
 */

// ** Database settings - You can get this info from your web host ** //
/** The name of the database for WordPress */
define( 'DB_NAME', 'database_name_here' );

/** Database charset to use in creating database tables. */
define( 'DB_CHARSET', 'utf8' );

/**#@+
 * Authentication unique keys and salts.
 */
define( 'AUTH_KEY',         'put your unique phrase here' );

/**#@-*/

/* That's all, stop editing! Happy publishing. */
"#;

#[test]
fn doc_commented_definitions_are_updated_in_place() {
    let (_temp, path) = fixture(STOCK);
    let transformer = ConfigTransformer::new(&path);

    let names: Vec<String> = transformer
        .definitions()
        .expect("definitions")
        .into_iter()
        .map(|def| def.name)
        .collect();
    assert_eq!(names, vec!["DB_NAME", "DB_CHARSET", "AUTH_KEY"]);

    let options = TransformOptions::default().with_add(true);
    let result = transformer
        .update(DefinitionKind::Constant, "DB_NAME", "shop", &options)
        .expect("update");
    assert!(!result.created);
    let result = transformer
        .update(DefinitionKind::Constant, "AUTH_KEY", "k", &options)
        .expect("update key");
    assert!(!result.created);
    assert_eq!(
        read(&path),
        STOCK
            .replace("'database_name_here'", "'shop'")
            .replace("'put your unique phrase here'", "'k'")
    );
}

#[test]
fn brace_less_guards_are_edited_in_place() {
    let text = "<?php\nif ( ! defined( 'WP_DEBUG' ) )\n\tdefine( 'WP_DEBUG', false );\n/* That's all, stop editing! */\n";
    let (_temp, path) = fixture(text);
    let transformer = ConfigTransformer::new(&path);

    assert!(transformer.exists(DefinitionKind::Constant, "WP_DEBUG").expect("exists"));
    let options = TransformOptions::default().with_raw(true).with_add(true);
    let result = transformer
        .update(DefinitionKind::Constant, "WP_DEBUG", "true", &options)
        .expect("update");
    assert!(!result.created);
    let after = read(&path);
    assert_eq!(after, text.replace("'WP_DEBUG', false", "'WP_DEBUG', true"));
    assert_eq!(after.matches("define(").count(), 1);
}

#[test]
fn heredoc_bodies_are_not_definitions() {
    let text = "<?php\n$notes = <<<TXT\ndefine('FAKE', 'x');\nTXT;\n/* That's all, stop editing! */\n";
    let (_temp, path) = fixture(text);
    let transformer = ConfigTransformer::new(&path);

    assert!(!transformer.exists(DefinitionKind::Constant, "FAKE").expect("exists"));
    let result = transformer
        .update(
            DefinitionKind::Constant,
            "FAKE",
            "y",
            &TransformOptions::default().with_add(true),
        )
        .expect("add");
    assert!(result.created);
    assert!(read(&path).starts_with("<?php\n$notes = <<<TXT\ndefine('FAKE', 'x');\nTXT;\n"));
    assert!(read(&path).contains("define('FAKE', 'y');\n/* That's all"));
}

#[test]
fn missing_file_is_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let transformer = ConfigTransformer::new(temp.path().join("wp-config.php"));
    let err = transformer.definitions().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
