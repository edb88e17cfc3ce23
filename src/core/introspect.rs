//! Purpose: Report what a config file actually defines by executing it between two snapshots.
//! Exports: `Introspector`, `prepare_source`.
//! Role: Read side of the crate; the transformer covers writes.
//! Invariants: Results are `variables ++ constants ++ includes`, each in declaration order.
//! Invariants: An execution failure yields an error, never partial results.
use std::path::Path;

use crate::core::error::Error;
use crate::core::lexer::{self, TokenKind};
use crate::core::runtime::ScriptRuntime;
use crate::core::snapshot::{self, ConfigEntry, EntryKind};
use crate::core::transform::render_value;

pub struct Introspector<R> {
    runtime: R,
}

impl<R: ScriptRuntime> Introspector<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Execute `path` and return every entry it introduced.
    pub fn list(&self, path: &Path) -> Result<Vec<ConfigEntry>, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::from_io(err, path))?;
        let prepared = prepare_source(path, &text);
        let trace = self.runtime.run(path, &prepared)?;

        let mut entries = snapshot::diff(
            &trace.before.variables,
            &trace.after.variables,
            EntryKind::Variable,
            self.runtime.bookkeeping_names(),
        );
        entries.extend(snapshot::diff(
            &trace.before.constants,
            &trace.after.constants,
            EntryKind::Constant,
            &[],
        ));
        entries.extend(snapshot::diff_includes(
            &trace.before.included_files,
            &trace.after.included_files,
        ));
        tracing::debug!(
            runtime = self.runtime.label(),
            entries = entries.len(),
            "introspected config"
        );
        Ok(entries)
    }
}

/// Make a config file safe to execute on its own.
///
/// Lines that bootstrap `wp-settings.php` are dropped, and `__FILE__` / `__DIR__` are replaced
/// with quoted literals so they keep pointing at the real file once the code runs elsewhere.
pub fn prepare_source(path: &Path, text: &str) -> String {
    let file = path.display().to_string();
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .display()
        .to_string();

    let mut out = text.to_string();
    let tokens = lexer::tokenize(text);
    for token in tokens.iter().rev() {
        if token.kind != TokenKind::Ident {
            continue;
        }
        let literal = match token.text(text) {
            magic if magic.eq_ignore_ascii_case("__FILE__") => render_value(&file, false),
            magic if magic.eq_ignore_ascii_case("__DIR__") => render_value(&dir, false),
            _ => continue,
        };
        out.replace_range(token.span.clone(), &literal);
    }

    out.split_inclusive('\n')
        .filter(|line| !requires_settings(line))
        .collect()
}

fn requires_settings(line: &str) -> bool {
    let trimmed = line.trim_start();
    let Some(keyword) = trimmed.get(..7) else {
        return false;
    };
    keyword.eq_ignore_ascii_case("require")
        && trimmed[7..]
            .find("wp-settings.php")
            .is_some_and(|idx| idx > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::runtime::{ExecutionTrace, SandboxRuntime};
    use crate::core::snapshot::EnvironmentSnapshot;
    use serde_json::json;
    use std::fs;

    const CONFIG: &str = "<?php\n\
        define( 'DB_NAME', 'shop' );\n\
        $table_prefix = 'wp_';\n\
        if ( false ) { $X = 1; }\n\
        $Y = 2;\n\
        /* That's all, stop editing! */\n\
        require_once ABSPATH . 'wp-settings.php';\n";

    #[test]
    fn lists_variables_then_constants() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wp-config.php");
        fs::write(&path, CONFIG).expect("write");

        let entries = Introspector::new(SandboxRuntime::new())
            .list(&path)
            .expect("list");
        let names: Vec<(&str, EntryKind)> = entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("table_prefix", EntryKind::Variable),
                ("Y", EntryKind::Variable),
                ("DB_NAME", EntryKind::Constant),
            ]
        );
        assert_eq!(entries[2].value, json!("shop"));
    }

    #[test]
    fn prepare_drops_bootstrap_and_pins_magic_constants() {
        let path = Path::new("/srv/site/wp-config.php");
        let text = "<?php\ndefine('ABSPATH', __DIR__ . '/');\n$f = __FILE__; // __DIR__\n  require_once(ABSPATH . 'wp-settings.php');\n";
        let prepared = prepare_source(path, text);
        assert!(prepared.contains("define('ABSPATH', '/srv/site' . '/');"));
        assert!(prepared.contains("$f = '/srv/site/wp-config.php'; // __DIR__"));
        assert!(!prepared.contains("wp-settings.php"));
    }

    #[test]
    fn prepare_keeps_other_requires() {
        let text = "<?php\nrequire __DIR__ . '/extra.php';\n";
        let prepared = prepare_source(Path::new("/a/wp-config.php"), text);
        assert_eq!(prepared, "<?php\nrequire '/a' . '/extra.php';\n");
    }

    struct FixedRuntime(ExecutionTrace);

    impl ScriptRuntime for FixedRuntime {
        fn run(&self, _path: &Path, _source: &str) -> Result<ExecutionTrace, Error> {
            Ok(self.0.clone())
        }

        fn bookkeeping_names(&self) -> &[&str] {
            &["driver_state"]
        }

        fn label(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn bookkeeping_and_preexisting_names_are_excluded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wp-config.php");
        fs::write(&path, "<?php").expect("write");
        let before = EnvironmentSnapshot {
            variables: json!({"argv": []}).as_object().cloned().expect("object"),
            included_files: vec!["/driver.php".into()],
            ..Default::default()
        };
        let after = EnvironmentSnapshot {
            variables: json!({"argv": [], "driver_state": 1, "kept": true})
                .as_object()
                .cloned()
                .expect("object"),
            constants: json!({"K": 1}).as_object().cloned().expect("object"),
            included_files: vec!["/driver.php".into(), "/srv/extra.php".into()],
        };
        let entries = Introspector::new(FixedRuntime(ExecutionTrace { before, after }))
            .list(&path)
            .expect("list");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["kept", "K", "extra.php"]);
        assert_eq!(entries[2].kind, EntryKind::Includes);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Introspector::new(SandboxRuntime::new())
            .list(Path::new("/nonexistent/wpconf/wp-config.php"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
