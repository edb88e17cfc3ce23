// Runs the config file through the host PHP interpreter and reads back both snapshots.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::error::{Error, ErrorKind};

use super::{ExecutionTrace, ScriptRuntime};

const EXECUTION_FAILED_STATUS: i32 = 70;

// Snapshots are taken at global scope so `get_defined_vars()` sees the config's variables.
// Output printed by the config file itself is buffered and thrown away.
const DRIVER: &str = r#"
$__wpconf_code = stream_get_contents(STDIN);
$__wpconf_before = array(
    'constants' => (object) get_defined_constants(),
    'variables' => (object) get_defined_vars(),
    'included_files' => get_included_files(),
);
ob_start();
try {
    eval('?>' . $__wpconf_code);
} catch (\Throwable $__wpconf_error) {
    ob_end_clean();
    fwrite(STDERR, get_class($__wpconf_error) . ': ' . $__wpconf_error->getMessage() . ' on line ' . $__wpconf_error->getLine() . "\n");
    exit(70);
}
ob_end_clean();
$__wpconf_after = array(
    'constants' => (object) get_defined_constants(),
    'variables' => (object) get_defined_vars(),
    'included_files' => get_included_files(),
);
echo json_encode(
    array('before' => $__wpconf_before, 'after' => $__wpconf_after),
    JSON_PARTIAL_OUTPUT_ON_ERROR | JSON_UNESCAPED_SLASHES
);
"#;

const BOOKKEEPING: &[&str] = &[
    "__wpconf_code",
    "__wpconf_before",
    "__wpconf_after",
    "__wpconf_error",
];

#[derive(Clone, Debug)]
pub struct PhpRuntime {
    binary: PathBuf,
}

impl PhpRuntime {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Locate `php` on `PATH`.
    pub fn detect() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(if cfg!(windows) { "php.exe" } else { "php" }))
            .find(|candidate| candidate.is_file())
            .map(Self::new)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl ScriptRuntime for PhpRuntime {
    fn run(&self, path: &Path, source: &str) -> Result<ExecutionTrace, Error> {
        let spawn_err = |err: std::io::Error| {
            Error::new(ErrorKind::ExecutionFailed)
                .with_message(format!("failed to start {}", self.binary.display()))
                .with_hint("Install the PHP CLI, pass --php <binary>, or use --runtime sandbox.")
                .with_source(err)
        };

        let mut child = Command::new(&self.binary)
            .args(["-d", "display_errors=stderr", "-d", "log_errors=0", "-r", DRIVER])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // A write failure usually means php exited early; its status explains why.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(source.as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output().map_err(spawn_err)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            let message = match output.status.code() {
                Some(EXECUTION_FAILED_STATUS) => detail,
                code => format!("php exited with {code:?}: {detail}"),
            };
            return Err(Error::new(ErrorKind::ExecutionFailed)
                .with_message(message)
                .with_path(path));
        }
        written.map_err(spawn_err)?;

        serde_json::from_slice(&output.stdout).map_err(|err| {
            Error::new(ErrorKind::ExecutionFailed)
                .with_message("php produced unreadable snapshot output")
                .with_path(path)
                .with_source(err)
        })
    }

    fn bookkeeping_names(&self) -> &[&str] {
        BOOKKEEPING
    }

    fn label(&self) -> &'static str {
        "php"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_execution_failure() {
        let runtime = PhpRuntime::new("/nonexistent/wpconf-test/php");
        let err = runtime
            .run(Path::new("wp-config.php"), "<?php $a = 1;")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
        assert!(err.hint().is_some());
    }

    #[test]
    fn bookkeeping_covers_driver_variables() {
        let runtime = PhpRuntime::new("php");
        for name in ["__wpconf_code", "__wpconf_before", "__wpconf_after"] {
            assert!(runtime.bookkeeping_names().contains(&name));
            assert!(DRIVER.contains(&format!("${name}")));
        }
    }
}
