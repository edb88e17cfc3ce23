//! Purpose: Execute config files without a PHP install using a small embedded evaluator.
//! Exports: `SandboxRuntime`.
//! Role: Fallback `ScriptRuntime` covering the constructs config files are written with.
//! Invariants: Every `run` gets a fresh `Scope`; nothing leaks between calls.
//! Invariants: Anything outside the supported subset fails with `ExecutionFailed`, never a guess.
//! Notes: Supported: `define`, assignments, `if`/`elseif`/`else`, `require`/`include` (+`_once`),
//! `return`, scalar expressions, and a fixed set of builtin functions.
use std::path::{Path, PathBuf};

use serde_json::Map;

use crate::core::error::Error;
use crate::core::snapshot::EnvironmentSnapshot;

use super::{ExecutionTrace, ScriptRuntime};

mod eval;
mod value;

use eval::Interpreter;
use value::Value;

const MAX_INCLUDE_DEPTH: usize = 32;

/// Bindings visible to one execution.
#[derive(Debug)]
struct Scope {
    constants: Vec<(String, Value)>,
    variables: Vec<(String, Value)>,
    included: Vec<PathBuf>,
    warnings: Vec<String>,
    depth: usize,
}

impl Scope {
    fn new() -> Self {
        let predefined = [
            ("PHP_EOL", Value::Str("\n".to_string())),
            ("PHP_INT_MAX", Value::Int(i64::MAX)),
            ("PHP_INT_MIN", Value::Int(i64::MIN)),
            ("PHP_INT_SIZE", Value::Int(8)),
            (
                "DIRECTORY_SEPARATOR",
                Value::Str(std::path::MAIN_SEPARATOR.to_string()),
            ),
            ("E_ERROR", Value::Int(1)),
            ("E_WARNING", Value::Int(2)),
            ("E_PARSE", Value::Int(4)),
            ("E_NOTICE", Value::Int(8)),
            ("E_USER_ERROR", Value::Int(256)),
            ("E_USER_WARNING", Value::Int(512)),
            ("E_USER_NOTICE", Value::Int(1024)),
            ("E_STRICT", Value::Int(2048)),
            ("E_DEPRECATED", Value::Int(8192)),
            ("E_USER_DEPRECATED", Value::Int(16384)),
            ("E_ALL", Value::Int(32767)),
        ];
        Self {
            constants: predefined
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            variables: Vec::new(),
            included: Vec::new(),
            warnings: Vec::new(),
            depth: 0,
        }
    }

    fn constant(&self, name: &str) -> Option<&Value> {
        lookup(&self.constants, name)
    }

    fn define(&mut self, name: &str, value: Value) {
        self.constants.push((name.to_string(), value));
    }

    fn variable(&self, name: &str) -> Option<&Value> {
        lookup(&self.variables, name)
    }

    fn set_variable(&mut self, name: &str, value: Value) {
        match self.variables.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.variables.push((name.to_string(), value)),
        }
    }

    fn snapshot(&self) -> EnvironmentSnapshot {
        let bindings = |entries: &[(String, Value)]| -> Map<String, serde_json::Value> {
            entries
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect()
        };
        EnvironmentSnapshot {
            constants: bindings(&self.constants),
            variables: bindings(&self.variables),
            included_files: self
                .included
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        }
    }
}

fn lookup<'v>(entries: &'v [(String, Value)], name: &str) -> Option<&'v Value> {
    entries
        .iter()
        .find(|(existing, _)| existing == name)
        .map(|(_, value)| value)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SandboxRuntime;

impl SandboxRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptRuntime for SandboxRuntime {
    fn run(&self, path: &Path, source: &str) -> Result<ExecutionTrace, Error> {
        let file = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut scope = Scope::new();
        let before = scope.snapshot();
        Interpreter::new(&mut scope, file, source).run()?;
        for warning in &scope.warnings {
            tracing::warn!(runtime = "sandbox", "{warning}");
        }
        Ok(ExecutionTrace {
            before,
            after: scope.snapshot(),
        })
    }

    fn label(&self) -> &'static str {
        "sandbox"
    }
}
