//! Purpose: Execution contexts that run a config file between two environment snapshots.
//! Exports: `ScriptRuntime`, `ExecutionTrace`, `PhpRuntime`, `SandboxRuntime`, `RuntimeChoice`.
//! Role: The single host dependency of the introspector; one fresh scope per call.
//! Invariants: `before` is captured immediately before and `after` immediately after execution.
//! Invariants: A failed execution yields `ExecutionFailed` and no snapshots.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::Error;
use crate::core::snapshot::EnvironmentSnapshot;

mod php;
mod sandbox;

pub use php::PhpRuntime;
pub use sandbox::SandboxRuntime;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ExecutionTrace {
    pub before: EnvironmentSnapshot,
    pub after: EnvironmentSnapshot,
}

pub trait ScriptRuntime {
    /// Execute `source` (the prepared contents of `path`) in a fresh scope.
    fn run(&self, path: &Path, source: &str) -> Result<ExecutionTrace, Error>;

    /// Variables the runtime itself introduces while snapshotting.
    fn bookkeeping_names(&self) -> &[&str] {
        &[]
    }

    fn label(&self) -> &'static str;
}

impl<R: ScriptRuntime + ?Sized> ScriptRuntime for Box<R> {
    fn run(&self, path: &Path, source: &str) -> Result<ExecutionTrace, Error> {
        (**self).run(path, source)
    }

    fn bookkeeping_names(&self) -> &[&str] {
        (**self).bookkeeping_names()
    }

    fn label(&self) -> &'static str {
        (**self).label()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RuntimeChoice {
    /// The host `php` binary when one is on `PATH`, else the sandbox.
    #[default]
    Auto,
    Php,
    Sandbox,
}

/// Build the runtime for `choice`; `php_binary` overrides the interpreter lookup.
pub fn select(choice: RuntimeChoice, php_binary: Option<PathBuf>) -> Box<dyn ScriptRuntime> {
    let php = || match php_binary.clone() {
        Some(binary) => Some(PhpRuntime::new(binary)),
        None => PhpRuntime::detect(),
    };
    let runtime: Box<dyn ScriptRuntime> = match choice {
        RuntimeChoice::Sandbox => Box::new(SandboxRuntime::new()),
        RuntimeChoice::Php => Box::new(php().unwrap_or_else(|| PhpRuntime::new("php"))),
        RuntimeChoice::Auto => match php() {
            Some(runtime) => Box::new(runtime),
            None => Box::new(SandboxRuntime::new()),
        },
    };
    tracing::debug!(runtime = runtime.label(), "selected execution runtime");
    runtime
}
