//! Purpose: Define the public Rust API boundary for wpconf.
//! Exports: Core types and operations needed by the CLI and embedders.
//! Role: Public, additive-only surface over the core modules.
//! Invariants: Re-exports only; no behavior lives here.

pub use crate::core::anchor::{AnchorSpec, DEFAULT_ANCHOR, DEFAULT_SEPARATOR, EOF_ANCHOR, Placement};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::introspect::{Introspector, prepare_source};
pub use crate::core::locator::{Definition, DefinitionKind, DefinitionValue};
pub use crate::core::runtime::{
    ExecutionTrace, PhpRuntime, RuntimeChoice, SandboxRuntime, ScriptRuntime, select as select_runtime,
};
pub use crate::core::secrets::{
    DEFAULT_SALT_URL, RemoteSalts, SALT_KEYS, generate_secret, parse_secret_line,
};
pub use crate::core::snapshot::{ConfigEntry, EntryKind, EnvironmentSnapshot};
pub use crate::core::template::{TemplateParams, render as render_template};
pub use crate::core::transform::{ConfigTransformer, KindFilter, TransformOptions, UpdateResult};
