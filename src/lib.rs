//! Purpose: Shared library crate used by the `wpconf` CLI and tests.
//! Exports: `core` (lexer, locator, transformer, introspector, runtimes, errors) and `api`.
//! Role: Library backing the binary; `api` is the supported import path.
//! Invariants: Core modules never print or exit; callers decide how errors surface.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
