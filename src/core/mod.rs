// Core modules: lexing, locating and editing definitions, execution, and error modeling.
pub mod anchor;
pub mod error;
pub mod file;
pub mod introspect;
pub mod lexer;
pub mod locator;
pub mod runtime;
pub mod secrets;
pub mod snapshot;
pub mod template;
pub mod transform;
