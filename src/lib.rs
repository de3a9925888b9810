//! NC Language Server
//!
//! Language Server Protocol diagnostics for NC machine-tool programs.
//!
//! This library provides:
//! - Per-dialect configuration and grammar tables
//! - Fanuc-family and Heidenhain parsing engines
//! - A parse-and-annotate pipeline (diagnostics, path/time, rewrites)
//! - LSP protocol implementation

pub mod codes;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod lsp;
pub mod parser;
pub mod pipeline;
pub mod settings;

pub use config::Config;
pub use engine::{AttributeParser, Engine, MacroMap};
pub use error::{ConfigurationError, ProtocolError};
pub use pipeline::{Mode, ParseOutcome, Pipeline};
pub use settings::{ConfigResolver, Dialect};
