//! Configuration/Grammar Resolver
//!
//! Machine settings plus the per-dialect grammar and code-group tables.

pub mod dialect;
pub mod resolver;
pub mod tables;

pub use dialect::{CncFamily, Dialect};
pub use resolver::ConfigResolver;
pub use tables::{
    CodeGroupTable, DialectTables, MachineSettings, Operations, WordGrammar, WordKind, WordRule,
};
