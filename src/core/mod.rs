//! Core Business Logic
//!
//! Document sessions and conversion of pipeline results to LSP types.

pub mod diagnostics;
pub mod document;

pub use diagnostics::{inlay_hints, to_lsp_diagnostics};
pub use document::{DocumentSession, SessionManager};
