//! LSP Protocol Implementation
//!
//! `tower-lsp` backend over a synchronous dispatcher.

pub mod backend;
pub mod dispatcher;
pub mod handlers;
pub mod server;

pub use backend::Backend;
pub use dispatcher::{Dispatcher, Publish, ServerState, WorkspaceSettings};
pub use server::serve;
