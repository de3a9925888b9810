use std::sync::Arc;

use anyhow::Result;
use tokio::io::{stdin, stdout};
use tokio::sync::Mutex;
use tower_lsp::{LspService, Server};

use crate::config::Config;
use crate::lsp::backend::Backend;
use crate::lsp::dispatcher::Dispatcher;

/// Serve LSP over stdio until the client exits. Returns the process exit code.
pub async fn serve(config: Config) -> Result<u8> {
    log::info!("starting nc-ls with root {}", config.root.display());
    let dispatcher = Arc::new(Mutex::new(Dispatcher::new(&config)));

    let shared = Arc::clone(&dispatcher);
    let (service, socket) = LspService::build(move |client| Backend::new(client, Arc::clone(&shared))).finish();

    Server::new(stdin(), stdout(), socket)
        .concurrency_level(1)
        .serve(service)
        .await;

    let code = dispatcher.lock().await.exit();
    log::info!("exiting with code {}", code);
    Ok(code)
}
