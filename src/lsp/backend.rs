use std::sync::Arc;

use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::lsp::dispatcher::{Dispatcher, Publish};

/// Bridges the `tower-lsp` client to the [`Dispatcher`].
///
/// Each handler holds the dispatcher lock while it computes, then releases it
/// before talking to the client.
pub struct Backend {
    client: Client,
    dispatcher: Arc<Mutex<Dispatcher>>,
}

impl Backend {
    pub fn new(client: Client, dispatcher: Arc<Mutex<Dispatcher>>) -> Self {
        Self { client, dispatcher }
    }

    async fn publish(&self, publish: Publish) {
        log::debug!("publishing {} diagnostics for {}", publish.diagnostics.len(), publish.uri);
        self.client
            .publish_diagnostics(publish.uri, publish.diagnostics, publish.version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.dispatcher.lock().await.initialize(params).map_err(Into::into)
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "nc-ls initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.dispatcher.lock().await.shutdown().map_err(Into::into)
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let publishes = self.dispatcher.lock().await.did_change_configuration(params);
        for publish in publishes {
            self.publish(publish).await;
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let publish = self.dispatcher.lock().await.did_open(params);
        if let Some(publish) = publish {
            self.publish(publish).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let publish = self.dispatcher.lock().await.did_change(params);
        if let Some(publish) = publish {
            self.publish(publish).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let publish = self.dispatcher.lock().await.did_close(params);
        if let Some(publish) = publish {
            self.publish(publish).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.dispatcher.lock().await.completion(params).map_err(Into::into)
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        self.dispatcher
            .lock()
            .await
            .completion_resolve(item)
            .map_err(Into::into)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        self.dispatcher.lock().await.hover(params).map_err(Into::into)
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        self.dispatcher.lock().await.inlay_hint(params).map_err(Into::into)
    }
}
