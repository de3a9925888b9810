//! Request Dispatcher
//!
//! The server's state machine. Every LSP message is handled here with
//! exclusive access; the backend only moves data between the client and
//! this type.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tower_lsp::lsp_types::*;

use crate::codes::CodeDescriptions;
use crate::config::Config;
use crate::core::{inlay_hints, to_lsp_diagnostics, SessionManager};
use crate::error::ProtocolError;
use crate::lsp::handlers;
use crate::pipeline::{Mode, Pipeline};
use crate::settings::{ConfigResolver, Dialect};

/// Lifecycle of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Initialized,
    ShuttingDown,
    Exited,
}

/// Diagnostics to send for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    pub uri: Url,
    pub diagnostics: Vec<Diagnostic>,
    pub version: Option<i32>,
}

/// Client-side settings, from `initializationOptions` or
/// `workspace/didChangeConfiguration`. Either nested under
/// `ncLanguageServer` or given flat.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSettings {
    pub settings_path: Option<PathBuf>,
    pub dialect: Option<String>,
    pub annotate_path_time: Option<bool>,
}

impl WorkspaceSettings {
    pub const SECTION: &'static str = "ncLanguageServer";

    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let section = value.get(Self::SECTION).unwrap_or(value);
        if section.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(section.clone()).map_err(|e| ProtocolError::InvalidParams(e.to_string()))
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    state: ServerState,
    sessions: SessionManager,
    descriptions: HashMap<Dialect, Arc<CodeDescriptions>>,
    suggested: HashSet<String>,
    dialect: Dialect,
    annotate_path_time: bool,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        let resolver = ConfigResolver::new(config.root.clone(), config.settings_path.clone());
        Self {
            state: ServerState::Uninitialized,
            sessions: SessionManager::new(Pipeline::new(resolver)),
            descriptions: HashMap::new(),
            suggested: HashSet::new(),
            dialect: config.dialect,
            annotate_path_time: config.annotate_path_time,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn require_initialized(&self) -> Result<(), ProtocolError> {
        match self.state {
            ServerState::Initialized => Ok(()),
            ServerState::Uninitialized => Err(ProtocolError::NotInitialized),
            ServerState::ShuttingDown | ServerState::Exited => Err(ProtocolError::ShuttingDown),
        }
    }

    fn accepts_notifications(&self, method: &str) -> bool {
        let accepted = self.state == ServerState::Initialized;
        if !accepted {
            log::debug!("ignoring {} in state {:?}", method, self.state);
        }
        accepted
    }

    fn mode(&self) -> Mode {
        if self.annotate_path_time {
            Mode::PathTime
        } else {
            Mode::Parse
        }
    }

    fn active_dialect(&mut self) -> Dialect {
        self.sessions
            .pipeline_mut()
            .resolver_mut()
            .active_dialect(self.dialect)
    }

    fn descriptions(&mut self) -> Arc<CodeDescriptions> {
        let dialect = self.active_dialect();
        let root = self.sessions.pipeline_mut().resolver().root().to_path_buf();
        Arc::clone(
            self.descriptions
                .entry(dialect)
                .or_insert_with(|| Arc::new(CodeDescriptions::load(&root, dialect))),
        )
    }

    fn apply_settings(&mut self, settings: WorkspaceSettings) {
        if let Some(name) = settings.dialect {
            match name.parse() {
                Ok(dialect) => self.dialect = dialect,
                Err(e) => log::warn!("{}", e),
            }
        }
        if let Some(annotate) = settings.annotate_path_time {
            self.annotate_path_time = annotate;
        }
        let resolver = self.sessions.pipeline_mut().resolver_mut();
        match settings.settings_path {
            Some(path) => resolver.set_settings_path(Some(path)),
            None => resolver.reload_settings(),
        }
    }

    pub fn initialize(&mut self, params: InitializeParams) -> Result<InitializeResult, ProtocolError> {
        if self.state != ServerState::Uninitialized {
            return Err(ProtocolError::AlreadyInitialized);
        }
        if let Some(options) = params.initialization_options.as_ref() {
            self.apply_settings(WorkspaceSettings::from_value(options)?);
        }
        self.state = ServerState::Initialized;
        log::info!(
            "initialized: dialect {}, path/time annotations {}",
            self.dialect,
            if self.annotate_path_time { "on" } else { "off" }
        );

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(true),
                    trigger_characters: Some(vec!["G".to_string(), "M".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                inlay_hint_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "nc-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    pub fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.require_initialized()?;
        log::info!("shutdown requested");
        self.state = ServerState::ShuttingDown;
        Ok(())
    }

    /// Process exit code: 0 after a shutdown request, 1 otherwise.
    pub fn exit(&mut self) -> u8 {
        let code = if self.state == ServerState::ShuttingDown { 0 } else { 1 };
        self.state = ServerState::Exited;
        code
    }

    /// Apply new client settings and re-parse every open document.
    pub fn did_change_configuration(&mut self, params: DidChangeConfigurationParams) -> Vec<Publish> {
        if !self.accepts_notifications("workspace/didChangeConfiguration") {
            return Vec::new();
        }
        match WorkspaceSettings::from_value(&params.settings) {
            Ok(settings) => self.apply_settings(settings),
            Err(e) => {
                log::warn!("ignoring configuration: {}", e);
                return Vec::new();
            }
        }

        let mut uris = self.sessions.uris();
        uris.sort();
        uris.into_iter()
            .filter_map(|uri| {
                let text = self.sessions.get(&uri)?.text();
                Some(self.reparse(uri, &text, None, false))
            })
            .collect()
    }

    pub fn did_open(&mut self, params: DidOpenTextDocumentParams) -> Option<Publish> {
        if !self.accepts_notifications("textDocument/didOpen") {
            return None;
        }
        let doc = params.text_document;
        Some(self.reparse(doc.uri, &doc.text, Some(doc.version), true))
    }

    pub fn did_change(&mut self, params: DidChangeTextDocumentParams) -> Option<Publish> {
        if !self.accepts_notifications("textDocument/didChange") {
            return None;
        }
        let doc = params.text_document;
        // Full sync: only the last change matters. Without one, re-check the current text.
        let text = match params.content_changes.into_iter().last() {
            Some(change) => change.text,
            None => self.sessions.get(&doc.uri).map(|s| s.text()).unwrap_or_default(),
        };
        Some(self.reparse(doc.uri, &text, Some(doc.version), false))
    }

    pub fn did_close(&mut self, params: DidCloseTextDocumentParams) -> Option<Publish> {
        if !self.accepts_notifications("textDocument/didClose") {
            return None;
        }
        let uri = params.text_document.uri;
        if !self.sessions.close(&uri) {
            log::debug!("close for unknown document {}", uri);
        }
        Some(Publish {
            uri,
            diagnostics: Vec::new(),
            version: None,
        })
    }

    fn reparse(&mut self, uri: Url, text: &str, version: Option<i32>, fresh: bool) -> Publish {
        let dialect = self.active_dialect();
        let mode = self.mode();
        let outcome = if fresh {
            self.sessions.open(uri.clone(), text, dialect, mode)
        } else {
            self.sessions.change(uri.clone(), text, dialect, mode)
        };

        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        Publish {
            diagnostics: to_lsp_diagnostics(&outcome.diagnostics, &lines),
            uri,
            version,
        }
    }

    pub fn completion(&mut self, params: CompletionParams) -> Result<Option<CompletionResponse>, ProtocolError> {
        self.require_initialized()?;
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let line = self
            .sessions
            .get(&uri)
            .and_then(|s| s.line(position.line as usize))
            .unwrap_or_default()
            .to_string();

        let dialect = self.active_dialect();
        let tables = match self.sessions.pipeline_mut().resolver_mut().resolve(dialect) {
            Ok(tables) => tables,
            Err(e) => {
                log::warn!("no completions: {}", e);
                return Ok(None);
            }
        };

        let items = handlers::completion_items(&line, position, &tables);
        self.suggested.extend(items.iter().map(|item| item.label.clone()));
        Ok(Some(CompletionResponse::Array(items)))
    }

    pub fn completion_resolve(&mut self, item: CompletionItem) -> Result<CompletionItem, ProtocolError> {
        self.require_initialized()?;
        if !self.suggested.contains(&item.label) {
            return Ok(item);
        }
        let descriptions = self.descriptions();
        Ok(handlers::resolve_item(item, &descriptions))
    }

    pub fn hover(&mut self, params: HoverParams) -> Result<Option<Hover>, ProtocolError> {
        self.require_initialized()?;
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some(line) = self
            .sessions
            .get(&uri)
            .and_then(|s| s.line(position.line as usize))
            .map(str::to_string)
        else {
            return Ok(None);
        };

        let descriptions = self.descriptions();
        Ok(handlers::hover(&line, position, &descriptions))
    }

    pub fn inlay_hint(&mut self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>, ProtocolError> {
        self.require_initialized()?;
        let Some(session) = self.sessions.get(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(Some(inlay_hints(&session.annotations, &session.lines, Some(params.range))))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn dispatcher() -> Dispatcher {
        let config = Config {
            root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            ..Config::default()
        };
        Dispatcher::new(&config)
    }

    #[test]
    fn test_workspace_settings_nested_or_flat() {
        let nested = json!({"ncLanguageServer": {"dialect": "heidenhain", "annotatePathTime": true}});
        let settings = WorkspaceSettings::from_value(&nested).unwrap();
        assert_eq!(settings.dialect.as_deref(), Some("heidenhain"));
        assert_eq!(settings.annotate_path_time, Some(true));

        let flat = json!({"settingsPath": "/opt/vf2.ncsetting"});
        let settings = WorkspaceSettings::from_value(&flat).unwrap();
        assert_eq!(settings.settings_path, Some(PathBuf::from("/opt/vf2.ncsetting")));

        assert_eq!(WorkspaceSettings::from_value(&Value::Null).unwrap(), WorkspaceSettings::default());
        assert!(WorkspaceSettings::from_value(&json!({"annotatePathTime": "yes"})).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut dispatcher = dispatcher();
        assert_eq!(dispatcher.shutdown(), Err(ProtocolError::NotInitialized));

        let result = dispatcher.initialize(InitializeParams::default()).unwrap();
        assert!(result.capabilities.inlay_hint_provider.is_some());
        assert_eq!(
            dispatcher.initialize(InitializeParams::default()).unwrap_err(),
            ProtocolError::AlreadyInitialized
        );

        dispatcher.shutdown().unwrap();
        assert_eq!(dispatcher.shutdown(), Err(ProtocolError::ShuttingDown));
        assert_eq!(dispatcher.exit(), 0);
        assert_eq!(dispatcher.state(), ServerState::Exited);
    }

    #[test]
    fn test_exit_without_shutdown() {
        let mut dispatcher = dispatcher();
        dispatcher.initialize(InitializeParams::default()).unwrap();
        assert_eq!(dispatcher.exit(), 1);
    }

    #[test]
    fn test_initialization_options_apply() {
        let mut dispatcher = dispatcher();
        let params = InitializeParams {
            initialization_options: Some(json!({"ncLanguageServer": {"annotatePathTime": true}})),
            ..Default::default()
        };
        dispatcher.initialize(params).unwrap();
        assert_eq!(dispatcher.mode(), Mode::PathTime);
    }
}
