//! Document Session Management
//!
//! One session per open document. A session owns the document's macro
//! bindings, so a value assigned in one edit is visible to the next parse.

use std::collections::HashMap;

use tower_lsp::lsp_types::Url;

use crate::engine::MacroMap;
use crate::pipeline::{Mode, ParseOutcome, PathTimeResult, Pipeline};
use crate::settings::Dialect;

/// State kept for one open document
#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub uri: Url,
    pub lines: Vec<String>,
    pub macros: MacroMap,
    pub annotations: PathTimeResult,
}

impl DocumentSession {
    fn new(uri: Url) -> Self {
        Self {
            uri,
            lines: Vec::new(),
            macros: MacroMap::new(),
            annotations: PathTimeResult::new(),
        }
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Open sessions keyed by uri, and the pipeline that parses them
#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<Url, DocumentSession>,
    pipeline: Pipeline,
}

impl SessionManager {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            sessions: HashMap::new(),
            pipeline,
        }
    }

    /// Start a fresh session for `uri`, replacing any previous one.
    pub fn open(&mut self, uri: Url, text: &str, dialect: Dialect, mode: Mode) -> ParseOutcome {
        log::debug!("open {}", uri);
        self.sessions.insert(uri.clone(), DocumentSession::new(uri.clone()));
        self.update(uri, text, dialect, mode)
    }

    /// Re-parse `uri` with new text. An unknown uri gets a fresh session.
    pub fn change(&mut self, uri: Url, text: &str, dialect: Dialect, mode: Mode) -> ParseOutcome {
        if !self.sessions.contains_key(&uri) {
            log::debug!("change for unopened {}, starting a session", uri);
            self.sessions.insert(uri.clone(), DocumentSession::new(uri.clone()));
        }
        self.update(uri, text, dialect, mode)
    }

    /// Forget `uri`. Returns whether a session existed.
    pub fn close(&mut self, uri: &Url) -> bool {
        log::debug!("close {}", uri);
        self.sessions.remove(uri).is_some()
    }

    pub fn get(&self, uri: &Url) -> Option<&DocumentSession> {
        self.sessions.get(uri)
    }

    pub fn uris(&self) -> Vec<Url> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    fn update(&mut self, uri: Url, text: &str, dialect: Dialect, mode: Mode) -> ParseOutcome {
        let session = self
            .sessions
            .entry(uri.clone())
            .or_insert_with(|| DocumentSession::new(uri));
        let outcome = self.pipeline.run(text, dialect, mode, &mut session.macros);
        session.lines = text.lines().map(str::to_string).collect();
        session.annotations = outcome.path_time.clone();
        outcome
    }
}
