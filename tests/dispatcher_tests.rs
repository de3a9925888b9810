//! Dispatcher behaviour as the backend drives it: shared behind a tokio mutex,
//! one message at a time.

use std::path::PathBuf;
use std::sync::Arc;

use nc_language_server::config::Config;
use nc_language_server::error::ProtocolError;
use nc_language_server::lsp::{Dispatcher, ServerState};
use serde_json::json;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;

fn uri() -> Url {
    Url::parse("file:///work/part.nc").unwrap()
}

fn config() -> Config {
    Config {
        root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        ..Config::default()
    }
}

async fn initialized() -> Arc<Mutex<Dispatcher>> {
    let dispatcher = Arc::new(Mutex::new(Dispatcher::new(&config())));
    dispatcher
        .lock()
        .await
        .initialize(InitializeParams::default())
        .expect("initialize");
    dispatcher
}

fn open(text: &str) -> DidOpenTextDocumentParams {
    DidOpenTextDocumentParams {
        text_document: TextDocumentItem::new(uri(), "nc".to_string(), 1, text.to_string()),
    }
}

fn change(version: i32, text: &str) -> DidChangeTextDocumentParams {
    DidChangeTextDocumentParams {
        text_document: VersionedTextDocumentIdentifier::new(uri(), version),
        content_changes: vec![TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }],
    }
}

fn close() -> DidCloseTextDocumentParams {
    DidCloseTextDocumentParams {
        text_document: TextDocumentIdentifier::new(uri()),
    }
}

fn position(line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams::new(TextDocumentIdentifier::new(uri()), Position::new(line, character))
}

fn completion(line: u32, character: u32) -> CompletionParams {
    CompletionParams {
        text_document_position: position(line, character),
        work_done_progress_params: Default::default(),
        partial_result_params: Default::default(),
        context: None,
    }
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.message.as_str()).collect()
}

#[tokio::test]
async fn test_requests_rejected_outside_initialized() {
    let dispatcher = Arc::new(Mutex::new(Dispatcher::new(&config())));
    let mut guard = dispatcher.lock().await;

    let err = guard.completion(completion(0, 0)).unwrap_err();
    assert_eq!(err, ProtocolError::NotInitialized);
    let rpc: jsonrpc::Error = err.into();
    assert_eq!(rpc.code, jsonrpc::ErrorCode::ServerError(-32002));

    guard.initialize(InitializeParams::default()).unwrap();
    guard.shutdown().unwrap();
    assert_eq!(guard.state(), ServerState::ShuttingDown);

    let err = guard
        .hover(HoverParams {
            text_document_position_params: position(0, 0),
            work_done_progress_params: Default::default(),
        })
        .unwrap_err();
    let rpc: jsonrpc::Error = err.into();
    assert_eq!(rpc.code, jsonrpc::ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn test_notifications_ignored_before_initialize() {
    let dispatcher = Arc::new(Mutex::new(Dispatcher::new(&config())));
    let mut guard = dispatcher.lock().await;
    assert!(guard.did_open(open("E1")).is_none());
    assert!(guard.sessions().is_empty());
}

#[tokio::test]
async fn test_open_publishes_zero_based_diagnostics() {
    let dispatcher = initialized().await;
    let publish = dispatcher
        .lock()
        .await
        .did_open(open("G00 X0\nE1\n"))
        .expect("publish");

    assert_eq!(publish.uri, uri());
    assert_eq!(publish.version, Some(1));
    assert_eq!(messages(&publish.diagnostics), ["2: Unknown word 'E'"]);
    assert_eq!(publish.diagnostics[0].range.start, Position::new(1, 0));
    assert_eq!(publish.diagnostics[0].range.end, Position::new(1, 2));
}

#[tokio::test]
async fn test_macros_carry_between_changes() {
    let dispatcher = initialized().await;
    dispatcher.lock().await.did_open(open("#1 = 5"));

    let publish = dispatcher
        .lock()
        .await
        .did_change(change(2, "G00 X#1"))
        .expect("publish");
    assert!(publish.diagnostics.is_empty());
    assert_eq!(publish.version, Some(2));
}

#[tokio::test]
async fn test_close_clears_and_forgets() {
    let dispatcher = initialized().await;
    dispatcher.lock().await.did_open(open("#1 = 5\nE1"));

    let publish = dispatcher.lock().await.did_close(close()).expect("publish");
    assert!(publish.diagnostics.is_empty());
    assert!(dispatcher.lock().await.sessions().is_empty());

    let publish = dispatcher
        .lock()
        .await
        .did_change(change(3, "G00 X#1"))
        .expect("publish");
    assert_eq!(messages(&publish.diagnostics), ["Undefined macro variable #1 in line 1"]);
}

#[tokio::test]
async fn test_completion_and_resolve() {
    let dispatcher = initialized().await;
    let mut guard = dispatcher.lock().await;
    guard.did_open(open("M\nG0"));

    let Some(CompletionResponse::Array(items)) = guard.completion(completion(0, 1)).unwrap() else {
        panic!("expected completion items");
    };
    assert!(!items.is_empty());
    assert!(items.iter().all(|item| item.label.starts_with('M')));
    assert!(items.iter().any(|item| item.label == "M03"));

    let Some(CompletionResponse::Array(items)) = guard.completion(completion(1, 2)).unwrap() else {
        panic!("expected completion items");
    };
    assert!(items.iter().any(|item| item.label == "G00"));
    assert!(items.iter().all(|item| item.label.starts_with("G0")));

    let item = items.into_iter().find(|item| item.label == "G00").unwrap();
    let resolved = guard.completion_resolve(item).unwrap();
    assert_eq!(resolved.detail.as_deref(), Some("Rapid positioning"));
    assert!(resolved.documentation.is_some());

    // never offered, so left alone
    let foreign = CompletionItem {
        label: "G00.5".to_string(),
        ..Default::default()
    };
    assert!(guard.completion_resolve(foreign).unwrap().documentation.is_none());
}

#[tokio::test]
async fn test_hover_on_code() {
    let dispatcher = initialized().await;
    let mut guard = dispatcher.lock().await;
    guard.did_open(open("N10 G01 X5 F100"));

    let hover = guard
        .hover(HoverParams {
            text_document_position_params: position(0, 5),
            work_done_progress_params: Default::default(),
        })
        .unwrap()
        .expect("hover");
    let HoverContents::Markup(markup) = hover.contents else {
        panic!("expected markdown");
    };
    assert!(markup.value.starts_with("**G01**\n\n"));

    let none = guard
        .hover(HoverParams {
            text_document_position_params: position(0, 9),
            work_done_progress_params: Default::default(),
        })
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_configuration_enables_inlay_hints() {
    let dispatcher = initialized().await;
    let mut guard = dispatcher.lock().await;
    guard.did_open(open("G01 X10 F600\nG00 X0\n"));

    let params = InlayHintParams {
        work_done_progress_params: Default::default(),
        text_document: TextDocumentIdentifier::new(uri()),
        range: Range::new(Position::new(0, 0), Position::new(2, 0)),
    };
    assert_eq!(guard.inlay_hint(params.clone()).unwrap().map(|hints| hints.len()), Some(0));

    let publishes = guard.did_change_configuration(DidChangeConfigurationParams {
        settings: json!({"ncLanguageServer": {"annotatePathTime": true}}),
    });
    assert_eq!(publishes.len(), 1);
    assert!(publishes[0].diagnostics.is_empty());

    let hints = guard.inlay_hint(params).unwrap().expect("hints");
    assert_eq!(hints.len(), 2);
    assert_eq!(hints[0].position, Position::new(0, 12));
    assert!(matches!(
        &hints[0].label,
        InlayHintLabel::String(label) if label.starts_with(" | Total path = 10.00")
    ));
}

#[tokio::test]
async fn test_configuration_switches_dialect() {
    let dispatcher = initialized().await;
    let mut guard = dispatcher.lock().await;
    guard.did_open(open("0 BEGIN PGM PART MM\n1 L X+10 FMAX\n"));

    let publishes = guard.did_change_configuration(DidChangeConfigurationParams {
        settings: json!({"ncLanguageServer": {"dialect": "heidenhain"}}),
    });
    assert!(publishes[0].diagnostics.is_empty());

    // an unknown dialect is ignored, the previous one stays active
    let publishes = guard.did_change_configuration(DidChangeConfigurationParams {
        settings: json!({"dialect": "sinumerik"}),
    });
    assert!(publishes[0].diagnostics.is_empty());
}

#[tokio::test]
async fn test_change_without_content_republishes() {
    let dispatcher = initialized().await;
    dispatcher.lock().await.did_open(open("G00 X0\nE1\n"));

    let mut params = change(2, "");
    params.content_changes.clear();
    let publish = dispatcher.lock().await.did_change(params).expect("publish");
    assert_eq!(publish.version, Some(2));
    assert_eq!(messages(&publish.diagnostics), ["2: Unknown word 'E'"]);
}
