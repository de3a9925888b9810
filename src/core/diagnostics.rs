//! Diagnostic Conversion
//!
//! Pipeline results to LSP types. Pipeline lines are 1-based, LSP lines are
//! 0-based.

use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, InlayHint, InlayHintLabel, Position, Range,
};

use crate::pipeline::{LineDiagnostic, PathTimeResult};

pub const SOURCE: &str = "nc-ls";

/// One LSP diagnostic per pipeline diagnostic, spanning its whole line.
pub fn to_lsp_diagnostics(diagnostics: &[LineDiagnostic], lines: &[String]) -> Vec<Diagnostic> {
    diagnostics
        .iter()
        .map(|d| {
            let row = d.line.saturating_sub(1);
            Diagnostic {
                range: line_range(row, lines),
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some(SOURCE.to_string()),
                message: d.message.clone(),
                ..Default::default()
            }
        })
        .collect()
}

/// Annotations as hints at the end of their line, limited to `visible` rows.
pub fn inlay_hints(annotations: &PathTimeResult, lines: &[String], visible: Option<Range>) -> Vec<InlayHint> {
    annotations
        .iter()
        .filter(|(row, _)| {
            visible.is_none_or(|r| (r.start.line as usize..=r.end.line as usize).contains(row))
        })
        .map(|(&row, text)| InlayHint {
            position: line_range(row, lines).end,
            label: InlayHintLabel::String(text.trim_end().to_string()),
            kind: None,
            text_edits: None,
            tooltip: None,
            padding_left: Some(true),
            padding_right: None,
            data: None,
        })
        .collect()
}

fn line_range(row: usize, lines: &[String]) -> Range {
    let width = lines
        .get(row)
        .map_or(0, |line| line.encode_utf16().count());
    Range {
        start: Position::new(row as u32, 0),
        end: Position::new(row as u32, width as u32),
    }
}
