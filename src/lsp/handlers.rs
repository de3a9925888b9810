use tower_lsp::lsp_types::*;

use crate::codes::{CodeDescriptions, CodeFamily};
use crate::settings::DialectTables;

/// Char span of the alphanumeric token touching `character`, if any.
pub fn token_span(line: &str, character: usize) -> Option<(usize, usize)> {
    let chars: Vec<char> = line.chars().collect();
    let cursor = character.min(chars.len());

    let mut start = cursor;
    while start > 0 && chars[start - 1].is_alphanumeric() {
        start -= 1;
    }
    let mut end = cursor;
    while end < chars.len() && chars[end].is_alphanumeric() {
        end += 1;
    }

    (start < end).then_some((start, end))
}

/// Uppercased token under the cursor.
pub fn token_at(line: &str, character: usize) -> Option<String> {
    let (start, end) = token_span(line, character)?;
    Some(
        line.chars()
            .skip(start)
            .take(end - start)
            .collect::<String>()
            .to_uppercase(),
    )
}

/// Uppercased part of the token that ends at the cursor.
fn prefix_at(line: &str, character: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    let cursor = character.min(chars.len());
    let mut start = cursor;
    while start > 0 && chars[start - 1].is_alphanumeric() {
        start -= 1;
    }
    chars[start..cursor].iter().collect::<String>().to_uppercase()
}

/// Char index of the UTF-16 offset `character`, clamped to the line end.
fn char_index(line: &str, character: u32) -> usize {
    let mut units = 0;
    for (index, c) in line.chars().enumerate() {
        if units >= character as usize {
            return index;
        }
        units += c.len_utf16();
    }
    line.chars().count()
}

/// UTF-16 offset of char index `index`.
fn utf16_column(line: &str, index: usize) -> u32 {
    line.chars().take(index).map(char::len_utf16).sum::<usize>() as u32
}

/// Hover card for the G or M code under the cursor.
pub fn hover(line: &str, position: Position, descriptions: &CodeDescriptions) -> Option<Hover> {
    let character = char_index(line, position.character);
    let token = token_at(line, character)?;
    CodeFamily::of(&token)?;
    let value = descriptions.markdown(&token)?;
    let (start, end) = token_span(line, character)?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(Range::new(
            Position::new(position.line, utf16_column(line, start)),
            Position::new(position.line, utf16_column(line, end)),
        )),
    })
}

/// Completion labels: every G code of the dialect, then every M code.
///
/// Only codes starting with the text before the cursor are offered.
pub fn completion_items(line: &str, position: Position, tables: &DialectTables) -> Vec<CompletionItem> {
    let prefix = prefix_at(line, char_index(line, position.character));

    tables
        .gcode_groups
        .codes()
        .chain(tables.mcode_groups.codes())
        .filter(|code| code.starts_with(&prefix))
        .map(|code| CompletionItem {
            label: code.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            ..Default::default()
        })
        .collect()
}

/// Fill in detail and documentation for an item offered earlier.
pub fn resolve_item(mut item: CompletionItem, descriptions: &CodeDescriptions) -> CompletionItem {
    if let Some(description) = descriptions.get(&item.label) {
        item.detail = Some(description.short.clone());
    }
    if let Some(markdown) = descriptions.markdown(&item.label) {
        item.documentation = Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: markdown,
        }));
    }
    item
}
