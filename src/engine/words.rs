//! Grammar checks common to every engine.

use std::collections::HashMap;

use crate::codes::normalize_code;
use crate::engine::{LineError, ParserSettings, SourceLine};
use crate::parser::{Attribute, DecimalAttribute, Operand};
use crate::settings::{CodeGroupTable, WordGrammar, WordKind, WordRule};

/// Validate every decimal attribute of a block against the dialect grammar.
pub fn check_words(
    grammar: &WordGrammar,
    settings: &ParserSettings,
    line: SourceLine<'_>,
    attributes: &[Attribute],
) -> Result<(), LineError> {
    for attr in attributes {
        let Attribute::Decimal(data) = attr else {
            continue;
        };
        let rule = grammar
            .rule(&data.word)
            .ok_or_else(|| settings.error(line, unknown_word(data)))?;
        check_operand(rule, data).map_err(|msg| settings.error(line, msg))?;
    }
    Ok(())
}

fn unknown_word(data: &DecimalAttribute) -> String {
    if data.word.is_empty() {
        format!("Unexpected number '{}'", Attribute::Decimal(data.clone()))
    } else {
        format!("Unknown word '{}'", data.word)
    }
}

fn check_operand(rule: &WordRule, data: &DecimalAttribute) -> Result<(), String> {
    let word = &data.word;
    match (&data.operand, rule.kind) {
        (_, WordKind::Keyword) => Ok(()),
        (Operand::Empty, WordKind::Flag) => Ok(()),
        (_, WordKind::Flag) => Err(format!("Word '{}' does not take a value", word)),
        (Operand::Empty, _) => Err(format!("Missing value for word '{}'", word)),
        (Operand::Macro(_) | Operand::Expression(_), _) if !rule.allow_macro => {
            Err(format!("Word '{}' does not accept macro values", word))
        }
        (Operand::Literal { .. }, WordKind::Integer) if data.has_decimal_point() => {
            Err(format!("Word '{}' does not accept a decimal point", word))
        }
        _ => Ok(()),
    }
}

/// `G` + 1.0 -> `G1`, `G` + 54.1 -> `G54.1`
pub fn code_name(letter: char, value: f64) -> String {
    normalize_code(&format!("{}{}", letter, value))
}

/// Every code must be known; at most one code per group, group 0 excepted.
pub fn check_group_table(table: &CodeGroupTable, codes: &[String]) -> Result<(), String> {
    let mut seen: HashMap<u32, &str> = HashMap::new();
    for code in codes {
        let group = table
            .group_of(code)
            .ok_or_else(|| format!("Unknown code {}", code))?;
        if group == 0 {
            continue;
        }
        if let Some(previous) = seen.insert(group, code) {
            return Err(format!(
                "Codes {} and {} of group {} cannot be used in the same block",
                previous, code, group
            ));
        }
    }
    Ok(())
}
