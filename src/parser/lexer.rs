//! NC block lexer
//!
//! Splits one block into attributes. Words are runs of letters, so multi-letter
//! keywords (`GOTO`, `FMAX`) come out as one word; whether a word exists is the
//! engine's business, not the lexer's.

use thiserror::Error;

use crate::parser::ast::{
    Attribute, CharAttribute, DecimalAttribute, MacroAssignment, Operand, TextAttribute,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Comment is not closed")]
    UnclosedComment,
    #[error("Missing ']' after word '{0}'")]
    UnclosedBracket(String),
    #[error("Missing macro variable number after '#'")]
    MissingVariableNumber,
    #[error("Expected '=' after #{0}")]
    ExpectedAssignment(u32),
    #[error("Missing expression for #{0}")]
    EmptyExpression(u32),
    #[error("Unexpected character '{0}'")]
    Unexpected(char),
}

/// Tokenize one trimmed block into `out`.
///
/// Attributes read before an error are left in `out`.
pub fn tokenize_line(line: &str, out: &mut Vec<Attribute>) -> Result<(), LexError> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            ' ' | '\t' | '\r' | '\n' => i += 1,

            // End of block; anything after it is commentary
            ';' => break,

            '(' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ')')
                    .ok_or(LexError::UnclosedComment)?;
                let value: String = chars[i + 1..i + 1 + close].iter().collect();
                out.push(Attribute::Text(TextAttribute {
                    word: "(".to_string(),
                    value,
                }));
                i += close + 2;
            }

            '%' => {
                out.push(Attribute::Char(CharAttribute {
                    word: '%',
                    value: None,
                }));
                i += 1;
            }

            '/' if out.is_empty() => {
                let value = chars.get(i + 1).copied().filter(char::is_ascii_digit);
                out.push(Attribute::Char(CharAttribute { word: '/', value }));
                i += 1 + usize::from(value.is_some());
            }

            '#' => {
                let (variable, next) =
                    read_digits(&chars, i + 1).ok_or(LexError::MissingVariableNumber)?;
                let mut j = skip_blank(&chars, next);
                if chars.get(j) != Some(&'=') {
                    return Err(LexError::ExpectedAssignment(variable));
                }
                j += 1;
                let end = chars[j..]
                    .iter()
                    .position(|&c| c == '(' || c == ';')
                    .map_or(chars.len(), |p| j + p);
                let expression: String = chars[j..end].iter().collect::<String>().trim().to_string();
                if expression.is_empty() {
                    return Err(LexError::EmptyExpression(variable));
                }
                out.push(Attribute::Assign(MacroAssignment {
                    variable,
                    expression,
                }));
                i = end;
            }

            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect::<String>().to_ascii_uppercase();
                let (attr, next) = read_operand(&chars, i, word)?;
                out.push(Attribute::Decimal(attr));
                i = next;
            }

            c if c.is_ascii_digit() || c == '.' => {
                let (attr, next) = read_operand(&chars, i, String::new())?;
                out.push(Attribute::Decimal(attr));
                i = next;
            }

            other => return Err(LexError::Unexpected(other)),
        }
    }

    Ok(())
}

/// Read `[sign] operand` starting at `i`.
fn read_operand(
    chars: &[char],
    mut i: usize,
    word: String,
) -> Result<(DecimalAttribute, usize), LexError> {
    let sign = match chars.get(i) {
        Some(&c) if c == '+' || c == '-' => {
            i += 1;
            Some(c)
        }
        _ => None,
    };

    let operand = match chars.get(i) {
        Some(c) if c.is_ascii_digit() || *c == '.' => {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let integer: String = chars[start..i].iter().collect();
            let fraction = if chars.get(i) == Some(&'.') {
                let frac_start = i + 1;
                i = frac_start;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                Some(chars[frac_start..i].iter().collect())
            } else {
                None
            };
            Operand::Literal { integer, fraction }
        }
        Some('#') => {
            let (n, next) = read_digits(chars, i + 1).ok_or(LexError::MissingVariableNumber)?;
            i = next;
            Operand::Macro(n)
        }
        Some('[') => {
            let close = matching_bracket(chars, i).ok_or_else(|| LexError::UnclosedBracket(word.clone()))?;
            let expr: String = chars[i + 1..close].iter().collect();
            i = close + 1;
            Operand::Expression(expr)
        }
        _ => Operand::Empty,
    };

    Ok((DecimalAttribute { word, sign, operand }, i))
}

fn read_digits(chars: &[char], start: usize) -> Option<(u32, usize)> {
    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return None;
    }
    let digits: String = chars[start..end].iter().collect();
    digits.parse().ok().map(|n| (n, end))
}

fn skip_blank(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn matching_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(line: &str) -> Vec<Attribute> {
        let mut out = Vec::new();
        tokenize_line(line, &mut out).expect("tokenize");
        out
    }

    #[test]
    fn test_tokenize_motion_block() {
        let attrs = tokenize("N10 G01 X-10.5 Y#1 F[#2*2]");
        assert_eq!(attrs.len(), 5);
        let rebuilt: Vec<String> = attrs.iter().map(ToString::to_string).collect();
        assert_eq!(rebuilt, ["N10", "G01", "X-10.5", "Y#1", "F[#2*2]"]);
    }

    #[test]
    fn test_tokenize_without_spaces() {
        let rebuilt: Vec<String> = tokenize("G0X10.Y5").iter().map(ToString::to_string).collect();
        assert_eq!(rebuilt, ["G0", "X10.", "Y5"]);
    }

    #[test]
    fn test_tokenize_assignment_and_comment() {
        let attrs = tokenize("#100 = [#1 + 2] (SET OFFSET)");
        assert_eq!(
            attrs[0],
            Attribute::Assign(MacroAssignment {
                variable: 100,
                expression: "[#1 + 2]".to_string(),
            })
        );
        assert_eq!(attrs[1].to_string(), "(SET OFFSET)");
    }

    #[test]
    fn test_tokenize_keywords_and_block_delete() {
        let attrs = tokenize("/ IF[#1GT5]GOTO10");
        let rebuilt: Vec<String> = attrs.iter().map(ToString::to_string).collect();
        assert_eq!(rebuilt, ["/", "IF[#1GT5]", "GOTO10"]);
    }

    #[test]
    fn test_semicolon_ends_block() {
        assert_eq!(tokenize("M30 ; end").len(), 1);
    }

    #[test]
    fn test_errors_keep_partial_output() {
        let mut out = Vec::new();
        let err = tokenize_line("G01 X10 (open", &mut out).unwrap_err();
        assert_eq!(err, LexError::UnclosedComment);
        assert_eq!(out.len(), 2);

        let mut out = Vec::new();
        assert_eq!(
            tokenize_line("#5 10", &mut out).unwrap_err(),
            LexError::ExpectedAssignment(5)
        );
        assert_eq!(
            tokenize_line("G01 X10 @", &mut out).unwrap_err(),
            LexError::Unexpected('@')
        );
    }
}
