//! NC block parser
//!
//! Tokenization into attributes and macro expression evaluation. No
//! dialect rules live here.

pub mod ast;
pub mod expr;
pub mod lexer;

pub use ast::{Attribute, CharAttribute, DecimalAttribute, MacroAssignment, Operand, TextAttribute};
pub use expr::{evaluate, ExprError};
pub use lexer::{tokenize_line, LexError};

/// Parse a single block into attributes.
pub fn parse_line(line: &str) -> Result<Vec<Attribute>, LexError> {
    let mut out = Vec::new();
    tokenize_line(line, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_block() {
        let attrs = parse_line("G1 X10 Y20").unwrap();
        assert_eq!(attrs.len(), 3);
        if let Attribute::Decimal(x) = &attrs[1] {
            assert_eq!(x.word, "X");
            assert_eq!(x.literal_value(), Some(10.0));
        } else {
            panic!("Expected decimal attribute");
        }
    }

    #[test]
    fn test_parse_comment_only() {
        let attrs = parse_line("(this is a comment)").unwrap();
        assert!(matches!(&attrs[..], [Attribute::Text(t)] if t.value == "this is a comment"));
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(parse_line("   ").unwrap().is_empty());
    }
}
