//! Attribute types for one NC block
//!
//! Each attribute keeps the pieces it was written with so the block can be
//! written back out after unit conversion or axis rotation.

use std::fmt;

/// One parsed element of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// Address word with a numeric operand, e.g. `X-10.5`, `F#2`, `Z[#1+2]`
    Decimal(DecimalAttribute),
    /// Text element, e.g. a `(comment)`
    Text(TextAttribute),
    /// Single-character element, e.g. `%` or `/2`
    Char(CharAttribute),
    /// Macro variable assignment, e.g. `#100=[#1*2]`
    Assign(MacroAssignment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecimalAttribute {
    /// Upper-case word text (`X`, `GOTO`); empty for a bare number
    pub word: String,
    pub sign: Option<char>,
    pub operand: Operand,
}

/// What follows the word and sign.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Empty,
    /// Number as written; `fraction` is `Some` when a decimal point was written.
    Literal {
        integer: String,
        fraction: Option<String>,
    },
    Macro(u32),
    /// Contents of a `[...]` expression, without the brackets
    Expression(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAttribute {
    pub word: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharAttribute {
    pub word: char,
    pub value: Option<char>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroAssignment {
    pub variable: u32,
    pub expression: String,
}

impl DecimalAttribute {
    /// Value of a literal operand with its sign applied.
    pub fn literal_value(&self) -> Option<f64> {
        let Operand::Literal { integer, fraction } = &self.operand else {
            return None;
        };
        let integer = if integer.is_empty() { "0" } else { integer };
        let fraction = fraction.as_deref().filter(|f| !f.is_empty()).unwrap_or("0");
        let magnitude: f64 = format!("{integer}.{fraction}").parse().ok()?;
        Some(self.apply_sign(magnitude))
    }

    pub fn apply_sign(&self, magnitude: f64) -> f64 {
        if self.sign == Some('-') {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Whether a decimal point was written.
    pub fn has_decimal_point(&self) -> bool {
        matches!(&self.operand, Operand::Literal { fraction: Some(_), .. })
    }

    /// Flip the sign of the operand.
    pub fn negate(&mut self) {
        self.sign = match self.sign {
            Some('-') => None,
            _ => Some('-'),
        };
    }

    /// Replace a literal operand with `value` written with `decimals` digits,
    /// trailing zeros trimmed but keeping the decimal point.
    pub fn set_literal(&mut self, value: f64, decimals: usize) {
        let formatted = format!("{:.*}", decimals, value.abs());
        let (integer, fraction) = formatted
            .split_once('.')
            .map(|(i, f)| (i.to_string(), f.trim_end_matches('0').to_string()))
            .unwrap_or((formatted.clone(), String::new()));
        let is_zero = value.abs() < 0.5 * 10f64.powi(-(decimals as i32));
        self.sign = if value < 0.0 && !is_zero { Some('-') } else { None };
        self.operand = Operand::Literal {
            integer,
            fraction: Some(fraction),
        };
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Empty => Ok(()),
            Operand::Literal { integer, fraction } => {
                f.write_str(integer)?;
                if let Some(fraction) = fraction {
                    write!(f, ".{}", fraction)?;
                }
                Ok(())
            }
            Operand::Macro(n) => write!(f, "#{}", n),
            Operand::Expression(expr) => write!(f, "[{}]", expr),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Decimal(data) => {
                f.write_str(&data.word)?;
                if let Some(sign) = data.sign {
                    write!(f, "{}", sign)?;
                }
                write!(f, "{}", data.operand)
            }
            Attribute::Text(data) => {
                write!(f, "{}{}", data.word, data.value)?;
                if data.word == "(" {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Attribute::Char(data) => {
                write!(f, "{}", data.word)?;
                if let Some(value) = data.value {
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
            Attribute::Assign(data) => write!(f, "#{}={}", data.variable, data.expression),
        }
    }
}
