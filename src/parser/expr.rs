//! Macro expression evaluation (`[#1*2+SIN[30]]`).

use thiserror::Error;

use crate::engine::MacroMap;
use crate::settings::Operations;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Undefined macro variable #{0}")]
    UndefinedVariable(u32),
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Operation '{0}' is not allowed")]
    NotAllowed(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid expression '{0}'")]
    Syntax(String),
    #[error("Expression result is not a number")]
    NotFinite,
    #[error("Too many nested brackets")]
    TooDeep,
}

/// Deepest bracket or unary sign nesting accepted in one expression.
pub const MAX_DEPTH: usize = 32;

/// Evaluate `expr` against the macro table. Operators and functions must be
/// listed in `ops`.
pub fn evaluate(expr: &str, vars: &MacroMap, ops: &Operations) -> Result<f64, ExprError> {
    let chars: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut eval = Evaluator {
        chars: &chars,
        pos: 0,
        depth: 0,
        vars,
        ops,
        source: expr,
    };
    let value = eval.expression()?;
    if eval.pos != chars.len() {
        return Err(eval.syntax());
    }
    finite(value)
}

fn finite(value: f64) -> Result<f64, ExprError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::NotFinite)
    }
}

struct Evaluator<'a> {
    chars: &'a [char],
    pos: usize,
    depth: usize,
    vars: &'a MacroMap,
    ops: &'a Operations,
    source: &'a str,
}

impl Evaluator<'_> {
    fn syntax(&self) -> ExprError {
        ExprError::Syntax(self.source.trim().to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn operator(&mut self, op: char) -> Result<(), ExprError> {
        if !self.ops.allows(&op.to_string()) {
            return Err(ExprError::NotAllowed(op.to_string()));
        }
        self.pos += 1;
        Ok(())
    }

    fn expression(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.operator(op)?;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.operator(op)?;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else if rhs == 0.0 {
                return Err(ExprError::DivisionByZero);
            } else {
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<f64, ExprError> {
        match self.peek() {
            Some(op @ ('+' | '-')) => {
                self.operator(op)?;
                let value = self.factor()?;
                Ok(if op == '-' { -value } else { value })
            }
            Some('[') => self.bracketed(),
            Some('#') => {
                self.pos += 1;
                let index = if self.peek() == Some('[') {
                    self.bracketed()?
                } else {
                    self.number()?
                };
                let variable = index.round() as u32;
                self.vars
                    .get(&variable)
                    .copied()
                    .ok_or(ExprError::UndefinedVariable(variable))
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.function(),
            _ => Err(self.syntax()),
        }
    }

    fn bracketed(&mut self) -> Result<f64, ExprError> {
        self.pos += 1;
        let value = self.expression()?;
        if self.peek() != Some(']') {
            return Err(self.syntax());
        }
        self.pos += 1;
        Ok(value)
    }

    fn number(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse().map_err(|_| self.syntax())
    }

    fn function(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_uppercase();
        let apply: fn(f64) -> f64 = match name.as_str() {
            "SIN" => |v: f64| v.to_radians().sin(),
            "COS" => |v: f64| v.to_radians().cos(),
            "TAN" => |v: f64| v.to_radians().tan(),
            "ATAN" => |v: f64| v.atan().to_degrees(),
            "SQRT" => f64::sqrt,
            "ABS" => f64::abs,
            "ROUND" => f64::round,
            "FIX" => f64::trunc,
            "FUP" => |v: f64| if v < 0.0 { v.floor() } else { v.ceil() },
            _ => return Err(ExprError::UnknownFunction(name)),
        };
        if !self.ops.allows(&name) {
            return Err(ExprError::NotAllowed(name));
        }
        if self.peek() != Some('[') {
            return Err(self.syntax());
        }
        let arg = self.bracketed()?;
        finite(apply(arg))
    }
}
