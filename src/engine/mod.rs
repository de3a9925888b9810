//! Attribute Parsing Engine
//!
//! The capability interface the pipeline drives, and the closed set of
//! dialect-family engines behind it.

pub mod fanuc;
pub mod heidenhain;
pub mod motion;
pub mod words;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;

use crate::parser::Attribute;
use crate::settings::{DialectTables, MachineSettings};

pub use fanuc::FanucParser;
pub use heidenhain::HeidenhainParser;

/// Macro variable number -> last assigned value.
pub type MacroMap = BTreeMap<u32, f64>;

/// One physical line handed to an engine.
#[derive(Debug, Clone, Copy)]
pub struct SourceLine<'a> {
    /// 1-based physical line number
    pub number: usize,
    /// Trimmed line text
    pub text: &'a str,
}

/// Per-line failure reported by an engine. The message may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    message: String,
}

impl LineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure without any explanation.
    pub fn unexplained() -> Self {
        Self::new(String::new())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LineError {}

/// Cumulative path lengths. `fast_motion`/`work_motion` hold the last line's share.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathResult {
    pub total: f64,
    pub tool_total: f64,
    pub tool_id: u32,
    pub fast_motion: f64,
    pub work_motion: f64,
}

/// Cumulative time in seconds. `fast_motion`/`work_motion` hold the last line's share.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeResult {
    pub total: f64,
    pub fast_motion: f64,
    pub work_motion: f64,
}

/// Analyses an engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSettings {
    pub evaluate_macro: bool,
    pub verify_code_groups: bool,
    pub calculate_path: bool,
    pub ncsettings_code_analysis: bool,
    pub zero_point_analysis: bool,
    /// Report messages as if every line were line 1.
    pub single_line_output: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            evaluate_macro: true,
            verify_code_groups: true,
            calculate_path: true,
            ncsettings_code_analysis: true,
            zero_point_analysis: true,
            single_line_output: true,
        }
    }
}

impl ParserSettings {
    /// Line number to print in messages for `line`.
    pub fn reported_line(&self, line: SourceLine<'_>) -> usize {
        if self.single_line_output { 1 } else { line.number }
    }

    /// `"<n>: <msg>"`
    pub fn error(&self, line: SourceLine<'_>, msg: impl fmt::Display) -> LineError {
        LineError::new(format!("{}: {}", self.reported_line(line), msg))
    }

    /// `"<msg> in line <n>"`
    pub fn error_in_line(&self, line: SourceLine<'_>, msg: impl fmt::Display) -> LineError {
        LineError::new(format!("{} in line {}", msg, self.reported_line(line)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitConversion {
    MetricToImperial,
    ImperialToMetric,
}

impl UnitConversion {
    pub fn factor(self) -> f64 {
        match self {
            UnitConversion::MetricToImperial => 1.0 / 25.4,
            UnitConversion::ImperialToMetric => 25.4,
        }
    }

    /// Digits kept after the decimal point in converted values.
    pub fn decimals(self) -> usize {
        match self {
            UnitConversion::MetricToImperial => 4,
            UnitConversion::ImperialToMetric => 3,
        }
    }
}

/// Quarter-turn rotations about a machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AxesRotation {
    #[value(name = "x90")]
    X90,
    #[value(name = "x180")]
    X180,
    #[value(name = "x270")]
    X270,
    #[value(name = "y90")]
    Y90,
    #[value(name = "y180")]
    Y180,
    #[value(name = "y270")]
    Y270,
    #[value(name = "z90")]
    Z90,
    #[value(name = "z180")]
    Z180,
    #[value(name = "z270")]
    Z270,
}

impl AxesRotation {
    fn axis_and_turns(self) -> (usize, u8) {
        match self {
            AxesRotation::X90 => (0, 1),
            AxesRotation::X180 => (0, 2),
            AxesRotation::X270 => (0, 3),
            AxesRotation::Y90 => (1, 1),
            AxesRotation::Y180 => (1, 2),
            AxesRotation::Y270 => (1, 3),
            AxesRotation::Z90 => (2, 1),
            AxesRotation::Z180 => (2, 2),
            AxesRotation::Z270 => (2, 3),
        }
    }

    /// Where a component on `axis` (0 = X, 1 = Y, 2 = Z) ends up, and with which sign.
    pub fn remap(self, axis: usize) -> (usize, i32) {
        let (about, turns) = self.axis_and_turns();
        let (cos, sin) = match turns {
            1 => (0, 1),
            2 => (-1, 0),
            _ => (0, -1),
        };
        if axis == about {
            return (axis, 1);
        }
        // Right-handed: the axis after `about` turns towards the one after that.
        let first = (about + 1) % 3;
        let second = (about + 2) % 3;
        let (a, b) = if axis == first { (cos, sin) } else { (-sin, cos) };
        if a != 0 { (first, a) } else { (second, b) }
    }
}

/// The capabilities every dialect engine offers the pipeline.
///
/// Engines hold cumulative path/time counters and the macro table, so one
/// instance serves one parse of one document.
pub trait AttributeParser {
    fn set_ncsettings(&mut self, settings: &MachineSettings);

    fn parse(&mut self, line: SourceLine<'_>, out: &mut Vec<Attribute>) -> Result<(), LineError>;

    fn convert_length(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        conversion: UnitConversion,
    ) -> Result<(), LineError>;

    fn rotate_axes(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        rotation: AxesRotation,
    ) -> Result<(), LineError>;

    fn path_result(&self) -> PathResult;

    fn time_result(&self) -> TimeResult;

    fn macro_values(&self) -> MacroMap;

    fn reset_macro_values(&mut self);

    fn seed_macro_values(&mut self, values: &MacroMap);

    /// Write `attributes` back as program text, space separated.
    fn transcribe(&self, attributes: &[Attribute], text: &mut String) {
        let words: Vec<String> = attributes.iter().map(ToString::to_string).collect();
        text.push_str(&words.join(" "));
    }
}

/// Engine chosen by dialect family.
#[derive(Debug)]
pub enum Engine {
    Fanuc(FanucParser),
    Heidenhain(HeidenhainParser),
}

impl Engine {
    pub fn new(tables: Arc<DialectTables>, settings: ParserSettings) -> Self {
        if tables.dialect.family().is_fanuc_like() {
            Engine::Fanuc(FanucParser::new(tables, settings))
        } else {
            Engine::Heidenhain(HeidenhainParser::new(tables, settings))
        }
    }

    fn inner(&self) -> &dyn AttributeParser {
        match self {
            Engine::Fanuc(p) => p,
            Engine::Heidenhain(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn AttributeParser {
        match self {
            Engine::Fanuc(p) => p,
            Engine::Heidenhain(p) => p,
        }
    }
}

impl AttributeParser for Engine {
    fn set_ncsettings(&mut self, settings: &MachineSettings) {
        self.inner_mut().set_ncsettings(settings)
    }

    fn parse(&mut self, line: SourceLine<'_>, out: &mut Vec<Attribute>) -> Result<(), LineError> {
        self.inner_mut().parse(line, out)
    }

    fn convert_length(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        conversion: UnitConversion,
    ) -> Result<(), LineError> {
        self.inner_mut().convert_length(line, out, conversion)
    }

    fn rotate_axes(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        rotation: AxesRotation,
    ) -> Result<(), LineError> {
        self.inner_mut().rotate_axes(line, out, rotation)
    }

    fn path_result(&self) -> PathResult {
        self.inner().path_result()
    }

    fn time_result(&self) -> TimeResult {
        self.inner().time_result()
    }

    fn macro_values(&self) -> MacroMap {
        self.inner().macro_values()
    }

    fn reset_macro_values(&mut self) {
        self.inner_mut().reset_macro_values()
    }

    fn seed_macro_values(&mut self, values: &MacroMap) {
        self.inner_mut().seed_macro_values(values)
    }

    fn transcribe(&self, attributes: &[Attribute], text: &mut String) {
        self.inner().transcribe(attributes, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_remap() {
        // 90 degrees about X: Y -> Z, Z -> -Y
        assert_eq!(AxesRotation::X90.remap(0), (0, 1));
        assert_eq!(AxesRotation::X90.remap(1), (2, 1));
        assert_eq!(AxesRotation::X90.remap(2), (1, -1));

        // 90 degrees about Z: X -> Y, Y -> -X
        assert_eq!(AxesRotation::Z90.remap(0), (1, 1));
        assert_eq!(AxesRotation::Z90.remap(1), (0, -1));

        // 90 degrees about Y: Z -> X, X -> -Z
        assert_eq!(AxesRotation::Y90.remap(2), (0, 1));
        assert_eq!(AxesRotation::Y90.remap(0), (2, -1));

        assert_eq!(AxesRotation::Y180.remap(0), (0, -1));
        assert_eq!(AxesRotation::Z270.remap(0), (1, -1));
    }

    #[test]
    fn test_error_numbering() {
        let line = SourceLine {
            number: 7,
            text: "G01 X10",
        };
        let single = ParserSettings::default();
        assert_eq!(single.error(line, "boom").message(), "1: boom");
        assert_eq!(single.error_in_line(line, "boom").message(), "boom in line 1");

        let numbered = ParserSettings {
            single_line_output: false,
            ..ParserSettings::default()
        };
        assert_eq!(numbered.error(line, "boom").message(), "7: boom");
    }

    #[test]
    fn test_conversion_factors() {
        assert!((UnitConversion::MetricToImperial.factor() * 25.4 - 1.0).abs() < 1e-12);
        assert_eq!(UnitConversion::ImperialToMetric.decimals(), 3);
    }
}
