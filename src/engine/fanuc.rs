//! Fanuc-family engine
//!
//! Serves Fanuc, Haas, Makino and generic controls. Each block goes through
//! the same steps: tokenize, grammar check, macro evaluation, code-group check,
//! then modal state and motion.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use crate::engine::motion::{distance, MotionTracker};
use crate::engine::words::{check_group_table, check_words, code_name};
use crate::engine::{
    AttributeParser, AxesRotation, LineError, MacroMap, ParserSettings, PathResult, SourceLine,
    TimeResult, UnitConversion,
};
use crate::parser::{evaluate, tokenize_line, Attribute, ExprError, LexError, Operand};
use crate::settings::tables::AxisLimits;
use crate::settings::{Dialect, DialectTables, MachineSettings, WordKind};

const AXES: [&str; 3] = ["X", "Y", "Z"];
const CENTRE_OFFSETS: [&str; 3] = ["I", "J", "K"];
const INCREMENTAL_AXES: [&str; 3] = ["U", "V", "W"];
const MM_PER_INCH: f64 = 25.4;
const ARC_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionMode {
    Rapid,
    Linear,
    Arc { clockwise: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plane {
    Xy,
    Zx,
    Yz,
}

impl Plane {
    /// (first, second, normal) axis indices, ordered so arcs turn counter-clockwise
    /// when seen from the positive normal.
    fn axes(self) -> (usize, usize, usize) {
        match self {
            Plane::Xy => (0, 1, 2),
            Plane::Zx => (2, 0, 1),
            Plane::Yz => (1, 2, 0),
        }
    }
}

/// Active drilling cycle, levels in machine coordinates.
#[derive(Debug, Clone, Copy)]
struct Cycle {
    initial: f64,
    r_level: f64,
    depth: f64,
}

#[derive(Debug, Clone)]
struct Modal {
    motion: MotionMode,
    plane: Plane,
    absolute: bool,
    metric: bool,
    /// mm/min, or mm/rev when `feed_per_rev`
    feed: f64,
    feed_per_rev: bool,
    spindle: f64,
    cycle: Option<Cycle>,
    return_to_initial: bool,
}

impl Modal {
    fn new(turning: bool) -> Self {
        Self {
            motion: MotionMode::Rapid,
            plane: if turning { Plane::Zx } else { Plane::Xy },
            absolute: true,
            metric: true,
            feed: 0.0,
            feed_per_rev: false,
            spindle: 0.0,
            cycle: None,
            return_to_initial: true,
        }
    }

    /// Millimetres per programmed unit.
    fn unit(&self) -> f64 {
        if self.metric { 1.0 } else { MM_PER_INCH }
    }

    fn feed_per_minute(&self) -> f64 {
        if self.feed_per_rev {
            self.feed * self.spindle
        } else {
            self.feed
        }
    }
}

/// Evaluated words of one block.
#[derive(Debug, Default)]
struct Block {
    g_codes: Vec<String>,
    m_codes: Vec<String>,
    words: HashMap<String, f64>,
}

impl Block {
    fn word(&self, word: &str) -> Option<f64> {
        self.words.get(word).copied()
    }
}

#[derive(Debug)]
pub struct FanucParser {
    tables: Arc<DialectTables>,
    settings: ParserSettings,
    macros: MacroMap,
    motion: MotionTracker,
    modal: Modal,
    limits: [Option<AxisLimits>; 3],
    zero: [f64; 3],
    home: [f64; 3],
}

impl FanucParser {
    pub fn new(tables: Arc<DialectTables>, settings: ParserSettings) -> Self {
        let defaults = MachineSettings::default();
        let modal = Modal::new(is_turning(tables.dialect));
        let mut parser = Self {
            tables,
            settings,
            macros: MacroMap::new(),
            motion: MotionTracker::new([0.0; 3], defaults.cnc_defaults.rapid_feed),
            modal,
            limits: [None; 3],
            zero: [0.0; 3],
            home: [0.0; 3],
        };
        parser.set_ncsettings(&defaults);
        parser
    }

    /// Every check and state update for one block, leaving its attributes in `out`.
    fn analyse(&mut self, line: SourceLine<'_>, out: &mut Vec<Attribute>) -> Result<(), LineError> {
        self.motion.begin_line();
        tokenize_line(line.text, out).map_err(|e| self.lex_error(line, e))?;
        check_words(&self.tables.word_grammar, &self.settings, line, out)?;
        let block = self.evaluate_block(line, out)?;
        self.check_code_groups(line, &block)?;
        if self.settings.calculate_path {
            self.execute(line, &block)?;
        }
        Ok(())
    }

    fn lex_error(&self, line: SourceLine<'_>, err: LexError) -> LineError {
        match err {
            // The block text itself is the best explanation.
            LexError::Unexpected(_) => LineError::unexplained(),
            other => self.settings.error(line, other),
        }
    }

    fn expr_error(&self, line: SourceLine<'_>, err: ExprError) -> LineError {
        match err {
            ExprError::UndefinedVariable(_) => self.settings.error_in_line(line, err),
            other => self.settings.error(line, other),
        }
    }

    fn evaluate_block(&mut self, line: SourceLine<'_>, attributes: &[Attribute]) -> Result<Block, LineError> {
        let tables = Arc::clone(&self.tables);
        let mut block = Block::default();

        for attr in attributes {
            match attr {
                Attribute::Assign(assign) => {
                    if !self.settings.evaluate_macro {
                        continue;
                    }
                    if assign.variable == 0 {
                        return Err(self.settings.error(line, "Macro variable #0 is read-only"));
                    }
                    let value = evaluate(&assign.expression, &self.macros, &tables.operations)
                        .map_err(|e| self.expr_error(line, e))?;
                    log::trace!("#{} = {}", assign.variable, value);
                    self.macros.insert(assign.variable, value);
                }
                Attribute::Decimal(data) => {
                    let Some(rule) = tables.word_grammar.rule(&data.word) else {
                        continue;
                    };
                    if matches!(rule.kind, WordKind::Keyword | WordKind::Flag) {
                        continue;
                    }
                    let value = match &data.operand {
                        Operand::Literal { .. } => data.literal_value(),
                        Operand::Macro(n) if self.settings.evaluate_macro => {
                            let value = self.macros.get(n).copied().ok_or_else(|| {
                                self.expr_error(line, ExprError::UndefinedVariable(*n))
                            })?;
                            Some(data.apply_sign(value))
                        }
                        Operand::Expression(expr) if self.settings.evaluate_macro => {
                            let value = evaluate(expr, &self.macros, &tables.operations)
                                .map_err(|e| self.expr_error(line, e))?;
                            Some(data.apply_sign(value))
                        }
                        _ => None,
                    };
                    let Some(value) = value else {
                        continue;
                    };
                    if !value.is_finite() {
                        return Err(self
                            .settings
                            .error(line, format!("Value of word '{}' is out of range", data.word)));
                    }
                    match data.word.as_str() {
                        "G" => block.g_codes.push(code_name('G', value)),
                        "M" => block.m_codes.push(code_name('M', value)),
                        word => {
                            if block.words.insert(word.to_string(), value).is_some() {
                                return Err(self
                                    .settings
                                    .error(line, format!("Word '{}' appears more than once", word)));
                            }
                        }
                    }
                }
                Attribute::Text(_) | Attribute::Char(_) => {}
            }
        }

        Ok(block)
    }

    fn check_code_groups(&self, line: SourceLine<'_>, block: &Block) -> Result<(), LineError> {
        if !self.settings.verify_code_groups {
            return Ok(());
        }
        check_group_table(&self.tables.gcode_groups, &block.g_codes)
            .and_then(|_| check_group_table(&self.tables.mcode_groups, &block.m_codes))
            .map_err(|msg| self.settings.error(line, msg))
    }

    fn execute(&mut self, line: SourceLine<'_>, block: &Block) -> Result<(), LineError> {
        let mut dwell = false;
        let mut go_home = false;
        let mut data_only = false;
        let mut starts_cycle = false;

        for code in &block.g_codes {
            match code.as_str() {
                "G0" => self.set_motion(MotionMode::Rapid),
                "G1" => self.set_motion(MotionMode::Linear),
                "G2" => self.set_motion(MotionMode::Arc { clockwise: true }),
                "G3" => self.set_motion(MotionMode::Arc { clockwise: false }),
                "G4" => dwell = true,
                "G10" | "G65" => data_only = true,
                "G17" => self.modal.plane = Plane::Xy,
                "G18" => self.modal.plane = Plane::Zx,
                "G19" => self.modal.plane = Plane::Yz,
                "G20" => self.modal.metric = false,
                "G21" => self.modal.metric = true,
                "G28" => go_home = true,
                "G80" => self.modal.cycle = None,
                "G73" | "G74" | "G76" | "G81" | "G82" | "G83" | "G84" | "G85" | "G86"
                | "G87" | "G88" | "G89" => starts_cycle = true,
                "G90" => self.modal.absolute = true,
                "G91" => self.modal.absolute = false,
                "G94" => self.modal.feed_per_rev = false,
                "G95" => self.modal.feed_per_rev = true,
                "G98" => self.modal.return_to_initial = true,
                "G99" => self.modal.return_to_initial = false,
                _ => {}
            }
        }

        if let Some(f) = block.word("F") {
            self.modal.feed = f * self.modal.unit();
        }
        if let Some(s) = block.word("S") {
            self.modal.spindle = s;
        }
        if let Some(t) = block.word("T") {
            self.motion.change_tool(t.max(0.0) as u32);
        }

        if dwell {
            return self.dwell(line, block);
        }
        if data_only {
            return Ok(());
        }

        let Some(target) = self.target(block) else {
            if starts_cycle {
                return Err(self.settings.error(line, "Canned cycle requires a Z depth"));
            }
            return Ok(());
        };
        let limit_error = self.check_limits(target);

        let result = if go_home {
            self.motion.rapid(target);
            let mut home = target;
            for axis in 0..3 {
                if self.axis_given(block, axis) {
                    home[axis] = self.home[axis];
                }
            }
            self.motion.rapid(home);
            Ok(())
        } else if starts_cycle || self.modal.cycle.is_some() {
            self.drill(line, block, starts_cycle, target)
        } else {
            match self.modal.motion {
                MotionMode::Rapid => {
                    self.motion.rapid(target);
                    Ok(())
                }
                MotionMode::Linear => {
                    let length = distance(self.motion.position(), target);
                    self.cut(target, length)
                }
                MotionMode::Arc { clockwise } => {
                    let start = self.motion.position();
                    match self.arc_length(block, start, target, clockwise) {
                        Ok(length) => self.cut(target, length),
                        Err(msg) => {
                            self.motion.set_position(target);
                            Err(self.settings.error(line, msg))
                        }
                    }
                }
            }
        };

        match limit_error {
            Some(msg) => Err(self.settings.error(line, msg)),
            None => result,
        }
    }

    fn set_motion(&mut self, mode: MotionMode) {
        self.modal.motion = mode;
        self.modal.cycle = None;
    }

    fn dwell(&mut self, line: SourceLine<'_>, block: &Block) -> Result<(), LineError> {
        let seconds = block
            .word("P")
            .map(|ms| ms / 1000.0)
            .or_else(|| block.word("X"))
            .or_else(|| block.word("U"))
            .ok_or_else(|| self.settings.error(line, "Dwell requires P or X"))?;
        self.motion.dwell(seconds);
        Ok(())
    }

    fn axis_given(&self, block: &Block, axis: usize) -> bool {
        block.words.contains_key(AXES[axis])
            || (self.incremental_addresses() && block.words.contains_key(INCREMENTAL_AXES[axis]))
    }

    fn incremental_addresses(&self) -> bool {
        matches!(
            self.tables.dialect,
            Dialect::FanucLatheSystemA
                | Dialect::FanucMillturnSystemA
                | Dialect::GenericLathe
                | Dialect::HaasLathe
        )
    }

    /// End point of the block in machine coordinates, or `None` without axis words.
    fn target(&self, block: &Block) -> Option<[f64; 3]> {
        let current = self.motion.position();
        let unit = self.modal.unit();
        let mut target = current;
        let mut moved = false;

        for axis in 0..3 {
            if let Some(value) = block.word(AXES[axis]) {
                moved = true;
                target[axis] = if self.modal.absolute {
                    value * unit + self.zero[axis]
                } else {
                    current[axis] + value * unit
                };
            }
            if self.incremental_addresses() {
                if let Some(delta) = block.word(INCREMENTAL_AXES[axis]) {
                    moved = true;
                    target[axis] += delta * unit;
                }
            }
        }

        moved.then_some(target)
    }

    fn check_limits(&self, target: [f64; 3]) -> Option<String> {
        if !self.settings.ncsettings_code_analysis {
            return None;
        }
        self.limits.iter().enumerate().find_map(|(axis, limits)| {
            let limits = limits.as_ref()?;
            (!limits.contains(target[axis])).then(|| {
                format!(
                    "{} {:.3} is outside the machine travel [{}, {}]",
                    AXES[axis], target[axis], limits.min, limits.max
                )
            })
        })
    }

    fn cut(&mut self, target: [f64; 3], length: f64) -> Result<(), LineError> {
        let feed = self.modal.feed_per_minute();
        self.motion.cut(target, length, feed.max(0.0));
        if !(feed.is_finite() && feed > 0.0) && length > 0.0 {
            // No line prefix: the pipeline adds one.
            return Err(LineError::new("Feed rate is not specified for cutting motion"));
        }
        Ok(())
    }

    fn drill(
        &mut self,
        line: SourceLine<'_>,
        block: &Block,
        starts_cycle: bool,
        target: [f64; 3],
    ) -> Result<(), LineError> {
        let current = self.motion.position();
        let unit = self.modal.unit();
        let level = |value: f64, absolute: bool, zero: f64, from: f64| {
            if absolute { value * unit + zero } else { from + value * unit }
        };

        let mut cycle = match self.modal.cycle {
            Some(cycle) if !starts_cycle => cycle,
            _ => {
                if block.word("Z").is_none() {
                    return Err(self.settings.error(line, "Canned cycle requires a Z depth"));
                }
                Cycle {
                    initial: current[2],
                    r_level: current[2],
                    depth: current[2],
                }
            }
        };
        if let Some(r) = block.word("R") {
            cycle.r_level = level(r, self.modal.absolute, self.zero[2], cycle.initial);
        }
        if block.word("Z").is_some() {
            cycle.depth = target[2];
        }
        self.modal.cycle = Some(cycle);

        let (x, y) = (target[0], target[1]);
        self.motion.rapid([x, y, current[2]]);
        self.motion.rapid([x, y, cycle.r_level]);
        let depth = (cycle.r_level - cycle.depth).abs();
        let result = self.cut([x, y, cycle.depth], depth);
        let retract = if self.modal.return_to_initial {
            cycle.initial
        } else {
            cycle.r_level
        };
        self.motion.rapid([x, y, retract]);
        result
    }

    /// Length of a circular (or helical) move in the active plane.
    fn arc_length(
        &self,
        block: &Block,
        start: [f64; 3],
        end: [f64; 3],
        clockwise: bool,
    ) -> Result<f64, String> {
        let (a, b, normal) = self.modal.plane.axes();
        let unit = self.modal.unit();
        let chord = (end[a] - start[a]).hypot(end[b] - start[b]);

        let (sweep, radius) = if let Some(r) = block.word("R") {
            let radius = (r * unit).abs();
            if radius == 0.0 {
                return Err("Arc radius must not be zero".to_string());
            }
            if chord > 2.0 * radius + 1e-6 {
                return Err(format!("Arc radius {:.3} is too small for the end point", radius));
            }
            let mut sweep = 2.0 * (chord / (2.0 * radius)).min(1.0).asin();
            if r < 0.0 {
                sweep = 2.0 * PI - sweep;
            }
            (sweep, radius)
        } else {
            let offset_a = block.word(CENTRE_OFFSETS[a]);
            let offset_b = block.word(CENTRE_OFFSETS[b]);
            if offset_a.is_none() && offset_b.is_none() {
                return Err("Arc requires R or I/J/K".to_string());
            }
            let centre_a = start[a] + offset_a.unwrap_or(0.0) * unit;
            let centre_b = start[b] + offset_b.unwrap_or(0.0) * unit;
            let radius = (start[a] - centre_a).hypot(start[b] - centre_b);
            let end_radius = (end[a] - centre_a).hypot(end[b] - centre_b);
            if (radius - end_radius).abs() > ARC_TOLERANCE {
                return Err("Arc end point is not on the circle".to_string());
            }
            let start_angle = (start[b] - centre_b).atan2(start[a] - centre_a);
            let end_angle = (end[b] - centre_b).atan2(end[a] - centre_a);
            let turn = if clockwise {
                start_angle - end_angle
            } else {
                end_angle - start_angle
            };
            let mut sweep = turn.rem_euclid(2.0 * PI);
            if sweep < 1e-9 {
                sweep = 2.0 * PI;
            }
            (sweep, radius)
        };

        Ok((radius * sweep).hypot(end[normal] - start[normal]))
    }

    fn rewrite_lengths(&self, out: &mut [Attribute], conversion: UnitConversion) {
        for attr in out.iter_mut() {
            let Attribute::Decimal(data) = attr else {
                continue;
            };
            if data.word == "G" {
                let swapped = match (conversion, data.literal_value()) {
                    (UnitConversion::MetricToImperial, Some(v)) if v == 21.0 => "20",
                    (UnitConversion::ImperialToMetric, Some(v)) if v == 20.0 => "21",
                    _ => continue,
                };
                data.operand = Operand::Literal {
                    integer: swapped.to_string(),
                    fraction: None,
                };
                continue;
            }
            let is_length = self
                .tables
                .word_grammar
                .rule(&data.word)
                .is_some_and(|rule| rule.length);
            if !is_length {
                continue;
            }
            match data.literal_value() {
                Some(value) => data.set_literal(value * conversion.factor(), conversion.decimals()),
                None => log::debug!("leaving {} unconverted", Attribute::Decimal(data.clone())),
            }
        }
    }

    fn rewrite_axes(out: &mut [Attribute], rotation: AxesRotation) {
        for attr in out.iter_mut() {
            let Attribute::Decimal(data) = attr else {
                continue;
            };
            let letters = if let Some(axis) = AXES.iter().position(|a| *a == data.word) {
                Some((AXES, axis))
            } else {
                CENTRE_OFFSETS
                    .iter()
                    .position(|a| *a == data.word)
                    .map(|axis| (CENTRE_OFFSETS, axis))
            };
            let Some((letters, axis)) = letters else {
                continue;
            };
            let (to, sign) = rotation.remap(axis);
            data.word = letters[to].to_string();
            if sign < 0 {
                data.negate();
            }
        }
    }
}

impl AttributeParser for FanucParser {
    fn set_ncsettings(&mut self, settings: &MachineSettings) {
        let defaults = &settings.cnc_defaults;
        self.modal.metric = defaults.metric;
        self.modal.absolute = defaults.absolute;
        self.modal.feed = defaults.feed * self.modal.unit();
        self.home = settings.machine_points.home;
        self.zero = if self.settings.zero_point_analysis {
            settings.zero_point.offset()
        } else {
            [0.0; 3]
        };
        self.limits = if self.settings.ncsettings_code_analysis {
            settings.kinematics.limits()
        } else {
            [None; 3]
        };
        self.motion = MotionTracker::new(self.home, defaults.rapid_feed);
    }

    fn parse(&mut self, line: SourceLine<'_>, out: &mut Vec<Attribute>) -> Result<(), LineError> {
        self.analyse(line, out)
    }

    fn convert_length(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        conversion: UnitConversion,
    ) -> Result<(), LineError> {
        let result = self.analyse(line, out);
        self.rewrite_lengths(out, conversion);
        result
    }

    fn rotate_axes(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        rotation: AxesRotation,
    ) -> Result<(), LineError> {
        let result = self.analyse(line, out);
        Self::rewrite_axes(out, rotation);
        result
    }

    fn path_result(&self) -> PathResult {
        self.motion.path()
    }

    fn time_result(&self) -> TimeResult {
        self.motion.time()
    }

    fn macro_values(&self) -> MacroMap {
        self.macros.clone()
    }

    fn reset_macro_values(&mut self) {
        self.macros.clear();
    }

    fn seed_macro_values(&mut self, values: &MacroMap) {
        self.macros.extend(values);
    }
}

fn is_turning(dialect: Dialect) -> bool {
    matches!(
        dialect,
        Dialect::FanucLatheSystemA
            | Dialect::FanucLatheSystemB
            | Dialect::FanucLatheSystemC
            | Dialect::GenericLathe
            | Dialect::HaasLathe
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::settings::ConfigResolver;
    use crate::settings::tables::Kinematics;

    fn tables(dialect: Dialect) -> Arc<DialectTables> {
        let mut resolver = ConfigResolver::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")), None);
        resolver.resolve(dialect).expect("fixture tables")
    }

    fn mill() -> FanucParser {
        FanucParser::new(tables(Dialect::FanucMill), ParserSettings::default())
    }

    fn run(parser: &mut FanucParser, number: usize, text: &str) -> Result<Vec<Attribute>, String> {
        let mut out = Vec::new();
        parser
            .parse(SourceLine { number, text }, &mut out)
            .map(|_| out)
            .map_err(LineError::into_message)
    }

    fn text_of(attrs: &[Attribute]) -> String {
        let mut text = String::new();
        mill().transcribe(attrs, &mut text);
        text
    }

    #[test]
    fn test_valid_program() {
        let mut parser = mill();
        for (n, line) in ["%", "O1000", "N10 G21 G90 G17", "N20 T1 M06", "N30 G00 X0 Y0", "N40 M30"]
            .iter()
            .enumerate()
        {
            assert!(run(&mut parser, n + 1, line).is_ok(), "line {line}");
        }
    }

    #[test]
    fn test_word_and_code_errors() {
        let mut parser = mill();
        assert_eq!(run(&mut parser, 4, "G01 E5"), Err("1: Unknown word 'E'".to_string()));
        assert_eq!(run(&mut parser, 4, "G123"), Err("1: Unknown code G123".to_string()));
        assert_eq!(
            run(&mut parser, 4, "G00 G01 X1"),
            Err("1: Codes G0 and G1 of group 1 cannot be used in the same block".to_string())
        );
        assert_eq!(run(&mut parser, 4, "X1 X2"), Err("1: Word 'X' appears more than once".to_string()));
        assert_eq!(run(&mut parser, 4, "G01 X1 @"), Err(String::new()));
        // group 0 codes may share a block
        assert!(run(&mut parser, 4, "G04 G10 P100").is_ok());
    }

    #[test]
    fn test_macro_evaluation() {
        let mut parser = mill();
        assert!(run(&mut parser, 1, "#1 = 2").is_ok());
        assert!(run(&mut parser, 2, "#2 = [#1 * 3 + SQRT[16]]").is_ok());
        assert_eq!(parser.macro_values().get(&2), Some(&10.0));
        assert!(run(&mut parser, 3, "G00 X#2 Y-#1").is_ok());
        assert_eq!(parser.motion.position(), [10.0, -2.0, 0.0]);

        assert_eq!(
            run(&mut parser, 4, "G00 X#9"),
            Err("Undefined macro variable #9 in line 1".to_string())
        );
        assert_eq!(
            run(&mut parser, 5, "#0 = 1"),
            Err("1: Macro variable #0 is read-only".to_string())
        );
    }

    #[test]
    fn test_seeded_macros_survive_reset() {
        let mut parser = mill();
        parser.seed_macro_values(&MacroMap::from([(5, 1.5)]));
        assert!(run(&mut parser, 1, "G00 Z#5").is_ok());
        parser.reset_macro_values();
        assert!(parser.macro_values().is_empty());
    }

    #[test]
    fn test_feed_required_for_cutting() {
        let mut parser = mill();
        assert_eq!(
            run(&mut parser, 1, "G01 X10"),
            Err("Feed rate is not specified for cutting motion".to_string())
        );
        // position still advances
        assert_eq!(parser.motion.position()[0], 10.0);
        assert!(run(&mut parser, 2, "G01 X20 F600").is_ok());
        let path = parser.path_result();
        assert_eq!(path.work_motion, 10.0);
        assert!((parser.time_result().work_motion - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rapid_time_uses_machine_rapid_rate() {
        let mut parser = mill();
        let mut settings = MachineSettings::default();
        settings.cnc_defaults.rapid_feed = 6000.0;
        parser.set_ncsettings(&settings);
        assert!(run(&mut parser, 1, "G00 X100").is_ok());
        assert!((parser.time_result().total - 1.0).abs() < 1e-9);
        assert_eq!(parser.path_result().fast_motion, 100.0);
    }

    #[test]
    fn test_arc_lengths() {
        let mut parser = mill();
        assert!(run(&mut parser, 1, "G00 X10 Y0").is_ok());
        // quarter circle of radius 10 around the origin
        assert!(run(&mut parser, 2, "G03 X0 Y10 I-10 J0 F100").is_ok());
        let quarter = PI * 10.0 / 2.0;
        assert!((parser.path_result().work_motion - quarter).abs() < 1e-6);

        // same end point by radius
        assert!(run(&mut parser, 3, "G00 X10 Y0").is_ok());
        assert!(run(&mut parser, 4, "G03 X0 Y10 R10").is_ok());
        assert!((parser.path_result().work_motion - quarter).abs() < 1e-6);

        assert_eq!(
            run(&mut parser, 5, "G02 X50 Y10 R1"),
            Err("1: Arc radius 1.000 is too small for the end point".to_string())
        );
        assert_eq!(run(&mut parser, 6, "G02 X0 Y0"), Err("1: Arc requires R or I/J/K".to_string()));
    }

    #[test]
    fn test_inch_mode_scales_to_millimetres() {
        let mut parser = mill();
        assert!(run(&mut parser, 1, "G20 G00 X1").is_ok());
        assert!((parser.path_result().total - 25.4).abs() < 1e-9);
    }

    #[test]
    fn test_dwell_adds_time_only() {
        let mut parser = mill();
        assert!(run(&mut parser, 1, "G04 P1500").is_ok());
        assert!((parser.time_result().total - 1.5).abs() < 1e-9);
        assert_eq!(parser.path_result().total, 0.0);
        assert_eq!(run(&mut parser, 2, "G04"), Err("1: Dwell requires P or X".to_string()));
    }

    #[test]
    fn test_tool_path_and_home_return() {
        let mut parser = mill();
        assert!(run(&mut parser, 1, "G00 X10").is_ok());
        assert!(run(&mut parser, 2, "T2 M06").is_ok());
        assert!(run(&mut parser, 3, "G00 X15").is_ok());
        let path = parser.path_result();
        assert_eq!((path.tool_id, path.tool_total, path.total), (2, 5.0, 15.0));

        assert!(run(&mut parser, 4, "G28 X20").is_ok());
        assert_eq!(parser.motion.position(), [0.0, 0.0, 0.0]);
        assert_eq!(parser.path_result().total, 40.0);
    }

    #[test]
    fn test_drilling_cycle() {
        let mut parser = mill();
        assert!(run(&mut parser, 1, "G00 X0 Y0 Z10").is_ok());
        let before = parser.path_result().total;
        assert!(run(&mut parser, 2, "G81 X10 Y0 Z-5 R2 F100").is_ok());
        // 10 across, 8 down to R, 7 drilled, 15 back up
        let path = parser.path_result();
        assert!((path.total - before - 40.0).abs() < 1e-9);
        assert!((path.work_motion - 7.0).abs() < 1e-9);
        assert!(run(&mut parser, 3, "X20").is_ok());
        assert!((parser.path_result().total - before - 80.0).abs() < 1e-9);
        assert!(run(&mut parser, 4, "G80").is_ok());
        assert_eq!(run(&mut parser, 5, "G81 R2"), Err("1: Canned cycle requires a Z depth".to_string()));
    }

    #[test]
    fn test_travel_limits() {
        let mut parser = mill();
        let settings = MachineSettings {
            kinematics: Kinematics {
                x: Some(AxisLimits { min: 0.0, max: 500.0 }),
                ..Kinematics::default()
            },
            ..MachineSettings::default()
        };
        parser.set_ncsettings(&settings);
        assert!(run(&mut parser, 1, "G00 X500").is_ok());
        assert_eq!(
            run(&mut parser, 2, "G00 X600"),
            Err("1: X 600.000 is outside the machine travel [0, 500]".to_string())
        );
    }

    #[test]
    fn test_convert_length_to_imperial() {
        let mut parser = mill();
        let mut out = Vec::new();
        let line = SourceLine {
            number: 1,
            text: "G21 G01 X25.4 Y-12.7 F254 S1000",
        };
        assert!(parser.convert_length(line, &mut out, UnitConversion::MetricToImperial).is_ok());
        assert_eq!(text_of(&out), "G20 G01 X1. Y-0.5 F10. S1000");
    }

    #[test]
    fn test_convert_length_to_metric_keeps_macros() {
        let mut parser = mill();
        let mut out = Vec::new();
        assert!(run(&mut parser, 1, "#1 = 1").is_ok());
        let line = SourceLine {
            number: 2,
            text: "G20 G00 X#1 Z0.5",
        };
        assert!(parser.convert_length(line, &mut out, UnitConversion::ImperialToMetric).is_ok());
        assert_eq!(text_of(&out), "G21 G00 X#1 Z12.7");
    }

    #[test]
    fn test_rotate_axes() {
        let mut parser = mill();
        let mut out = Vec::new();
        let line = SourceLine {
            number: 1,
            text: "G02 X-6 Y8 I-3 J4 F100",
        };
        assert!(parser.rotate_axes(line, &mut out, AxesRotation::Z90).is_ok());
        assert_eq!(text_of(&out), "G02 Y-6 X-8 J-3 I-4 F100");
    }
}
