//! Heidenhain conversational engine
//!
//! Blocks start with a block number followed by a keyword (`L`, `C`, `CC`,
//! `TOOL CALL`, ...). There are no macro variables and transcription writes
//! nothing.

use std::f64::consts::PI;
use std::sync::Arc;

use crate::engine::motion::{distance, MotionTracker};
use crate::engine::words::{check_group_table, check_words, code_name};
use crate::engine::{
    AttributeParser, AxesRotation, LineError, MacroMap, ParserSettings, PathResult, SourceLine,
    TimeResult, UnitConversion,
};
use crate::parser::{tokenize_line, Attribute, DecimalAttribute, LexError};
use crate::settings::tables::AxisLimits;
use crate::settings::{DialectTables, MachineSettings, WordKind};

const AXES: [&str; 3] = ["X", "Y", "Z"];
const INCREMENTAL_AXES: [&str; 3] = ["IX", "IY", "IZ"];

/// Words of one block after validation.
#[derive(Debug, Default)]
struct Block<'a> {
    flags: Vec<&'a DecimalAttribute>,
    values: Vec<(&'a str, f64)>,
}

impl Block<'_> {
    fn flag(&self, word: &str) -> Option<&DecimalAttribute> {
        self.flags.iter().copied().find(|f| f.word == word)
    }

    fn value(&self, word: &str) -> Option<f64> {
        self.values.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
    }
}

#[derive(Debug)]
pub struct HeidenhainParser {
    tables: Arc<DialectTables>,
    settings: ParserSettings,
    motion: MotionTracker,
    metric: bool,
    feed: f64,
    /// Circle centre set by `CC`, XY plane
    centre: [f64; 2],
    limits: [Option<AxisLimits>; 3],
    zero: [f64; 3],
}

impl HeidenhainParser {
    pub fn new(tables: Arc<DialectTables>, settings: ParserSettings) -> Self {
        let defaults = MachineSettings::default();
        let mut parser = Self {
            tables,
            settings,
            motion: MotionTracker::new([0.0; 3], defaults.cnc_defaults.rapid_feed),
            metric: true,
            feed: 0.0,
            centre: [0.0; 2],
            limits: [None; 3],
            zero: [0.0; 3],
        };
        parser.set_ncsettings(&defaults);
        parser
    }

    fn unit(&self) -> f64 {
        if self.metric { 1.0 } else { 25.4 }
    }

    fn analyse(&mut self, line: SourceLine<'_>, out: &mut Vec<Attribute>) -> Result<(), LineError> {
        self.motion.begin_line();

        let upper = line.text.to_ascii_uppercase();
        let mut tokens = upper.split_whitespace().peekable();
        if tokens.peek().is_some_and(|t| t.chars().all(|c| c.is_ascii_digit())) {
            tokens.next();
        }
        let head: Vec<&str> = tokens.take(3).collect();
        match head.as_slice() {
            ["BEGIN", "PGM", ..] => {
                self.metric = !upper.split_whitespace().any(|t| t == "INCH");
                return Ok(());
            }
            ["END", "PGM", ..] | ["BLK", "FORM", ..] => return Ok(()),
            ["TOOL", "CALL", rest @ ..] => {
                if let Some(id) = rest.first().and_then(|t| t.parse::<u32>().ok()) {
                    self.motion.change_tool(id);
                }
                return Ok(());
            }
            _ => {}
        }

        tokenize_line(line.text, out).map_err(|e| match e {
            LexError::Unexpected(_) => LineError::unexplained(),
            other => self.settings.error(line, other),
        })?;
        check_words(&self.tables.word_grammar, &self.settings, line, out)?;

        let block = self.block(out);
        if self.settings.verify_code_groups {
            let m_codes: Vec<String> = block
                .values
                .iter()
                .filter(|(word, _)| *word == "M")
                .map(|(_, value)| code_name('M', *value))
                .collect();
            check_group_table(&self.tables.mcode_groups, &m_codes)
                .map_err(|msg| self.settings.error(line, msg))?;
        }

        if let Some(f) = block.value("F") {
            self.feed = f * self.unit();
        }
        if !self.settings.calculate_path {
            return Ok(());
        }

        if block.flag("CC").is_some() {
            let current = self.motion.position();
            let target = self.target(&block).unwrap_or(current);
            self.centre = [target[0], target[1]];
            return Ok(());
        }

        let is_line = block.flag("L").is_some();
        let is_circle = block.flag("C").is_some() || block.flag("CR").is_some();
        if !is_line && !is_circle {
            return Ok(());
        }
        let Some(target) = self.target(&block) else {
            return Ok(());
        };
        let limit_error = self.check_limits(target);

        let result = if is_line && block.flag("FMAX").is_some() {
            self.motion.rapid(target);
            Ok(())
        } else {
            let start = self.motion.position();
            let length = if is_line {
                Ok(distance(start, target))
            } else {
                self.arc_length(&block, start, target)
            };
            match length {
                Ok(length) => self.cut(target, length),
                Err(msg) => {
                    self.motion.set_position(target);
                    Err(self.settings.error(line, msg))
                }
            }
        };

        match limit_error {
            Some(msg) => Err(self.settings.error(line, msg)),
            None => result,
        }
    }

    fn block<'a>(&self, attributes: &'a [Attribute]) -> Block<'a> {
        let mut block = Block::default();
        for attr in attributes {
            let Attribute::Decimal(data) = attr else {
                continue;
            };
            match self.tables.word_grammar.rule(&data.word).map(|r| r.kind) {
                Some(WordKind::Flag) => block.flags.push(data),
                Some(WordKind::Integer | WordKind::Decimal) => {
                    if let Some(value) = data.literal_value() {
                        block.values.push((data.word.as_str(), value));
                    }
                }
                _ => {}
            }
        }
        block
    }

    fn target(&self, block: &Block<'_>) -> Option<[f64; 3]> {
        let current = self.motion.position();
        let unit = self.unit();
        let mut target = current;
        let mut moved = false;
        for axis in 0..3 {
            if let Some(value) = block.value(AXES[axis]) {
                target[axis] = value * unit + self.zero[axis];
                moved = true;
            }
            if let Some(delta) = block.value(INCREMENTAL_AXES[axis]) {
                target[axis] += delta * unit;
                moved = true;
            }
        }
        moved.then_some(target)
    }

    fn check_limits(&self, target: [f64; 3]) -> Option<String> {
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
        self.motion.cut(target, length, self.feed);
        if self.feed <= 0.0 && length > 0.0 {
            return Err(LineError::new("Feed rate is not specified for cutting motion"));
        }
        Ok(())
    }

    /// `C` turns around the `CC` centre; `CR` uses the radius `R`. `DR-` is clockwise.
    fn arc_length(&self, block: &Block<'_>, start: [f64; 3], end: [f64; 3]) -> Result<f64, String> {
        let clockwise = block.flag("DR").is_some_and(|dr| dr.sign == Some('-'));
        let helix = end[2] - start[2];

        let (sweep, radius) = if block.flag("CR").is_some() {
            let r = block.value("R").ok_or("CR requires a radius R")? * self.unit();
            let radius = r.abs();
            let chord = (end[0] - start[0]).hypot(end[1] - start[1]);
            if radius == 0.0 || chord > 2.0 * radius + 1e-6 {
                return Err(format!("Arc radius {:.3} is too small for the end point", radius));
            }
            let mut sweep = 2.0 * (chord / (2.0 * radius)).min(1.0).asin();
            if r < 0.0 {
                sweep = 2.0 * PI - sweep;
            }
            (sweep, radius)
        } else {
            let [cx, cy] = self.centre;
            let radius = (start[0] - cx).hypot(start[1] - cy);
            let end_radius = (end[0] - cx).hypot(end[1] - cy);
            if (radius - end_radius).abs() > 0.01 {
                return Err("Arc end point is not on the circle".to_string());
            }
            let start_angle = (start[1] - cy).atan2(start[0] - cx);
            let end_angle = (end[1] - cy).atan2(end[0] - cx);
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

        Ok((radius * sweep).hypot(helix))
    }
}

impl AttributeParser for HeidenhainParser {
    fn set_ncsettings(&mut self, settings: &MachineSettings) {
        self.metric = settings.cnc_defaults.metric;
        self.feed = settings.cnc_defaults.feed * self.unit();
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
        self.motion = MotionTracker::new(settings.machine_points.home, settings.cnc_defaults.rapid_feed);
    }

    fn parse(&mut self, line: SourceLine<'_>, out: &mut Vec<Attribute>) -> Result<(), LineError> {
        self.analyse(line, out)
    }

    fn convert_length(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        _conversion: UnitConversion,
    ) -> Result<(), LineError> {
        self.analyse(line, out)
    }

    fn rotate_axes(
        &mut self,
        line: SourceLine<'_>,
        out: &mut Vec<Attribute>,
        _rotation: AxesRotation,
    ) -> Result<(), LineError> {
        self.analyse(line, out)
    }

    fn path_result(&self) -> PathResult {
        self.motion.path()
    }

    fn time_result(&self) -> TimeResult {
        self.motion.time()
    }

    fn macro_values(&self) -> MacroMap {
        MacroMap::new()
    }

    fn reset_macro_values(&mut self) {}

    fn seed_macro_values(&mut self, _values: &MacroMap) {}

    fn transcribe(&self, _attributes: &[Attribute], _text: &mut String) {}
}
