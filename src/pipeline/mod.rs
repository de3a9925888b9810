//! Parse-and-Annotate Pipeline
//!
//! Drives an engine over every non-blank line of a snapshot and collects
//! diagnostics, path/time annotations and the rewritten program text.

pub mod annotate;
pub mod message;
pub mod mode;

use crate::engine::{AttributeParser, Engine, MacroMap, ParserSettings, SourceLine};
use crate::error::ConfigurationError;
use crate::settings::{ConfigResolver, Dialect};

pub use annotate::{format_time, PathTimeAccumulator, PathTimeResult, TOLERANCE};
pub use message::relocate;
pub use mode::{Mode, ModeFlags};

/// A message attached to a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    pub line: usize,
    pub message: String,
}

/// Everything one run produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub diagnostics: Vec<LineDiagnostic>,
    pub path_time: PathTimeResult,
    /// Rewritten program, one line per block (conversion and rotation modes)
    pub transcript: String,
}

impl ParseOutcome {
    /// Outcome of a run that could not start: one diagnostic at line 1.
    pub fn aborted(err: &ConfigurationError) -> Self {
        Self {
            diagnostics: vec![LineDiagnostic {
                line: 1,
                message: err.to_string(),
            }],
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }
}

/// Resolves configuration and runs a fresh engine per parse.
#[derive(Debug)]
pub struct Pipeline {
    resolver: ConfigResolver,
    parser_settings: ParserSettings,
}

impl Pipeline {
    pub fn new(resolver: ConfigResolver) -> Self {
        Self {
            resolver,
            parser_settings: ParserSettings::default(),
        }
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut ConfigResolver {
        &mut self.resolver
    }

    /// Parse `text` as `dialect` (unless the machine settings name another).
    ///
    /// `macros` seeds the engine and receives its final bindings. A
    /// configuration failure leaves it untouched.
    pub fn run(&mut self, text: &str, dialect: Dialect, mode: Mode, macros: &mut MacroMap) -> ParseOutcome {
        let machine = match self.resolver.settings() {
            Ok(machine) => machine,
            Err(err) => {
                log::warn!("{}", err);
                return ParseOutcome::aborted(&err);
            }
        };
        let dialect = machine.dialect.unwrap_or(dialect);
        let tables = match self.resolver.resolve(dialect) {
            Ok(tables) => tables,
            Err(err) => {
                log::warn!("{} ({:?})", err, err);
                return ParseOutcome::aborted(&err);
            }
        };

        let mut engine = Engine::new(tables, self.parser_settings);
        engine.set_ncsettings(&machine);
        drive(&mut engine, text, mode, macros)
    }
}

/// Run `engine` over `text`. Usable with any engine, not only the built-in ones.
pub fn drive<P>(engine: &mut P, text: &str, mode: Mode, macros: &mut MacroMap) -> ParseOutcome
where
    P: AttributeParser + ?Sized,
{
    engine.reset_macro_values();
    engine.seed_macro_values(macros);

    let mut outcome = ParseOutcome::default();
    let mut accumulator = PathTimeAccumulator::default();
    let mut attributes = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        attributes.clear();
        let line = SourceLine {
            number,
            text: trimmed,
        };
        let result = match mode {
            Mode::Parse | Mode::PathTime => engine.parse(line, &mut attributes),
            Mode::ConvertLength(conversion) => engine.convert_length(line, &mut attributes, conversion),
            Mode::RotateAxes(rotation) => engine.rotate_axes(line, &mut attributes, rotation),
        };

        if let Err(err) = result {
            let message = relocate(err.message(), number, trimmed);
            log::debug!("{}", message);
            outcome.diagnostics.push(LineDiagnostic {
                line: number,
                message,
            });
        }

        if mode.writes_transcript() {
            let before = outcome.transcript.len();
            engine.transcribe(&attributes, &mut outcome.transcript);
            if outcome.transcript.len() > before {
                outcome.transcript.push('\n');
            }
        }

        if mode == Mode::PathTime {
            if let Some((key, annotation)) =
                accumulator.observe(number, engine.path_result(), engine.time_result())
            {
                outcome.path_time.insert(key, annotation);
            }
        }
    }

    *macros = engine.macro_values();
    log::debug!(
        "parsed {} lines: {} diagnostics, {} annotations",
        text.lines().count(),
        outcome.diagnostics.len(),
        outcome.path_time.len()
    );
    outcome
}
