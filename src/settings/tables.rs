//! Table types read from the `conf/` tree and the machine settings file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::codes::normalize_code;
use crate::error::TableError;
use crate::settings::Dialect;

/// How the value after a word is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordKind {
    /// Whole numbers only (`N10`, `M3`).
    Integer,
    /// Any number (`X10.5`).
    Decimal,
    /// No value (`FMAX`, `RL`).
    Flag,
    /// Control keyword; the value, if any, is not evaluated (`IF[...]`, `GOTO10`).
    Keyword,
}

/// Grammar entry for one word.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WordRule {
    pub kind: WordKind,
    #[serde(default = "default_allow_macro")]
    pub allow_macro: bool,
    /// Carries a length; scaled by unit conversion.
    #[serde(default)]
    pub length: bool,
}

fn default_allow_macro() -> bool {
    true
}

/// Words accepted by a dialect, keyed by upper-case word text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordGrammar {
    words: HashMap<String, WordRule>,
}

impl WordGrammar {
    pub fn new(words: HashMap<String, WordRule>) -> Self {
        Self { words }
    }

    pub fn rule(&self, word: &str) -> Option<&WordRule> {
        self.words.get(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Operators and functions allowed inside macro expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operations(Vec<String>);

impl Operations {
    pub fn new(ops: Vec<String>) -> Self {
        Self(ops.into_iter().map(|op| op.to_ascii_uppercase()).collect())
    }

    pub fn allows(&self, op: &str) -> bool {
        self.0.iter().any(|o| o.eq_ignore_ascii_case(op))
    }
}

#[derive(Debug, Deserialize)]
struct GrammarFile {
    words: HashMap<String, WordRule>,
    #[serde(default)]
    operations: Vec<String>,
}

/// A set of mutually exclusive codes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeGroup {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub codes: Vec<String>,
}

/// Code groups for one code letter (G or M), in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeGroupTable {
    groups: Vec<CodeGroup>,
    index: HashMap<String, u32>,
}

impl CodeGroupTable {
    pub fn new(groups: Vec<CodeGroup>) -> Self {
        let index = groups
            .iter()
            .flat_map(|g| g.codes.iter().map(move |c| (normalize_code(c), g.id)))
            .collect();
        Self { groups, index }
    }

    /// Group id of a code, accepting any zero padding (`G1` == `G01`).
    pub fn group_of(&self, code: &str) -> Option<u32> {
        self.index.get(&normalize_code(code)).copied()
    }

    /// All codes as written in the table, in table order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flat_map(|g| g.codes.iter().map(String::as_str))
    }

    pub fn groups(&self) -> &[CodeGroup] {
        &self.groups
    }
}

/// Everything the engine needs from `conf/<dialect>/`.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectTables {
    pub dialect: Dialect,
    pub word_grammar: WordGrammar,
    pub operations: Operations,
    pub gcode_groups: CodeGroupTable,
    pub mcode_groups: CodeGroupTable,
}

/// Read the grammar file, returning the word table and the operation list.
pub fn load_grammar(path: &Path) -> Result<(WordGrammar, Operations), TableError> {
    let file: GrammarFile = read_json(path)?;
    let words = file
        .words
        .into_iter()
        .map(|(word, rule)| (word.to_ascii_uppercase(), rule))
        .collect();
    Ok((WordGrammar::new(words), Operations::new(file.operations)))
}

pub fn load_code_groups(path: &Path) -> Result<CodeGroupTable, TableError> {
    let groups: Vec<CodeGroup> = read_json(path)?;
    Ok(CodeGroupTable::new(groups))
}

/// Canonicalize and deserialize a JSON artifact.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TableError> {
    let canonical = canonical(path)?;
    let content = fs::read_to_string(&canonical).map_err(|source| TableError::Io {
        path: canonical.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| TableError::Json {
        path: canonical,
        source,
    })
}

fn canonical(path: &Path) -> Result<PathBuf, TableError> {
    fs::canonicalize(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Kind of machine the settings describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineToolType {
    #[default]
    Mill,
    Lathe,
    MillTurn,
}

/// Travel range of one axis in machine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
}

impl AxisLimits {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min - 1e-9 && value <= self.max + 1e-9
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Kinematics {
    pub x: Option<AxisLimits>,
    pub y: Option<AxisLimits>,
    pub z: Option<AxisLimits>,
}

impl Kinematics {
    pub fn limits(&self) -> [Option<AxisLimits>; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MachinePoints {
    /// Reference position reached by G28, also the start position.
    pub home: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZeroPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ZeroPoint {
    pub fn offset(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Modal state the control starts in, plus its rapid rate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CncDefaults {
    /// Rapid traverse rate in units per minute.
    pub rapid_feed: f64,
    /// Feed rate before the program sets one; 0 means unset.
    pub feed: f64,
    pub metric: bool,
    pub absolute: bool,
}

impl Default for CncDefaults {
    fn default() -> Self {
        Self {
            rapid_feed: 10_000.0,
            feed: 0.0,
            metric: true,
            absolute: true,
        }
    }
}

/// Contents of the `.ncsetting` TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    pub dialect: Option<Dialect>,
    pub machine_tool: String,
    pub machine_tool_type: MachineToolType,
    pub machine_points: MachinePoints,
    pub kinematics: Kinematics,
    pub cnc_defaults: CncDefaults,
    pub zero_point: ZeroPoint,
}

impl MachineSettings {
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let canonical = canonical(path)?;
        let content = fs::read_to_string(&canonical).map_err(|source| TableError::Io {
            path: canonical.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| TableError::Toml {
            path: canonical,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_group_lookup_ignores_padding() {
        let table = CodeGroupTable::new(vec![
            CodeGroup {
                id: 1,
                name: "motion".to_string(),
                codes: vec!["G00".to_string(), "G01".to_string()],
            },
            CodeGroup {
                id: 14,
                name: "work offset".to_string(),
                codes: vec!["G54".to_string(), "G54.1".to_string()],
            },
        ]);

        assert_eq!(table.group_of("G0"), Some(1));
        assert_eq!(table.group_of("G001"), Some(1));
        assert_eq!(table.group_of("G54.1"), Some(14));
        assert_eq!(table.group_of("G55"), None);
        assert_eq!(table.codes().collect::<Vec<_>>(), ["G00", "G01", "G54", "G54.1"]);
    }

    #[test]
    fn test_machine_settings_from_toml() {
        let settings: MachineSettings = toml::from_str(
            r#"
            dialect = "haas_mill"
            machine_tool = "VF-2"

            [cnc_defaults]
            rapid_feed = 25400.0

            [kinematics.x]
            min = 0.0
            max = 762.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.dialect, Some(Dialect::HaasMill));
        assert_eq!(settings.cnc_defaults.rapid_feed, 25400.0);
        assert!(settings.cnc_defaults.metric);
        assert!(settings.kinematics.x.unwrap().contains(762.0));
        assert!(settings.kinematics.y.is_none());
    }

    #[test]
    fn test_operations_are_case_insensitive() {
        let ops = Operations::new(vec!["sin".to_string(), "+".to_string()]);
        assert!(ops.allows("SIN"));
        assert!(ops.allows("+"));
        assert!(!ops.allows("COS"));
    }
}
