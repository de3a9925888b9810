//! Lazy, cached resolution of machine settings and dialect tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::settings::tables::{self, DialectTables, MachineSettings};
use crate::settings::Dialect;

/// Resolves `conf/<dialect>/` tables under a root directory.
///
/// Tables are read on first use and cached per dialect; a failed read is not
/// cached, so the next parse retries. Machine settings are cached until
/// [`ConfigResolver::reload_settings`] is called.
#[derive(Debug)]
pub struct ConfigResolver {
    root: PathBuf,
    settings_path: Option<PathBuf>,
    settings: Option<Arc<MachineSettings>>,
    tables: HashMap<Dialect, Arc<DialectTables>>,
}

impl ConfigResolver {
    pub fn new(root: impl Into<PathBuf>, settings_path: Option<PathBuf>) -> Self {
        Self {
            root: root.into(),
            settings_path,
            settings: None,
            tables: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Machine settings; defaults when no settings path is configured.
    pub fn settings(&mut self) -> Result<Arc<MachineSettings>, ConfigurationError> {
        if let Some(settings) = &self.settings {
            return Ok(Arc::clone(settings));
        }

        let settings = match self.settings_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => {
                log::debug!("reading machine settings from {}", path.display());
                MachineSettings::load(path).map_err(ConfigurationError::Settings)?
            }
            _ => MachineSettings::default(),
        };

        let settings = Arc::new(settings);
        self.settings = Some(Arc::clone(&settings));
        Ok(settings)
    }

    /// Point at a different settings file and forget the cached settings.
    pub fn set_settings_path(&mut self, path: Option<PathBuf>) {
        self.settings_path = path;
        self.reload_settings();
    }

    pub fn reload_settings(&mut self) {
        self.settings = None;
    }

    /// Dialect named by the settings file, else `fallback`.
    pub fn active_dialect(&mut self, fallback: Dialect) -> Dialect {
        match self.settings() {
            Ok(settings) => settings.dialect.unwrap_or(fallback),
            Err(_) => fallback,
        }
    }

    pub fn resolve(&mut self, dialect: Dialect) -> Result<Arc<DialectTables>, ConfigurationError> {
        if let Some(tables) = self.tables.get(&dialect) {
            return Ok(Arc::clone(tables));
        }

        let dir = self.root.join("conf").join(dialect.key());

        let grammar_path = dir.join("grammar.json");
        log::debug!("grammar path: {}", grammar_path.display());
        let (word_grammar, operations) =
            tables::load_grammar(&grammar_path).map_err(ConfigurationError::WordGrammar)?;

        let gcode_groups_path = dir.join("gcode_groups.json");
        log::debug!("gcode groups path: {}", gcode_groups_path.display());
        let gcode_groups = tables::load_code_groups(&gcode_groups_path)
            .map_err(ConfigurationError::GCodeGroups)?;

        let mcode_groups_path = dir.join("mcode_groups.json");
        log::debug!("mcode groups path: {}", mcode_groups_path.display());
        let mcode_groups = tables::load_code_groups(&mcode_groups_path)
            .map_err(ConfigurationError::MCodeGroups)?;

        let tables = Arc::new(DialectTables {
            dialect,
            word_grammar,
            operations,
            gcode_groups,
            mcode_groups,
        });
        log::info!(
            "loaded {} tables: {} words, {} G groups, {} M groups",
            dialect,
            tables.word_grammar.len(),
            tables.gcode_groups.groups().len(),
            tables.mcode_groups.groups().len()
        );
        self.tables.insert(dialect, Arc::clone(&tables));
        Ok(tables)
    }
}
