//! Machine-tool dialects and the engine family that serves each of them.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigurationError;

/// A control-code grammar family. The key doubles as the `conf/<key>` directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    FanucLatheSystemA,
    FanucLatheSystemB,
    FanucLatheSystemC,
    #[default]
    FanucMill,
    FanucMillturnSystemA,
    FanucMillturnSystemB,
    GenericLathe,
    GenericMill,
    HaasLathe,
    HaasMill,
    MakinoMill,
    Heidenhain,
}

/// Controller family; decides which engine parses a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CncFamily {
    Fanuc,
    Generic,
    Haas,
    Makino,
    Heidenhain,
}

impl CncFamily {
    /// Families built on the Fanuc word grammar (macro B, code groups).
    pub fn is_fanuc_like(self) -> bool {
        !matches!(self, CncFamily::Heidenhain)
    }
}

impl Dialect {
    pub const ALL: [Dialect; 12] = [
        Dialect::FanucLatheSystemA,
        Dialect::FanucLatheSystemB,
        Dialect::FanucLatheSystemC,
        Dialect::FanucMill,
        Dialect::FanucMillturnSystemA,
        Dialect::FanucMillturnSystemB,
        Dialect::GenericLathe,
        Dialect::GenericMill,
        Dialect::HaasLathe,
        Dialect::HaasMill,
        Dialect::MakinoMill,
        Dialect::Heidenhain,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Dialect::FanucLatheSystemA => "fanuc_lathe_system_a",
            Dialect::FanucLatheSystemB => "fanuc_lathe_system_b",
            Dialect::FanucLatheSystemC => "fanuc_lathe_system_c",
            Dialect::FanucMill => "fanuc_mill",
            Dialect::FanucMillturnSystemA => "fanuc_millturn_system_a",
            Dialect::FanucMillturnSystemB => "fanuc_millturn_system_b",
            Dialect::GenericLathe => "generic_lathe",
            Dialect::GenericMill => "generic_mill",
            Dialect::HaasLathe => "haas_lathe",
            Dialect::HaasMill => "haas_mill",
            Dialect::MakinoMill => "makino_mill",
            Dialect::Heidenhain => "heidenhain",
        }
    }

    pub fn family(self) -> CncFamily {
        match self {
            Dialect::FanucLatheSystemA
            | Dialect::FanucLatheSystemB
            | Dialect::FanucLatheSystemC
            | Dialect::FanucMill
            | Dialect::FanucMillturnSystemA
            | Dialect::FanucMillturnSystemB => CncFamily::Fanuc,
            Dialect::GenericLathe | Dialect::GenericMill => CncFamily::Generic,
            Dialect::HaasLathe | Dialect::HaasMill => CncFamily::Haas,
            Dialect::MakinoMill => CncFamily::Makino,
            Dialect::Heidenhain => CncFamily::Heidenhain,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dialect {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Dialect::ALL
            .into_iter()
            .find(|d| d.key() == wanted)
            .ok_or_else(|| ConfigurationError::UnknownDialect(s.to_string()))
    }
}
