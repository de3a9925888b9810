use crate::engine::{AxesRotation, UnitConversion};
use crate::error::ConfigurationError;

/// What a parse run does with each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Diagnostics only
    #[default]
    Parse,
    /// Diagnostics plus a transcript with lengths converted
    ConvertLength(UnitConversion),
    /// Diagnostics plus path/time annotations
    PathTime,
    /// Diagnostics plus a transcript with axes rotated
    RotateAxes(AxesRotation),
}

impl Mode {
    pub fn writes_transcript(self) -> bool {
        matches!(self, Mode::ConvertLength(_) | Mode::RotateAxes(_))
    }
}

/// Independent mode switches as a command line exposes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub parse: bool,
    pub convert_length: Option<UnitConversion>,
    pub path_time: bool,
    pub rotate_axes: Option<AxesRotation>,
}

impl TryFrom<ModeFlags> for Mode {
    type Error = ConfigurationError;

    fn try_from(flags: ModeFlags) -> Result<Self, Self::Error> {
        let mut selected = Vec::new();
        if flags.parse {
            selected.push(Mode::Parse);
        }
        if let Some(conversion) = flags.convert_length {
            selected.push(Mode::ConvertLength(conversion));
        }
        if flags.path_time {
            selected.push(Mode::PathTime);
        }
        if let Some(rotation) = flags.rotate_axes {
            selected.push(Mode::RotateAxes(rotation));
        }

        match selected.as_slice() {
            [mode] => Ok(*mode),
            _ => Err(ConfigurationError::InvalidMode {
                selected: selected.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_mode() {
        let flags = ModeFlags {
            path_time: true,
            ..ModeFlags::default()
        };
        assert_eq!(Mode::try_from(flags).unwrap(), Mode::PathTime);

        let flags = ModeFlags {
            rotate_axes: Some(AxesRotation::X90),
            ..ModeFlags::default()
        };
        assert_eq!(Mode::try_from(flags).unwrap(), Mode::RotateAxes(AxesRotation::X90));
    }

    #[test]
    fn test_zero_or_many_modes_rejected() {
        let err = Mode::try_from(ModeFlags::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidMode { selected: 0 }));

        let flags = ModeFlags {
            parse: true,
            convert_length: Some(UnitConversion::MetricToImperial),
            ..ModeFlags::default()
        };
        let err = Mode::try_from(flags).unwrap_err();
        assert_eq!(err.to_string(), "ERROR: Exactly one processing mode must be selected");
    }
}
