//! Optimization levels.

use std::fmt;
use std::str::FromStr;

/// Optimization level applied after a function is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum OptLevel {
    /// No optimization.
    #[default]
    O0,
    /// Dead block removal and light cleanup.
    O1,
    O2,
    O3,
}

impl OptLevel {
    /// New pass manager pipeline name (`default<O2>` etc.) for backends
    /// driving LLVM.
    pub fn pipeline_string(self) -> &'static str {
        match self {
            OptLevel::O0 => "default<O0>",
            OptLevel::O1 => "default<O1>",
            OptLevel::O2 => "default<O2>",
            OptLevel::O3 => "default<O3>",
        }
    }

    /// Whether any transformation runs at this level.
    pub fn is_enabled(self) -> bool {
        self != OptLevel::O0
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            OptLevel::O0 => 0,
            OptLevel::O1 => 1,
            OptLevel::O2 => 2,
            OptLevel::O3 => 3,
        };
        write!(f, "O{level}")
    }
}

/// Error returned when parsing an [`OptLevel`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid optimization level `{0}` (expected 0, 1, 2 or 3)")]
pub struct ParseOptLevelError(String);

impl FromStr for OptLevel {
    type Err = ParseOptLevelError;

    /// Accepts `0`..`3`, optionally prefixed with `O`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(['O', 'o']).unwrap_or(s);
        match digits {
            "0" => Ok(OptLevel::O0),
            "1" => Ok(OptLevel::O1),
            "2" => Ok(OptLevel::O2),
            "3" => Ok(OptLevel::O3),
            _ => Err(ParseOptLevelError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_levels() {
        assert_eq!("2".parse::<OptLevel>(), Ok(OptLevel::O2));
        assert_eq!("O3".parse::<OptLevel>(), Ok(OptLevel::O3));
        assert!("4".parse::<OptLevel>().is_err());
        assert!("fast".parse::<OptLevel>().is_err());
    }

    #[test]
    fn display_and_pipeline() {
        assert_eq!(OptLevel::O1.to_string(), "O1");
        assert_eq!(OptLevel::O2.pipeline_string(), "default<O2>");
        assert!(!OptLevel::O0.is_enabled());
    }
}
