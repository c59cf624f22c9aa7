//! Log severities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a log record, ordered from least to most severe.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Unknown = 5,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
        Severity::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Single-letter label used by the console format.
    pub fn letter(&self) -> char {
        match self {
            Severity::Unknown => 'A',
            other => other.as_str().chars().next().unwrap_or('A'),
        }
    }

    /// Parse a name (`"warn"`, `"WARN"`) or a numeric level (`"2"`).
    pub fn parse(level: &str) -> Option<Self> {
        let level = level.trim();
        if let Ok(n) = level.parse::<u8>() {
            return Self::from_u8(n);
        }
        match level.to_ascii_lowercase().as_str() {
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            "fatal" => Some(Severity::Fatal),
            "unknown" | "any" => Some(Severity::Unknown),
            _ => None,
        }
    }

    pub fn from_u8(n: u8) -> Option<Self> {
        Self::ALL.get(n as usize).copied()
    }

    /// Level carried in a JSON field: a name or a number.
    ///
    /// Anything unrecognised falls back to the default (`Info`).
    pub fn normalize(value: &Value) -> Self {
        let parsed = match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()).and_then(Self::from_u8),
            _ => None,
        };
        parsed.unwrap_or_default()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unsupported log level '{}'", s))
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error | Severity::Fatal | Severity::Unknown => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Fatal < Severity::Unknown);
    }

    #[test]
    fn test_parse_names_and_numbers() {
        assert_eq!(Severity::parse("debug"), Some(Severity::Debug));
        assert_eq!(Severity::parse("WARN"), Some(Severity::Warn));
        assert_eq!(Severity::parse("3"), Some(Severity::Error));
        assert_eq!(Severity::parse("9"), None);
        assert_eq!(Severity::parse("loud"), None);
    }

    #[test]
    fn test_normalize_defaults_to_info() {
        assert_eq!(Severity::normalize(&json!("fatal")), Severity::Fatal);
        assert_eq!(Severity::normalize(&json!(0)), Severity::Debug);
        assert_eq!(Severity::normalize(&json!("verbose")), Severity::Info);
        assert_eq!(Severity::normalize(&json!(null)), Severity::Info);
    }

    #[test]
    fn test_serialized_form() {
        assert_eq!(serde_json::to_string(&Severity::Warn).unwrap(), "\"WARN\"");
        assert_eq!(Severity::Unknown.letter(), 'A');
        assert_eq!(Severity::Info.letter(), 'I');
    }
}
