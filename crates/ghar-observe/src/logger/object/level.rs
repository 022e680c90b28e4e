use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

/// A validated `EnvFilter` expression.
///
/// Keeps the raw string for display and serialization; validity is checked
/// once when the value is constructed, so [`LoggerLevel::to_env_filter`]
/// cannot fail afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// Validates and wraps a filter expression.
    ///
    /// ```
    /// use ghar_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("ghar_exec=trace,info").unwrap();
    /// assert_eq!(lvl.as_str(), "ghar_exec=trace,info");
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.as_str()).expect("LoggerLevel is validated on construction")
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match EnvFilter::try_new(&s) {
            Ok(_) => Ok(LoggerLevel(s)),
            Err(e) => Err(LoggerError::InvalidLevel(format!("{s}: {e}"))),
        }
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}

#[cfg(test)]
mod tests {
    use super::LoggerLevel;

    #[test]
    fn accepts_plain_and_per_target_levels() {
        for lvl in ["info", "warn", "trace", "ghar_core=debug,ghar_exec=trace,info"] {
            assert!(lvl.parse::<LoggerLevel>().is_ok(), "{lvl} should be accepted");
        }
    }

    #[test]
    fn rejects_unknown_level_names() {
        for lvl in ["ghar_core=chatty", "info,ghar_exec=verbose"] {
            assert!(lvl.parse::<LoggerLevel>().is_err(), "{lvl} should be rejected");
        }
    }

    #[test]
    fn default_is_info() {
        let lvl = LoggerLevel::default();
        assert_eq!(lvl.as_str(), "info");
        let _ = lvl.to_env_filter();
    }

    #[test]
    fn deserializes_from_plain_string() {
        let lvl: LoggerLevel = serde_yaml::from_str("debug").unwrap();
        assert_eq!(lvl.as_str(), "debug");
        assert!(serde_yaml::from_str::<LoggerLevel>("ghar_core=nope").is_err());
    }
}
