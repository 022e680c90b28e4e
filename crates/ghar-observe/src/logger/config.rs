use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::object::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger section of the `lxd-ghar` configuration document.
///
/// Every field is optional in the document; missing fields take the
/// values of [`LoggerConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output sink and encoding.
    pub format: LoggerFormat,
    /// `EnvFilter` expression, e.g. `"info"` or `"ghar_core=debug,info"`.
    pub level: LoggerLevel,
    /// Timezone used for the RFC3339 timestamps.
    pub tz: LoggerTimeZone,
    /// Print the event target (module path) next to each line.
    pub with_targets: bool,
    /// Allow ANSI colors in text output.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Applies command-line overrides on top of the loaded section.
    ///
    /// `None` keeps the configured value.
    pub fn with_overrides(
        mut self,
        level: Option<LoggerLevel>,
        format: Option<LoggerFormat>,
    ) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    /// Colors are used only when enabled in config and stderr is a terminal.
    ///
    /// Evaluated at subscriber construction time, so a runner whose stderr is
    /// captured by a service manager never gets escape codes.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stderr().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_text_info_utc() {
        let config = LoggerConfig::default();

        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn empty_yaml_section_uses_defaults() {
        let config: LoggerConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.level.as_str(), "info");
        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
    }

    #[test]
    fn partial_yaml_section_keeps_remaining_defaults() {
        let yaml = "format: json\nlevel: ghar_core=debug,info\n";
        let config: LoggerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.level.as_str(), "ghar_core=debug,info");
        assert!(config.with_targets);
    }

    #[test]
    fn invalid_level_is_rejected_while_parsing() {
        let yaml = "level: ghar_core=loud\n";
        assert!(serde_yaml::from_str::<LoggerConfig>(yaml).is_err());
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let base = LoggerConfig::default();
        let level: LoggerLevel = "debug".parse().unwrap();

        let cfg = base.clone().with_overrides(Some(level), None);
        assert_eq!(cfg.level.as_str(), "debug");
        assert_eq!(cfg.format, LoggerFormat::Text);

        let cfg = base.with_overrides(None, Some(LoggerFormat::Json));
        assert_eq!(cfg.level.as_str(), "info");
        assert_eq!(cfg.format, LoggerFormat::Json);
    }

    #[test]
    fn json_roundtrip_preserves_fields() {
        let config = LoggerConfig {
            format: LoggerFormat::Json,
            tz: LoggerTimeZone::Local,
            level: "warn".parse().unwrap(),
            with_targets: false,
            use_color: false,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: LoggerConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.level.as_str(), "warn");
        assert_eq!(parsed.format, LoggerFormat::Json);
        assert_eq!(parsed.tz, LoggerTimeZone::Local);
        assert!(!parsed.with_targets);
        assert!(!parsed.use_color);
    }
}
