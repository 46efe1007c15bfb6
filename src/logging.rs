//! Logging setup.
//!
//! Format comes from `LOG_FORMAT` or `[logging] format` (`pretty` by default,
//! or `json`). The filter comes from `RUST_LOG`, falling back to
//! `[logging] level` and then `info`. Events go to stderr so command output on
//! stdout stays clean.

use tracing_subscriber::EnvFilter;

use crate::domain::error::ShopError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ShopError> {
        match value.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ShopError::ConfigInvalid {
                section: "logging".into(),
                key: "format".into(),
                reason: format!("expected pretty or json, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Default directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "info".into(),
        }
    }
}

impl LogSettings {
    pub fn from_config(config: Option<&dyn ConfigPort>) -> Result<Self, ShopError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    pub fn resolve(
        config: Option<&dyn ConfigPort>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ShopError> {
        let from_file = |key: &str| config.and_then(|c| c.get_non_empty("logging", key));

        let format = match env("LOG_FORMAT").or_else(|| from_file("format")) {
            Some(value) => LogFormat::parse(&value)?,
            None => LogFormat::default(),
        };
        let level = from_file("level").unwrap_or_else(|| "info".into());

        Ok(Self { format, level })
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_config() {
        let settings = LogSettings::resolve(None, no_env).unwrap();
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn reads_logging_section() {
        let config =
            FileConfigAdapter::from_string("[logging]\nformat = JSON\nlevel = esstore=debug\n")
                .unwrap();
        let settings = LogSettings::resolve(Some(&config as &dyn ConfigPort), no_env).unwrap();
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.level, "esstore=debug");
    }

    #[test]
    fn env_format_wins_over_file() {
        let config = FileConfigAdapter::from_string("[logging]\nformat = json\n").unwrap();
        let env = |name: &str| (name == "LOG_FORMAT").then(|| "pretty".to_string());
        let settings = LogSettings::resolve(Some(&config as &dyn ConfigPort), env).unwrap();
        assert_eq!(settings.format, LogFormat::Pretty);
    }

    #[test]
    fn unknown_format_is_invalid() {
        let config = FileConfigAdapter::from_string("[logging]\nformat = xml\n").unwrap();
        assert!(matches!(
            LogSettings::resolve(Some(&config as &dyn ConfigPort), no_env),
            Err(ShopError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(&LogSettings::default());
        init_logging(&LogSettings::default());
    }
}
