//! Configuration loading and validation.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ValidationError};

/// Lookup settings for the command-line front end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Resolver to query, as a host name or IP address. The port is always 53.
    #[serde(default = "default_server")]
    pub server: String,

    /// Deadline for the whole exchange, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_server() -> String {
    "8.8.8.8".to_string()
}

const fn default_timeout_secs() -> u64 {
    3
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values, for instance after command-line overrides.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err(ValidationError::EmptyServer);
        }
        // A bare IPv6 address contains colons too, so only reject what cannot
        // be read as one.
        if server.parse::<SocketAddr>().is_ok()
            || (server.contains(':') && server.parse::<IpAddr>().is_err())
        {
            return Err(ValidationError::ServerHasPort {
                server: self.server.clone(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
            server = "1.1.1.1"
            timeout_secs = 5
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server, "1.1.1.1");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_values() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server, "8.8.8.8");
        assert_eq!(config.timeout_secs, 3);
    }

    #[rstest]
    #[case("dns.example.net")]
    #[case("2001:4860:4860::8888")]
    #[case("::1")]
    fn test_server_forms_accepted(#[case] server: &str) {
        let config = Config {
            server: server.to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case("1.1.1.1:5353")]
    #[case("[::1]:53")]
    #[case("dns.example.net:53")]
    fn test_server_with_port_rejected(#[case] server: &str) {
        let config = Config {
            server: server.to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ServerHasPort { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
            timeout_secs = 0
        "#;

        assert!(matches!(
            Config::parse(toml),
            Err(ConfigError::Validation(ValidationError::ZeroTimeout))
        ));
    }

    #[test]
    fn test_empty_server_rejected() {
        let toml = r#"
            server = "  "
        "#;

        assert!(matches!(
            Config::parse(toml),
            Err(ConfigError::Validation(ValidationError::EmptyServer))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            server = "1.1.1.1"
            port = 5353
        "#;

        assert!(matches!(Config::parse(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "server = \"9.9.9.9\"").unwrap();
        writeln!(file, "timeout_secs = 1").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server, "9.9.9.9");
        assert_eq!(config.timeout_secs, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile(_))));
    }
}
