//! Configuration file support for hostnet.
//!
//! Loaded once at process start from TOML and shared read-only with the
//! façade. Default location: /etc/hostnet/hostnet.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{HostnetError, HostnetResult};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostnet/hostnet.toml";

/// Settings consumed by the external HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Shared-secret bearer authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret expected in `Authorization: Bearer <secret>`
    #[serde(default = "default_shared_secret")]
    pub shared_secret: String,
}

/// Locations of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ovs_vsctl")]
    pub ovs_vsctl: String,

    #[serde(default = "default_ovs_ofctl")]
    pub ovs_ofctl: String,

    #[serde(default = "default_ip")]
    pub ip: String,

    #[serde(default = "default_iptables")]
    pub iptables: String,

    /// Used to probe whether ovs-vsctl is installed
    #[serde(default = "default_which")]
    pub which: String,

    /// Shell for pipeline lookups
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Text filter used in pipeline lookups
    #[serde(default = "default_grep")]
    pub grep: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete hostnet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostnetConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

fn default_port() -> u16 {
    3001
}

fn default_shared_secret() -> String {
    "admin".to_string()
}

fn default_ovs_vsctl() -> String {
    "ovs-vsctl".to_string()
}

fn default_ovs_ofctl() -> String {
    "ovs-ofctl".to_string()
}

fn default_ip() -> String {
    "ip".to_string()
}

fn default_iptables() -> String {
    "iptables".to_string()
}

fn default_which() -> String {
    "which".to_string()
}

fn default_shell() -> String {
    crate::shell::SH_CMD.to_string()
}

fn default_grep() -> String {
    "grep".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            shared_secret: default_shared_secret(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ovs_vsctl: default_ovs_vsctl(),
            ovs_ofctl: default_ovs_ofctl(),
            ip: default_ip(),
            iptables: default_iptables(),
            which: default_which(),
            shell: default_shell(),
            grep: default_grep(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl HostnetConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> HostnetResult<Self> {
        let path = path.as_ref();

        let config: Self = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                HostnetError::config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(HostnetError::Io(e)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> HostnetResult<()> {
        if self.auth.shared_secret.is_empty() {
            return Err(HostnetError::config("auth.shared_secret must not be empty"));
        }

        let tools = [
            ("tools.ovs_vsctl", &self.tools.ovs_vsctl),
            ("tools.ovs_ofctl", &self.tools.ovs_ofctl),
            ("tools.ip", &self.tools.ip),
            ("tools.iptables", &self.tools.iptables),
            ("tools.which", &self.tools.which),
            ("tools.shell", &self.tools.shell),
            ("tools.grep", &self.tools.grep),
        ];
        for (name, value) in tools {
            if value.trim().is_empty() {
                return Err(HostnetError::config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }

    /// Checks an `Authorization` header value against the shared secret.
    pub fn bearer_matches(&self, header: Option<&str>) -> bool {
        match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token == self.auth.shared_secret,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = HostnetConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.auth.shared_secret, "admin");
        assert_eq!(config.tools.ovs_vsctl, "ovs-vsctl");
        assert_eq!(config.tools.shell, "/bin/sh");
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization_partial() {
        let toml_str = r#"
            [server]
            port = 8080

            [tools]
            ovs_vsctl = "/usr/bin/ovs-vsctl"
        "#;

        let config: HostnetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tools.ovs_vsctl, "/usr/bin/ovs-vsctl");
        assert_eq!(config.tools.ip, "ip");
        assert_eq!(config.auth.shared_secret, "admin");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = HostnetConfig::load_or_default("/nonexistent/hostnet.toml").unwrap();
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\nshared_secret = \"s3cret\"\n[log]\nlevel = \"debug\"").unwrap();

        let config = HostnetConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.auth.shared_secret, "s3cret");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let err = HostnetConfig::load_or_default(file.path()).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = HostnetConfig::default();
        config.auth.shared_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_tool() {
        let mut config = HostnetConfig::default();
        config.tools.iptables = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tools.iptables"));
    }

    #[test]
    fn test_bearer_matches() {
        let config = HostnetConfig::default();
        assert!(config.bearer_matches(Some("Bearer admin")));
        assert!(!config.bearer_matches(Some("Bearer wrong")));
        assert!(!config.bearer_matches(Some("admin")));
        assert!(!config.bearer_matches(None));
    }
}
