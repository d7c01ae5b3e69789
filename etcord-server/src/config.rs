//! Server configuration
//!
//! Loaded from a TOML file; every section falls back to defaults so a
//! missing or partial file still produces a runnable server. Channels are
//! defined here and created once at startup; there is no dynamic channel
//! creation yet.

use std::path::Path;

use serde::{Deserialize, Serialize};

use etcord_protocol::ChannelType;
use etcord_utils::{EtcordError, Result};

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            channels: vec![ChannelConfig {
                id: 1,
                parent_id: 0,
                name: "general".into(),
                kind: ChannelKind::Text,
            }],
        }
    }
}

/// Listener and connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the TCP listener to
    pub bind: String,
    /// Listener port
    pub port: u16,
    /// Per-connection outbound queue depth, in frames
    pub send_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 9000,
            send_queue_depth: 64,
        }
    }
}

/// One statically configured channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: u16,
    #[serde(default)]
    pub parent_id: u16,
    pub name: String,
    #[serde(default = "ChannelKind::text")]
    pub kind: ChannelKind,
}

/// Channel kind as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    None,
    Text,
    Voice,
    Multi,
}

impl ChannelKind {
    fn text() -> Self {
        ChannelKind::Text
    }
}

impl From<ChannelKind> for ChannelType {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::None => ChannelType::None,
            ChannelKind::Text => ChannelType::Text,
            ChannelKind::Voice => ChannelType::Voice,
            ChannelKind::Multi => ChannelType::Multi,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| EtcordError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AppConfig =
            toml::from_str(&raw).map_err(|e| EtcordError::ConfigInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the path in ETCORD_CONFIG, or fall back to defaults
    pub fn load_default() -> Result<Self> {
        match std::env::var_os("ETCORD_CONFIG") {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// The socket address string to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    fn validate(&self) -> Result<()> {
        if self.server.send_queue_depth == 0 {
            return Err(EtcordError::config("send_queue_depth must be at least 1"));
        }

        let mut seen = std::collections::HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.id) {
                return Err(EtcordError::config(format!(
                    "duplicate channel id {}",
                    channel.id
                )));
            }
            if channel.name.is_empty() {
                return Err(EtcordError::config(format!(
                    "channel {} has an empty name",
                    channel.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "general");
        assert_eq!(config.channels[0].kind, ChannelKind::Text);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
bind = "0.0.0.0"
port = 4242

[[channels]]
id = 1
name = "general"
kind = "text"

[[channels]]
id = 2
parent_id = 1
name = "lounge"
kind = "multi"
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:4242");
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].kind, ChannelKind::Multi);
        // Unspecified settings keep their defaults
        assert_eq!(config.server.send_queue_depth, 64);
    }

    #[test]
    fn test_duplicate_channel_id_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[channels]]
id = 1
name = "a"

[[channels]]
id = 1
name = "b"
"#
        )
        .unwrap();

        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load(Path::new("/nonexistent/etcord.toml")).is_err());
    }
}
