//! Static process configuration, loaded from a TOML file with environment
//! and CLI overrides. This is distinct from the live `system_config`
//! key/value store owned by `vox-store`, which holds the tunables the
//! admin surface edits at runtime (model paths, service-enabled flags,
//! system speed).

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct SipLineConfig {
    pub line_id: u32,
    pub username: String,
    pub password: String,
    pub server_host: String,
    #[serde(default = "default_sip_port")]
    pub server_port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_sip_port() -> u16 {
    5060
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub lines: Vec<SipLineConfig>,
    #[serde(default = "default_register_interval_secs")]
    pub register_interval_secs: u64,
}

fn default_register_interval_secs() -> u64 {
    30 * 60
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "voxbridge.db".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            lines: Vec::new(),
            register_interval_secs: default_register_interval_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            db_path: default_db_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load a TOML config file. Missing file is not an error — callers get
    /// `Config::default()` and are expected to fill in overrides from CLI
    /// flags or environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}
