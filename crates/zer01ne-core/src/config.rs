//! Gateway configuration: defaults, optional TOML file, then `ZER01NE__*` environment.
//!
//! | Key | Default |
//! |-----|---------|
//! | system_name | ZER01NE 67 |
//! | version | 2.0 |
//! | host / port | 0.0.0.0 / 5000 |
//! | genesis_timestamp | 2026-02-20T23:52:44Z |
//! | hardware_id | 4C4C4544-0048-4210-8053-B4C04F354D33 |
//! | default_altitude_m | 300.0 |
//! | default_depth_m / default_pool_name | 1.2 / Pool |

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub system_name: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    pub genesis_timestamp: String,
    pub hardware_id: String,
    /// Altitude handed to `/earth/validate` when the request omits `alt`.
    pub default_altitude_m: f64,
    pub default_depth_m: f64,
    pub default_pool_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            system_name: "ZER01NE 67".to_string(),
            version: "2.0".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            genesis_timestamp: crate::GENESIS_TIMESTAMP.to_string(),
            hardware_id: "4C4C4544-0048-4210-8053-B4C04F354D33".to_string(),
            default_altitude_m: crate::DEFAULT_ALTITUDE_M,
            default_depth_m: 1.2,
            default_pool_name: "Pool".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load config. Precedence: env `ZER01NE__*` > file at `ZER01NE_CONFIG` (default `config/gateway.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("ZER01NE_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("system_name", defaults.system_name)?
            .set_default("version", defaults.version)?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("genesis_timestamp", defaults.genesis_timestamp)?
            .set_default("hardware_id", defaults.hardware_id)?
            .set_default("default_altitude_m", defaults.default_altitude_m)?
            .set_default("default_depth_m", defaults.default_depth_m)?
            .set_default("default_pool_name", defaults.default_pool_name)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        builder
            .add_source(config::Environment::with_prefix("ZER01NE").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
