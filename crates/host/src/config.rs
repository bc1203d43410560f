//! Host configuration management

use crate::session::{DEFAULT_CONFIGURATION, DEFAULT_TIMEOUT, SessionConfig};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub device: DeviceSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Simulated device layout for the loopback backend
    #[serde(default)]
    pub loopback: LoopbackSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// USB vendor id, hex with 0x prefix (e.g. "0x20b1")
    pub vendor_id: String,
    /// USB product id, hex with 0x prefix
    pub product_id: String,
    #[serde(default)]
    pub interface: u8,
    /// Configuration to select on open; 0 keeps the active one
    #[serde(default = "DeviceSettings::default_configuration")]
    pub configuration: u8,
    #[serde(default = "DeviceSettings::default_claim_interface")]
    pub claim_interface: bool,
}

impl DeviceSettings {
    fn default_configuration() -> u8 {
        DEFAULT_CONFIGURATION
    }

    fn default_claim_interface() -> bool {
        true
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: "0x20b1".to_string(),
            product_id: "0x0008".to_string(),
            interface: 0,
            configuration: Self::default_configuration(),
            claim_interface: Self::default_claim_interface(),
        }
    }
}

/// Which backend carries control transfers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Libusb,
    Loopback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default)]
    pub backend: BackendKind,
    /// Per-transfer timeout in milliseconds
    #[serde(default = "TransportSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TransportSettings {
    fn default_timeout_ms() -> u64 {
        DEFAULT_TIMEOUT.as_millis() as u64
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackSettings {
    /// Resource ids per interface; interface `i` owns `interfaces[i]`
    pub interfaces: Vec<Vec<u8>>,
}

impl Default for LoopbackSettings {
    fn default() -> Self {
        Self {
            interfaces: vec![vec![1, 2], vec![3]],
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            transport: TransportSettings::default(),
            logging: LoggingSettings::default(),
            loopback: LoopbackSettings::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_source(path).map(|(config, _)| config)
    }

    /// Load configuration and return the file it came from
    ///
    /// Without `path`, the first existing candidate is used.
    pub fn load_with_source(path: Option<PathBuf>) -> Result<(Self, PathBuf)> {
        let config_path = if let Some(p) = path {
            expand_path(&p)
        } else {
            let candidates = vec![Self::default_path(), PathBuf::from("/etc/usb-devctl/devctl.toml")];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        Ok((config, config_path))
    }

    /// Load configuration from a candidate path, or fall back to defaults
    ///
    /// Returns the file used, or the reason defaults were chosen.
    pub fn load_or_default() -> (Self, Result<PathBuf>) {
        match Self::load_with_source(None) {
            Ok((config, path)) => (config, Ok(path)),
            Err(e) => (Self::default(), Err(e)),
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-devctl").join("devctl.toml")
        } else {
            PathBuf::from(".config/usb-devctl/devctl.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        parse_hex_id(&self.device.vendor_id, "vendor_id")?;
        parse_hex_id(&self.device.product_id, "product_id")?;

        if self.transport.timeout_ms == 0 {
            return Err(anyhow!("timeout_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Session parameters described by this configuration
    pub fn session_config(&self) -> Result<SessionConfig> {
        let vendor_id = parse_hex_id(&self.device.vendor_id, "vendor_id")?;
        let product_id = parse_hex_id(&self.device.product_id, "product_id")?;

        Ok(SessionConfig::new(vendor_id, product_id, self.device.interface)
            .with_configuration(Some(self.device.configuration).filter(|&c| c != 0))
            .with_claim_interface(self.device.claim_interface)
            .with_timeout(Duration::from_millis(self.transport.timeout_ms)))
    }
}

/// Parse a hex id such as "0x20b1"
pub fn parse_hex_id(id: &str, name: &str) -> Result<u16> {
    let hex_part = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .ok_or_else(|| anyhow!("Invalid {} '{}', must start with '0x' (e.g., '0x1234')", name, id))?;

    if hex_part.is_empty() || hex_part.len() > 4 {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-4 digits",
            name,
            id
        ));
    }

    u16::from_str_radix(hex_part, 16)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}
