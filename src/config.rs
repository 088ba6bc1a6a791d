use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_nbp_base_url() -> String {
    "https://api.nbp.pl/api/exchangerates".to_string()
}

fn default_ecb_base_url() -> String {
    "https://api.frankfurter.app".to_string()
}

fn default_ecb_fallback_url() -> String {
    "https://api.exchangerate.host".to_string()
}

fn default_nbp_currencies() -> Vec<String> {
    ["USD", "EUR", "GBP", "CHF", "JPY", "AUD", "CAD"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

// The reference source is EUR-based so it cannot quote EUR itself; it can
// quote PLN, which the NBP tables cannot.
fn default_ecb_currencies() -> Vec<String> {
    ["USD", "GBP", "CHF", "JPY", "AUD", "CAD", "PLN"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NbpProviderConfig {
    #[serde(default = "default_nbp_base_url")]
    pub base_url: String,
    #[serde(default = "default_nbp_currencies")]
    pub currencies: Vec<String>,
}

impl Default for NbpProviderConfig {
    fn default() -> Self {
        NbpProviderConfig {
            base_url: default_nbp_base_url(),
            currencies: default_nbp_currencies(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EcbProviderConfig {
    #[serde(default = "default_ecb_base_url")]
    pub base_url: String,
    #[serde(default = "default_ecb_fallback_url")]
    pub fallback_url: String,
    #[serde(default = "default_ecb_currencies")]
    pub currencies: Vec<String>,
}

impl Default for EcbProviderConfig {
    fn default() -> Self {
        EcbProviderConfig {
            base_url: default_ecb_base_url(),
            fallback_url: default_ecb_fallback_url(),
            currencies: default_ecb_currencies(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    pub nbp: Option<NbpProviderConfig>,
    pub ecb: Option<EcbProviderConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Per-request HTTP timeout in seconds; expiry surfaces as a transport
    /// error.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file. Every setting has a default, so a
    /// missing file means defaults rather than an error.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxrates", "fxrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
