// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debounce::DEFAULT_QUIET_PERIOD;
use crate::fetch::TransportTimeouts;
use crate::model::ZodiacSign;
use crate::upstream::{Endpoints, DEFAULT_APOD_BASE_URL, DEFAULT_HOROSCOPE_BASE_URL};

pub const ENV_CONFIG_PATH: &str = "SKYSCRIPT_CONFIG_PATH";
pub const ENV_QUIET_MS: &str = "SKYSCRIPT_QUIET_MS";
pub const ENV_TIMEOUT_SECS: &str = "SKYSCRIPT_TIMEOUT_SECS";
pub const ENV_API_KEY: &str = "NASA_API_KEY";

pub const DEFAULT_CONFIG_TOML: &str = "config/dashboard.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/dashboard.json";

/// NASA's shared rate-limited key, used when no key is configured.
pub const DEMO_API_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub apod_base_url: String,
    pub horoscope_base_url: String,
    /// "ENV" means: read from NASA_API_KEY (falls back to DEMO_KEY)
    pub api_key: String,
    pub quiet_period_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Sign selected when a session starts.
    pub default_sign: ZodiacSign,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            apod_base_url: DEFAULT_APOD_BASE_URL.to_string(),
            horoscope_base_url: DEFAULT_HOROSCOPE_BASE_URL.to_string(),
            api_key: "ENV".to_string(),
            quiet_period_ms: DEFAULT_QUIET_PERIOD.as_millis() as u64,
            request_timeout_secs: 10,
            connect_timeout_secs: 4,
            default_sign: ZodiacSign::Aries,
        }
    }
}

impl DashboardConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: DashboardConfig = match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            "toml" | "" => {
                toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
            }
            other => return Err(anyhow!("unsupported config format `.{other}`")),
        };
        cfg.finish()
    }

    /// Load config using env var + fallbacks:
    /// 1) $SKYSCRIPT_CONFIG_PATH
    /// 2) config/dashboard.toml
    /// 3) config/dashboard.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in [DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_JSON] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Self::default().finish()
    }

    // Env overrides, api key resolution, sanitizing.
    fn finish(mut self) -> Result<Self> {
        if let Some(ms) = env_u64(ENV_QUIET_MS) {
            self.quiet_period_ms = ms;
        }
        if let Some(secs) = env_u64(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs;
        }

        // A zero timeout would fail every request immediately.
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.connect_timeout_secs = self.connect_timeout_secs.max(1);

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match std::env::var(ENV_API_KEY) {
                Ok(k) if !k.trim().is_empty() => k.trim().to_string(),
                _ => {
                    tracing::warn!("{ENV_API_KEY} not set; using the shared {DEMO_API_KEY}");
                    DEMO_API_KEY.to_string()
                }
            };
        }

        // Fail early on unusable base urls rather than on the first selection.
        self.endpoints()?;
        Ok(self)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn timeouts(&self) -> TransportTimeouts {
        TransportTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            request: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::new(&self.apod_base_url, &self.horoscope_base_url, self.api_key.clone())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric override");
            None
        }
    }
}
