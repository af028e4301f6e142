use serde::{Deserialize, Serialize};

use crate::paths::config_json_path;

/// Service endpoints and session tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Workflow engine serving the end-user endpoints
    #[serde(default)]
    pub n8n_base_url: Option<String>,
    /// Node backend serving `/admin/*`
    #[serde(default)]
    pub backend_base_url: Option<String>,
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries for idempotent GET requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Accepted platforms. Empty accepts any name.
    #[serde(default)]
    pub platforms: Vec<String>,
}

const CONFIG_FILE_PATH: &str = "config.toml";

fn default_inactivity_timeout_secs() -> u64 {
    5 * 60
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn parse_list_env(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n8n_base_url: None,
            backend_base_url: None,
            http_proxy: String::new(),
            https_proxy: String::new(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            platforms: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `~/.gestor-fichas/config.json`, else `./config.toml`, then
    /// apply environment overrides.
    pub fn new() -> Self {
        let mut config = Config::default();

        let mut loaded = false;
        let json_path = config_json_path();
        if json_path.exists() {
            match std::fs::read_to_string(&json_path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<Config>(&content).map_err(|e| e.to_string())
                }) {
                Ok(file_config) => {
                    config = file_config;
                    loaded = true;
                }
                Err(e) => log::warn!("Ignoring {}: {}", json_path.display(), e),
            }
        }

        if !loaded && std::path::Path::new(CONFIG_FILE_PATH).exists() {
            if let Ok(content) = std::fs::read_to_string(CONFIG_FILE_PATH) {
                match toml::from_str::<Config>(&content) {
                    Ok(file_config) => config = file_config,
                    Err(e) => log::warn!("Ignoring {}: {}", CONFIG_FILE_PATH, e),
                }
            }
        }

        config.reset_zero_timeouts();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Zero timeouts from a config file fall back to the defaults.
    fn reset_zero_timeouts(&mut self) {
        if self.inactivity_timeout_secs == 0 {
            log::warn!("Ignoring inactivity_timeout_secs = 0");
            self.inactivity_timeout_secs = default_inactivity_timeout_secs();
        }
        if self.request_timeout_secs == 0 {
            log::warn!("Ignoring request_timeout_secs = 0");
            self.request_timeout_secs = default_request_timeout_secs();
        }
    }

    /// Apply overrides from an environment lookup. The `VITE_` names are the
    /// ones used by the web front end and are accepted as fallbacks.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("N8N_BASE_URL").or_else(|| lookup("VITE_N8N_BASE_URL")) {
            self.n8n_base_url = Some(url);
        }
        if let Some(url) = lookup("BACKEND_BASE_URL").or_else(|| lookup("VITE_BACKEND_BASE_URL")) {
            self.backend_base_url = Some(url);
        }
        if let Some(http_proxy) = lookup("HTTP_PROXY") {
            self.http_proxy = http_proxy;
        }
        if let Some(https_proxy) = lookup("HTTPS_PROXY") {
            self.https_proxy = https_proxy;
        }
        if let Some(secs) = lookup("FICHAS_INACTIVITY_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.inactivity_timeout_secs = secs,
                _ => log::warn!("Ignoring FICHAS_INACTIVITY_SECS={secs}"),
            }
        }
        if let Some(platforms) = lookup("FICHAS_PLATFORMS") {
            self.platforms = parse_list_env(&platforms);
        }
    }

    /// Names of the settings a networked client needs that are missing or
    /// unusable. Timeouts must be at least one second.
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut invalid = Vec::new();
        if self.n8n_base_url.as_deref().map_or(true, str::is_empty) {
            invalid.push("N8N_BASE_URL");
        }
        if self.backend_base_url.as_deref().map_or(true, str::is_empty) {
            invalid.push("BACKEND_BASE_URL");
        }
        if self.inactivity_timeout_secs == 0 {
            invalid.push("inactivity_timeout_secs");
        }
        if self.request_timeout_secs == 0 {
            invalid.push("request_timeout_secs");
        }
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(invalid)
        }
    }

    pub fn inactivity_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
