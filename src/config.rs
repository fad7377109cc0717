use crate::Result;
use anyhow::anyhow;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "DASHSCOPE_API_KEY";

// TOML configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    // secret: no default value
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_rust_log_format")]
    pub rust_log_format: String,
}

// Default values
fn default_port() -> u16 {
    3000
}
fn default_body_limit_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}
fn default_model() -> String {
    "qwen-vl-max".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.1
}
fn default_rust_log_format() -> String {
    "term".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log_format: default_rust_log_format(),
        }
    }
}

static CONFIG: Lazy<Config> = Lazy::new(|| {
    load_config().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config files: {}. Using defaults.",
            e
        );
        Config::default()
    })
});

static CONFIG_STORE: Lazy<Arc<Mutex<HashMap<String, String>>>> =
    Lazy::new(|| Arc::new(Mutex::new(HashMap::new())));

pub fn get(name: &str) -> Result<String> {
    // Priority 1: CONFIG_STORE (runtime overrides)
    if let Some(value) = get_from_store(name) {
        if value.is_empty() {
            return Err(anyhow!("{} is empty", name));
        }
        return Ok(value);
    }

    // Priority 2: Environment variables
    if let Ok(val) = std::env::var(name)
        && !val.is_empty()
    {
        return Ok(val);
    }

    // Priority 3: TOML config
    let toml_value = match name {
        "PORT" => Some(CONFIG.server.port.to_string()),
        "BODY_LIMIT_BYTES" => Some(CONFIG.server.body_limit_bytes.to_string()),
        "VISION_BASE_URL" => Some(CONFIG.vision.base_url.clone()),
        "VISION_MODEL" => Some(CONFIG.vision.model.clone()),
        "VISION_MAX_TOKENS" => Some(CONFIG.vision.max_tokens.to_string()),
        "VISION_TEMPERATURE" => Some(CONFIG.vision.temperature.to_string()),
        API_KEY => Some(CONFIG.vision.api_key.clone()),
        "RUST_LOG_FORMAT" => Some(CONFIG.logging.rust_log_format.clone()),
        _ => None,
    };

    if let Some(value) = toml_value
        && !value.is_empty()
    {
        return Ok(value);
    }

    Err(anyhow!("Configuration key not found: {}", name))
}

/// Looks up `name` and parses it, naming the key when the value is malformed.
pub fn get_parsed<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = get(name)?;
    value
        .parse()
        .map_err(|err| anyhow!("Invalid value for {}: {:?} ({})", name, value, err))
}

pub fn set(name: &str, value: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.insert(name.to_string(), value.to_string());
    }
}

pub fn unset(name: &str) {
    if let Ok(mut store) = CONFIG_STORE.lock() {
        store.remove(name);
    }
}

fn get_from_store(name: &str) -> Option<String> {
    if let Ok(store) = CONFIG_STORE.lock() {
        store.get(name).cloned()
    } else {
        None
    }
}

/// Load configuration from TOML files with priority:
/// 1. config/config.local.toml (git-ignored, for local overrides)
/// 2. config/config.toml (git-managed template)
/// 3. Default values
fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let base_path = "config/config.toml";
    if Path::new(base_path).exists() {
        let content = fs::read_to_string(base_path)?;
        config = toml::from_str(&content)?;
    }

    let local_path = "config/config.local.toml";
    if Path::new(local_path).exists() {
        let content = fs::read_to_string(local_path)?;
        let local_config: LocalConfig = toml::from_str(&content)?;
        merge_config(&mut config, local_config);
    }

    Ok(config)
}

/// Overlay read from `config.local.toml`. Every key that is present wins,
/// including one that restates the built-in default.
#[derive(Debug, Deserialize, Default)]
struct LocalConfig {
    #[serde(default)]
    server: LocalServerConfig,
    #[serde(default)]
    vision: LocalVisionConfig,
    #[serde(default)]
    logging: LocalLoggingConfig,
}

#[derive(Debug, Deserialize, Default)]
struct LocalServerConfig {
    port: Option<u16>,
    body_limit_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct LocalVisionConfig {
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LocalLoggingConfig {
    rust_log_format: Option<String>,
}

fn overlay<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Merge local config into base config (local values override base values)
fn merge_config(base: &mut Config, local: LocalConfig) {
    // Server
    overlay(&mut base.server.port, local.server.port);
    overlay(&mut base.server.body_limit_bytes, local.server.body_limit_bytes);

    // Vision
    overlay(&mut base.vision.base_url, local.vision.base_url);
    overlay(&mut base.vision.model, local.vision.model);
    overlay(&mut base.vision.max_tokens, local.vision.max_tokens);
    overlay(&mut base.vision.temperature, local.vision.temperature);
    overlay(&mut base.vision.api_key, local.vision.api_key);

    // Logging
    overlay(&mut base.logging.rust_log_format, local.logging.rust_log_format);
}
