//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.wastebot/config.json`) and then
//! overlaid by environment variables. Every setting has a default so the bot starts with
//! an empty environment; placeholder credentials are reported at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Waste categories offered to the model, in prompt order.
pub const WASTE_CATEGORIES: [&str; 5] = ["一般垃圾", "資源回收", "廚餘", "有害垃圾", "紙容器回收"];

/// Fallback channel secret when neither env nor config provides one.
pub const PLACEHOLDER_CHANNEL_SECRET: &str = "123";
/// Fallback channel access token when neither env nor config provides one.
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "456";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// LINE Messaging API credentials and endpoints.
    #[serde(default)]
    pub line: LineConfig,

    /// Vision model settings (OpenAI-compatible chat completions).
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Listener bind, port and debug flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook server (default 5000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Verbose logging. Overridden by DEBUG env ("True" enables).
    #[serde(default = "default_debug")]
    pub debug: bool,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_debug() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            debug: default_debug(),
        }
    }
}

/// LINE channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Channel secret used to verify X-Line-Signature. Overridden by LINE_CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
    /// Long-lived channel access token. Overridden by LINE_CHANNEL_ACCESS_TOKEN env.
    pub channel_access_token: Option<String>,
    /// Messaging API base (default https://api.line.me).
    pub api_base: Option<String>,
    /// Content API base (default https://api-data.line.me).
    pub data_api_base: Option<String>,
}

/// Vision model config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// API key. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Base URL including the version segment (default https://api.openai.com/v1). Overridden by OPENAI_BASE_URL env.
    pub base_url: Option<String>,
    /// Model id. Overridden by OPENAI_MODEL env.
    pub model: Option<String>,
    /// Output token budget per classification (default 300).
    pub max_tokens: Option<u32>,
    /// Deadline for one classification request in seconds (default 60).
    pub timeout_secs: Option<u64>,
}

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_CLASSIFY_TIMEOUT_SECS: u64 = 60;

/// Non-empty trimmed env var.
fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_nonempty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the channel secret: env LINE_CHANNEL_SECRET overrides config; placeholder otherwise.
pub fn resolve_channel_secret(config: &Config) -> String {
    env_nonempty("LINE_CHANNEL_SECRET")
        .or_else(|| config_nonempty(&config.line.channel_secret))
        .unwrap_or_else(|| PLACEHOLDER_CHANNEL_SECRET.to_string())
}

/// Resolve the channel access token: env LINE_CHANNEL_ACCESS_TOKEN overrides config; placeholder otherwise.
pub fn resolve_access_token(config: &Config) -> String {
    env_nonempty("LINE_CHANNEL_ACCESS_TOKEN")
        .or_else(|| config_nonempty(&config.line.channel_access_token))
        .unwrap_or_else(|| PLACEHOLDER_ACCESS_TOKEN.to_string())
}

/// Resolve the model API key: env OPENAI_API_KEY overrides config. None when unset.
pub fn resolve_openai_api_key(config: &Config) -> Option<String> {
    env_nonempty("OPENAI_API_KEY").or_else(|| config_nonempty(&config.openai.api_key))
}

/// Resolve the model id: env OPENAI_MODEL, then config, then DEFAULT_OPENAI_MODEL.
pub fn resolve_openai_model(config: &Config) -> String {
    env_nonempty("OPENAI_MODEL")
        .or_else(|| config_nonempty(&config.openai.model))
        .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string())
}

/// Resolve the model base URL: env OPENAI_BASE_URL, then config. None means the client default.
pub fn resolve_openai_base_url(config: &Config) -> Option<String> {
    env_nonempty("OPENAI_BASE_URL").or_else(|| config_nonempty(&config.openai.base_url))
}

pub fn resolve_max_tokens(config: &Config) -> u32 {
    config.openai.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
}

pub fn resolve_classify_timeout(config: &Config) -> Duration {
    Duration::from_secs(
        config
            .openai
            .timeout_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_CLASSIFY_TIMEOUT_SECS),
    )
}

/// Resolve the listen port: env PORT overrides config when it parses as a port.
pub fn resolve_port(config: &Config) -> u16 {
    match env_nonempty("PORT") {
        Some(p) => match p.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                log::warn!("ignoring invalid PORT value: {}", p);
                config.gateway.port
            }
        },
        None => config.gateway.port,
    }
}

/// Resolve the debug flag: env DEBUG overrides config; only the literal "True" enables it.
pub fn resolve_debug(config: &Config) -> bool {
    match std::env::var("DEBUG") {
        Ok(v) => parse_debug_flag(&v),
        Err(_) => config.gateway.debug,
    }
}

fn parse_debug_flag(value: &str) -> bool {
    value == "True"
}

/// Fold environment overrides into the gateway section so later readers see one value.
pub fn apply_env_overrides(config: &mut Config) {
    config.gateway.port = resolve_port(config);
    config.gateway.debug = resolve_debug(config);
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WASTEBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".wastebot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Shorten a secret for display: first `keep` characters followed by "...".
pub fn mask_secret(secret: &str, keep: usize) -> String {
    let prefix: String = secret.chars().take(keep).collect();
    format!("{}...", prefix)
}
