use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub aiseg: AisegConfig,
    pub mqtt: MqttConfig,
    pub device: DeviceConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AisegConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub clean_session: Option<bool>,
    /// Home Assistant discovery topic prefix.
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

fn default_discovery_prefix() -> String {
    "homeassistant".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable device identifier; also the root of every state topic and
    /// unique_id, so changing it re-creates every sensor downstream.
    pub id: String,
    pub name: String,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_manufacturer() -> String {
    "Panasonic".into()
}

fn default_model() -> String {
    "AISEG2".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    #[serde(default = "default_error_retry_delay_secs")]
    pub error_retry_delay_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}
fn default_max_consecutive_errors() -> u32 {
    10
}
fn default_error_retry_delay_secs() -> u64 {
    60
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_consecutive_errors: default_max_consecutive_errors(),
            error_retry_delay_secs: default_error_retry_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Highest circuit index the cleanup tool will emit removals for.
    #[serde(default = "default_circuit_max")]
    pub circuit_max: u16,
}

fn default_circuit_max() -> u16 {
    64
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            circuit_max: default_circuit_max(),
        }
    }
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// Afterwards, if AISEG_HOST env is set, override `aiseg.host`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let raw = fs::read_to_string(path)?;
        let expanded = expand_env_placeholders(&raw)?;
        let mut cfg: Self = serde_yaml::from_str(&expanded)?;

        if let Ok(host) = std::env::var("AISEG_HOST") {
            cfg.aiseg.host = host;
        }

        anyhow::ensure!(!cfg.aiseg.host.is_empty(), "aiseg.host must not be empty");
        anyhow::ensure!(!cfg.device.id.is_empty(), "device.id must not be empty");
        anyhow::ensure!(
            cfg.poll.max_consecutive_errors >= 1,
            "poll.max_consecutive_errors must be at least 1"
        );
        anyhow::ensure!(
            cfg.poll.error_retry_delay_secs <= cfg.poll.interval_secs,
            "poll.error_retry_delay_secs must not exceed poll.interval_secs"
        );
        Ok(cfg)
    }
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" is an escape for a literal "$"; a lone "$" passes through unchanged.
fn expand_env_placeholders(input: &str) -> Result<String, anyhow::Error> {
    use anyhow::Context;

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(open @ ('(' | '{')) => {
                chars.next();
                let close = if open == '(' { ')' } else { '}' };
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == close => break,
                        Some(ch) => name.push(ch),
                        None => anyhow::bail!("unterminated env placeholder: missing '{close}'"),
                    }
                }
                let val = std::env::var(&name)
                    .with_context(|| format!("missing environment variable: {name}"))?;
                out.push_str(&val);
            }
            _ => out.push('$'),
        }
    }

    Ok(out)
}
