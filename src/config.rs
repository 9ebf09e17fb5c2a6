// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::stack::DEFAULT_API_BASE;

pub const ENV_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
pub const ENV_STACKEXCHANGE_KEY: &str = "STACKEXCHANGE_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Site → tags; one search per site.
    pub tags: BTreeMap<String, Vec<String>>,
    pub slack_webhook_url: Option<String>,
    pub state_file: PathBuf,
    pub stackexchange_key: Option<String>,
    pub api_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    #[serde(default)]
    tags: BTreeMap<String, Vec<String>>,
    slack_webhook_url: Option<String>,
    state_file: Option<PathBuf>,
    stackexchange_key: Option<String>,
    api_base_url: Option<String>,
}

/// Load config from `path` (TOML or JSON, by extension), then let
/// `$SLACK_WEBHOOK_URL` / `$STACKEXCHANGE_KEY` override the file.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(anyhow!("config file {} does not exist", path.display()));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let raw = parse(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    finish(raw, |k| std::env::var(k).ok())
}

fn parse(s: &str, hint_ext: &str) -> Result<RawConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        // No usable extension: JSON objects start with '{', anything else is TOML.
        _ if s.trim_start().starts_with('{') => Ok(serde_json::from_str(s)?),
        _ => toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}")),
    }
}

fn finish(raw: RawConfig, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let state_file = raw
        .state_file
        .ok_or_else(|| anyhow!("state file location is not set in config file"))?;

    let non_empty = |v: String| {
        let t = v.trim().to_string();
        (!t.is_empty()).then_some(t)
    };

    Ok(Config {
        tags: raw.tags,
        slack_webhook_url: env(ENV_SLACK_WEBHOOK_URL)
            .and_then(non_empty)
            .or(raw.slack_webhook_url.and_then(non_empty)),
        state_file,
        stackexchange_key: env(ENV_STACKEXCHANGE_KEY)
            .and_then(non_empty)
            .or(raw.stackexchange_key.and_then(non_empty)),
        api_base_url: raw
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
    })
}
