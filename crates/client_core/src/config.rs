use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use shared::protocol::{PopulationRequest, DEFAULT_PAGE_LIMIT, DEFAULT_POPULATION_MAX_PRODUCTS};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const SETTINGS_FILE: &str = "shopper.toml";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Wait between a population trigger and the single follow-up catalog reload.
    pub population_recheck_delay: Duration,
    pub population_max_products: u32,
    pub population_use_fallback: bool,
    pub product_page_limit: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout: Duration::from_secs(30),
            population_recheck_delay: Duration::from_secs(3),
            population_max_products: DEFAULT_POPULATION_MAX_PRODUCTS,
            population_use_fallback: true,
            product_page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ClientSettings {
    pub fn population_request(&self) -> PopulationRequest {
        PopulationRequest {
            max_products: self.population_max_products,
            use_fallback: self.population_use_fallback,
        }
    }
}

/// Defaults, then `shopper.toml` in the working directory, then environment overrides.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    apply_file_overrides(&mut settings, Path::new(SETTINGS_FILE));
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_overrides(settings: &mut ClientSettings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
        Ok(file_cfg) => apply_overrides(settings, |key| {
            let key = key.trim_start_matches("APP__").to_ascii_lowercase();
            file_cfg.get(&key).map(|value| match value {
                toml::Value::String(text) => text.clone(),
                other => other.to_string(),
            })
        }),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring malformed settings file");
        }
    }
}

fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SHOPPER_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_base_url = v;
    }

    if let Some(secs) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
        settings.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = lookup("APP__RECHECK_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        settings.population_recheck_delay = Duration::from_millis(ms);
    }
    if let Some(max) = lookup("APP__POPULATION_MAX_PRODUCTS").and_then(|v| v.parse::<u32>().ok())
    {
        settings.population_max_products = max;
    }
    if let Some(flag) = lookup("APP__POPULATION_USE_FALLBACK").and_then(|v| v.parse::<bool>().ok())
    {
        settings.population_use_fallback = flag;
    }
    if let Some(limit) = lookup("APP__PRODUCT_PAGE_LIMIT").and_then(|v| v.parse::<u32>().ok()) {
        settings.product_page_limit = limit;
    }
}

/// Trims the configured base URL, drops trailing slashes, and requires an http(s) scheme.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_API_BASE_URL.to_string());
    }

    let parsed =
        Url::parse(trimmed).with_context(|| format!("invalid api base url '{trimmed}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("api base url '{trimmed}' must use http or https");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
