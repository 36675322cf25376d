//! Provider configuration resolution
//!
//! API keys resolve Database → ENV → TOML. Endpoints and timeouts come from the
//! TOML `[providers]` section (call timeout may be overridden in the database),
//! with compiled defaults underneath.

use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tracing::{info, warn};
use wayfare_common::config::{TomlConfig, DEFAULT_IMAGE_URL};
use wayfare_common::Result;

use crate::db::settings;
use crate::providers::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::providers::scraper::DEFAULT_SCRAPER_URL;

pub const UNSPLASH_ACCESS_KEY_ENV: &str = "WAYFARE_UNSPLASH_ACCESS_KEY";
pub const GOOGLE_MAPS_API_KEY_ENV: &str = "WAYFARE_GOOGLE_MAPS_API_KEY";
pub const LLM_API_KEY_ENV: &str = "WAYFARE_LLM_API_KEY";

const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

/// Text generation and scraping render whole pages; they get a longer deadline
const GENERATION_TIMEOUT: Duration = Duration::from_secs(90);

/// Everything needed to construct the provider clients
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub unsplash_access_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub scraper_url: String,
    /// Deadline for photo, geocoding and routing calls
    pub call_timeout: Duration,
    /// Deadline for text generation and scraping calls
    pub generation_timeout: Duration,
    pub default_image_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            unsplash_access_key: None,
            google_maps_api_key: None,
            llm_api_key: None,
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            scraper_url: DEFAULT_SCRAPER_URL.to_string(),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            generation_timeout: GENERATION_TIMEOUT,
            default_image_url: DEFAULT_IMAGE_URL.to_string(),
        }
    }
}

/// Resolve all provider settings
pub async fn resolve_provider_settings(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<ProviderSettings> {
    let providers = &toml_config.providers;
    let defaults = ProviderSettings::default();

    let unsplash_access_key = resolve_api_key(
        "Unsplash access key",
        settings::get_unsplash_access_key(db).await?,
        UNSPLASH_ACCESS_KEY_ENV,
        providers.unsplash_access_key.as_deref(),
    );
    let google_maps_api_key = resolve_api_key(
        "Google Maps API key",
        settings::get_google_maps_api_key(db).await?,
        GOOGLE_MAPS_API_KEY_ENV,
        providers.google_maps_api_key.as_deref(),
    );
    let llm_api_key = resolve_api_key(
        "LLM API key",
        settings::get_llm_api_key(db).await?,
        LLM_API_KEY_ENV,
        providers.llm_api_key.as_deref(),
    );

    let call_timeout_ms = match settings::provider_call_timeout_ms(db).await? {
        Some(ms) => ms,
        None => providers.call_timeout_ms.unwrap_or(DEFAULT_CALL_TIMEOUT_MS),
    };

    Ok(ProviderSettings {
        unsplash_access_key,
        google_maps_api_key,
        llm_api_key,
        llm_base_url: non_blank(providers.llm_base_url.as_deref()).unwrap_or(defaults.llm_base_url),
        llm_model: non_blank(providers.llm_model.as_deref()).unwrap_or(defaults.llm_model),
        scraper_url: non_blank(providers.scraper_url.as_deref()).unwrap_or(defaults.scraper_url),
        call_timeout: Duration::from_millis(call_timeout_ms.max(1)),
        generation_timeout: defaults.generation_timeout,
        default_image_url: non_blank(providers.default_image_url.as_deref())
            .unwrap_or(defaults.default_image_url),
    })
}

/// Pick an API key from database, environment, then TOML
///
/// Returns `None` (with a warning) when no source holds a usable key; the
/// provider is still built and fails fast at call time.
pub fn resolve_api_key(
    label: &str,
    db_key: Option<String>,
    env_var: &str,
    toml_key: Option<&str>,
) -> Option<String> {
    let env_key = std::env::var(env_var).ok();

    let candidates = [
        ("database", db_key.as_deref()),
        ("environment", env_key.as_deref()),
        ("TOML", toml_key),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    let chosen = candidates
        .into_iter()
        .find(|(_, key)| key.is_some_and(is_valid_key));
    match chosen {
        Some((source, Some(key))) => {
            info!("{} loaded from {}", label, source);
            Some(key.to_string())
        }
        _ => {
            warn!(
                "{} not configured (set it in the settings table, {} or the [providers] TOML section)",
                label, env_var
            );
            None
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| is_valid_key(v)).map(str::to_string)
}
