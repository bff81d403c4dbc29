use anyhow::{anyhow, Context};
use catalog_service::SanityConfig;
use std::time::Duration;
use storefront_types::parse_bool;

pub const DEFAULT_DATASET: &str = "production";
pub const DEFAULT_API_VERSION: &str = "2024-01-01";
pub const DEFAULT_REVALIDATE_SECS: u64 = 30;
pub const DEFAULT_SELF_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CONTACT_URL: &str = "https://instagram.com/jflkicks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub sanity: SanityConfig,
    pub revalidate: Duration,
    pub self_addr: String,
    pub port: u16,
    pub contact_url: String,
}

impl StorefrontConfig {
    /// Reads the process environment, which includes everything loaded from `.env`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_vars(|key| envmnt::exists(key).then(|| envmnt::get_or(key, "")))
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let var = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let project_id = var("SANITY_PROJECT_ID")
            .ok_or_else(|| anyhow!("SANITY_PROJECT_ID is not set"))?;
        let use_cdn = match var("SANITY_USE_CDN") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("SANITY_USE_CDN has invalid value {raw:?}"))?,
            None => true,
        };
        let revalidate = match var("REVALIDATE_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("REVALIDATE_SECS has invalid value {raw:?}"))?,
            None => DEFAULT_REVALIDATE_SECS,
        };
        if revalidate == 0 {
            return Err(anyhow!("REVALIDATE_SECS must be at least 1"));
        }
        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT has invalid value {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            sanity: SanityConfig {
                project_id,
                dataset: var("SANITY_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string()),
                api_version: var("SANITY_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                use_cdn,
                token: var("SANITY_TOKEN"),
            },
            revalidate: Duration::from_secs(revalidate),
            self_addr: var("SELF_ADDR").unwrap_or_else(|| DEFAULT_SELF_ADDR.to_string()),
            port,
            contact_url: var("CONTACT_URL").unwrap_or_else(|| DEFAULT_CONTACT_URL.to_string()),
        })
    }
}
