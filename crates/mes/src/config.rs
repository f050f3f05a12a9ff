// Config is a central place for runtime configuration.
// It loads values from environment variables (and `.env` when present).

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub api_addr: String,
    pub migrate_on_startup: bool,
    pub page_limit_max: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let api_addr = env_or_fallback("MES_API_ADDR", "API_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let migrate_on_startup = env_bool("MES_MIGRATE_ON_STARTUP").unwrap_or(false);

        let page_limit_max = std::env::var("MES_PAGE_LIMIT_MAX")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100)
            .clamp(1, 1000);

        Ok(Self {
            database_url,
            api_addr,
            migrate_on_startup,
            page_limit_max,
        })
    }
}

/// Settings for talking to a running `mesd` from the client side.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let base_url = env_or_fallback("MES_BASE_URL", "BASE_URL").unwrap_or(defaults.base_url);
        let timeout_ms = std::env::var("MES_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_ms);

        Self {
            base_url,
            timeout_ms,
        }
    }
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| parse_bool(&v))
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn bool_flags_accept_common_spellings() {
        for v in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_bool(v), "{v} should be true");
        }
        for v in ["0", "false", "off", "", "nope"] {
            assert!(!parse_bool(v), "{v} should be false");
        }
    }
}
