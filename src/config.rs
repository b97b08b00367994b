use crate::error::ConfigError;
use std::time::Duration;

/// Environment variable consulted when no API key is passed on the command line
pub const API_KEY_ENV: &str = "SCRAPINGANT_API_KEY";

pub const SCRAPINGANT_API_URL: &str = "https://api.scrapingant.com/v2/general";
pub const BASE_URL: &str = "https://huispedia.nl";

pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Dutch cities with a dedicated search slug on Huispedia
pub const KNOWN_LOCATIONS: &[&str] = &[
    "amsterdam",
    "rotterdam",
    "den-haag",
    "utrecht",
    "eindhoven",
    "groningen",
    "tilburg",
    "almere",
    "breda",
    "nijmegen",
    "haarlem",
    "arnhem",
    "enschede",
    "amersfoort",
    "zaanstad",
    "apeldoorn",
    "hoofddorp",
    "maastricht",
    "leiden",
    "dordrecht",
    "zoetermeer",
    "zwolle",
    "deventer",
    "delft",
    "alkmaar",
];

/// Settings shared by the fetcher, the search walker and the detail pool
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub api_key: String,
    /// Rendering API endpoint
    pub api_url: String,
    /// Portal root used to build search URLs and absolutize links
    pub base_url: String,
    pub max_workers: usize,
    pub request_timeout: Duration,
    /// Pause between two consecutive search pages
    pub page_delay: Duration,
}

impl ScrapeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: SCRAPINGANT_API_URL.to_string(),
            base_url: BASE_URL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            request_timeout: DEFAULT_TIMEOUT,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Build a config from the CLI key, falling back to the environment
    pub fn from_env(cli_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = resolve_api_key(cli_key, std::env::var(API_KEY_ENV).ok())?;
        Ok(Self::new(api_key))
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Result<Self, ConfigError> {
        if max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.max_workers = max_workers;
        Ok(self)
    }
}

/// Pick the explicit key over the environment one; blank values count as missing.
pub fn resolve_api_key(
    cli_key: Option<String>,
    env_key: Option<String>,
) -> Result<String, ConfigError> {
    cli_key
        .into_iter()
        .chain(env_key)
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or(ConfigError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_key_wins_over_environment() {
        let key = resolve_api_key(Some("cli".into()), Some("env".into())).unwrap();
        assert_eq!(key, "cli");
    }

    #[test]
    fn environment_key_used_when_flag_absent() {
        let key = resolve_api_key(None, Some("env".into())).unwrap();
        assert_eq!(key, "env");
    }

    #[test]
    fn blank_keys_are_missing() {
        assert_eq!(
            resolve_api_key(Some("  ".into()), None),
            Err(ConfigError::MissingApiKey)
        );
        assert_eq!(resolve_api_key(None, None), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn zero_workers_rejected() {
        let err = ScrapeConfig::new("key").with_max_workers(0).unwrap_err();
        assert_eq!(err, ConfigError::NoWorkers);
        assert_eq!(ScrapeConfig::new("key").with_max_workers(3).unwrap().max_workers, 3);
    }
}
