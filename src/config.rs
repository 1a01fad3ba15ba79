use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3500;
pub const DEFAULT_SEARCH_URL: &str = "https://www.bing.com/search";
pub const DEFAULT_AUGMENTATION: &str = "blog ou portal de noticias";
pub const DEFAULT_FAN_OUT: usize = 5;
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings for the scraper service.
///
/// Every key is optional; `from_env` falls back to the defaults above so the
/// service starts with no environment at all.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub port: u16,
    /// Search engine result page endpoint; the query is appended as `?q=`.
    pub search_url: String,
    /// Clause appended to every topic to bias results toward editorial sites.
    pub augmentation: String,
    /// Maximum number of candidate links kept from the result page.
    pub fan_out: usize,
    pub search_timeout: Duration,
    pub render_timeout: Duration,
    /// Number of tabs rendered at once. 1 keeps the sequential behaviour.
    pub render_concurrency: usize,
    pub chrome_path: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            augmentation: DEFAULT_AUGMENTATION.to_string(),
            fan_out: DEFAULT_FAN_OUT,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            render_concurrency: 1,
            chrome_path: None,
        }
    }
}

impl ScraperConfig {
    /// Reads the configuration from process environment variables.
    /// Call `dotenv().ok()` first if a `.env` file should be honoured.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = parse_var("PORT", defaults.port);
        let search_url = env::var("SEARCH_URL").unwrap_or(defaults.search_url);
        let augmentation = env::var("SEARCH_AUGMENTATION").unwrap_or(defaults.augmentation);
        let fan_out = parse_var("SEARCH_FAN_OUT", defaults.fan_out).max(1);
        let search_timeout = Duration::from_secs(parse_var(
            "SEARCH_TIMEOUT_SECS",
            defaults.search_timeout.as_secs(),
        ));
        let render_timeout = Duration::from_secs(parse_var(
            "RENDER_TIMEOUT_SECS",
            defaults.render_timeout.as_secs(),
        ));
        let render_concurrency = parse_var("RENDER_CONCURRENCY", defaults.render_concurrency).max(1);
        let chrome_path = env::var("CHROME_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            port,
            search_url,
            augmentation,
            fan_out,
            search_timeout,
            render_timeout,
            render_concurrency,
            chrome_path,
        }
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("{} has invalid value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = ScraperConfig::default();
        assert_eq!(config.port, 3500);
        assert_eq!(config.fan_out, 5);
        assert_eq!(config.render_timeout, Duration::from_secs(15));
        assert_eq!(config.render_concurrency, 1);
        assert!(config.search_url.contains("bing.com"));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        env::set_var("TEMA_SCRAPER_TEST_FAN_OUT", "five");
        assert_eq!(parse_var("TEMA_SCRAPER_TEST_FAN_OUT", 5usize), 5);
        env::set_var("TEMA_SCRAPER_TEST_FAN_OUT", " 3 ");
        assert_eq!(parse_var("TEMA_SCRAPER_TEST_FAN_OUT", 5usize), 3);
        env::remove_var("TEMA_SCRAPER_TEST_FAN_OUT");
    }
}
