use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Identifies as a common desktop browser; some providers reject bare clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,
    /// Per-feed request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Items taken from each feed when `/api/news` has no `limit`
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    pub feeds: Vec<FeedConfig>,
}

fn default_database_url() -> String {
    "sqlite:news.db?mode=rwc".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_frontend_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

impl FeedConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            bind_addr: default_bind_addr(),
            frontend_origin: default_frontend_origin(),
            fetch_timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
            default_limit: default_limit(),
            feeds: vec![
                FeedConfig::new("BBC", "https://feeds.bbci.co.uk/news/world/rss.xml"),
                FeedConfig::new("The Guardian", "https://www.theguardian.com/world/rss"),
                FeedConfig::new("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
            ],
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise the built-in feed list.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies `DATABASE_URL`, `BIND_ADDR` and `FRONTEND_ORIGIN` when set.
    pub fn apply_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(origin) = lookup("FRONTEND_ORIGIN") {
            self.frontend_origin = origin;
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_fetch_timeout(), 10);
        assert_eq!(default_limit(), 5);
        assert!(default_user_agent().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_default_config_has_three_world_feeds() {
        let config = Config::default();
        let names: Vec<_> = config.feeds.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["BBC", "The Guardian", "Al Jazeera"]);
        assert!(config.feeds.iter().all(|f| f.url.starts_with("https://")));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            database_url = "sqlite:briefing.db"
            fetch_timeout = 3
            default_limit = 8

            [[feeds]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"

            [[feeds]]
            name = "Another Feed"
            url = "https://example.org/rss"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.database_url, "sqlite:briefing.db");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.default_limit, 8);
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0], FeedConfig::new("Test Feed", "https://example.com/feed.xml"));
        assert_eq!(config.feeds[1].name, "Another Feed");
    }

    #[test]
    fn test_load_config_with_defaults() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.fetch_timeout, 10);
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.frontend_origin, "http://localhost:5173");
        assert_eq!(config.user_agent, BROWSER_USER_AGENT);
        assert_eq!(config.feeds.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config.feeds.len(), 3);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_config_missing_required_fields() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
            # Missing url field
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_feed_order_is_preserved() {
        let content = r#"
            [[feeds]]
            name = "C"
            url = "https://c.example.com/rss"

            [[feeds]]
            name = "A"
            url = "https://a.example.com/rss"

            [[feeds]]
            name = "B"
            url = "https://b.example.com/rss"
        "#;

        let config = Config::from_str(content).unwrap();
        let names: Vec<_> = config.feeds.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("FRONTEND_ORIGIN", "https://briefing.example.com"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.frontend_origin, "https://briefing.example.com");
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
    }
}
