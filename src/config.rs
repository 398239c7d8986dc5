use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Prefix the percent-encoded feed URL is appended to for relay fetches
    #[serde(default = "default_relay_base")]
    pub relay_base: String,
    /// Maximum number of items handed to the consumer after sorting
    #[serde(default = "default_max_display_items")]
    pub max_display_items: usize,
    /// Substrings a direct response's Content-Type must contain (any of them)
    #[serde(default = "default_accepted_content_types")]
    pub accepted_content_types: Vec<String>,
    /// Per-request timeout in seconds; unset leaves the transport default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub feeds: Vec<FeedSource>,
}

fn default_relay_base() -> String {
    "https://api.allorigins.win/raw?url=".to_string()
}

fn default_max_display_items() -> usize {
    15
}

fn default_accepted_content_types() -> Vec<String> {
    vec!["xml".to_string(), "rss".to_string()]
}

fn default_user_agent() -> String {
    "FeedDigest/1.0 (RSS Aggregator)".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_max_display_items(), 15);
        assert_eq!(default_relay_base(), "https://api.allorigins.win/raw?url=");
        assert_eq!(default_accepted_content_types(), vec!["xml", "rss"]);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            relay_base = "https://relay.example.net/get?u="
            max_display_items = 30
            request_timeout_secs = 20

            [[feeds]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"

            [[feeds]]
            name = "Another Feed"
            url = "https://example.org/atom"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.relay_base, "https://relay.example.net/get?u=");
        assert_eq!(config.max_display_items, 30);
        assert_eq!(config.request_timeout_secs, Some(20));
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0], FeedSource::new("Test Feed", "https://example.com/feed.xml"));
        assert_eq!(config.feeds[1].name, "Another Feed");
        assert_eq!(config.feeds[1].url, "https://example.org/atom");
    }

    #[test]
    fn test_load_config_with_defaults() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.max_display_items, 15);
        assert_eq!(config.relay_base, "https://api.allorigins.win/raw?url=");
        assert_eq!(config.accepted_content_types, vec!["xml", "rss"]);
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.user_agent, "FeedDigest/1.0 (RSS Aggregator)");
        assert_eq!(config.feeds.len(), 1);
    }

    #[test]
    fn test_custom_content_types() {
        let content = r#"
            accepted_content_types = ["atom", "xml"]
            feeds = []
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.accepted_content_types, vec!["atom", "xml"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/feeds.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_required_fields() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
            # Missing url field
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_feeds_list() {
        let result = Config::from_str("max_display_items = 10");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_feeds_list() {
        let content = "feeds = []";

        let config = Config::from_str(content).unwrap();
        assert!(config.feeds.is_empty());
    }
}
