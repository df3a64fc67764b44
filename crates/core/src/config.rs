use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `STOREFRONT_DASHBOARD__` and an optional TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Symbolic range tag used until the dashboard selects another one.
    #[serde(default = "default_range")]
    pub default_range: String,
    /// Trailing-edge window for coalescing change notifications.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_trending_limit")]
    pub trending_limit: usize,
    /// Cap for the per-product and per-page ranking lists.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// JSON document seeding the in-memory data source.
    #[serde(default)]
    pub fixture_path: Option<String>,
}

fn default_range() -> String {
    "7days".to_string()
}
fn default_debounce_ms() -> u64 {
    250
}
fn default_trending_limit() -> usize {
    10
}
fn default_list_limit() -> usize {
    20
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_range: default_range(),
            debounce_ms: default_debounce_ms(),
            trending_limit: default_trending_limit(),
            list_limit: default_list_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `storefront-dashboard.toml` (if present) and
    /// environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("storefront-dashboard").required(false))
            .add_source(
                config::Environment::with_prefix("STOREFRONT_DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.analytics.default_range, "7days");
        assert_eq!(config.analytics.debounce_ms, 250);
        assert_eq!(config.analytics.trending_limit, 10);
        assert_eq!(config.analytics.list_limit, 20);
        assert!(config.source.fixture_path.is_none());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"analytics": {"debounce_ms": 50}}"#).unwrap();
        assert_eq!(config.analytics.debounce_ms, 50);
        assert_eq!(config.analytics.list_limit, 20);
        assert_eq!(config.analytics.default_range, "7days");
    }
}
