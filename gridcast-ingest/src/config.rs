use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub culture: String,
    pub timeout_secs: u64,
    /// Earliest backfill bound, `YYYY-MM-DD`. Used only when the store is empty.
    pub base_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResampleConfig {
    pub output_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub resample: ResampleConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("GRIDCAST_CONFIG").unwrap_or_else(|_| "gridcast.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            path = "data/grid_data.db"

            [source]
            url = "https://datahub.ren.pt/service/download/csv/1354"
            culture = "pt-PT"
            timeout_secs = 120
            base_date = "2020-01-01"

            [resample]
            output_path = "data/processed/grid_data_hourly.csv"

            [metrics]
            bind_addr = "127.0.0.1:9188"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.source.culture, "pt-PT");
        assert_eq!(cfg.source.base_date, "2020-01-01");
        assert!(cfg.metrics.is_some());
    }

    #[test]
    fn metrics_section_is_optional() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            path = ":memory:"

            [source]
            url = "http://localhost/csv"
            culture = "pt-PT"
            timeout_secs = 5
            base_date = "2024-01-01"

            [resample]
            output_path = "out.csv"
            "#,
        )
        .unwrap();

        assert!(cfg.metrics.is_none());
    }
}
