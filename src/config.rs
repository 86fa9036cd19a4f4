use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub upload: UploadConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Items priced below this are dropped from search results
    pub min_price: f64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            catalog: CatalogConfig {
                base_url: "https://backendap.cdpos.uz/api/drugs/".to_string(),
                min_price: 10.0,
                timeout_secs: 10,
            },
            upload: UploadConfig {
                url: "https://backendap.cdpos.uz/router/upload/upload/".to_string(),
            },
            export: ExportConfig {
                output_dir: PathBuf::from("exports"),
            },
        }
    }
}

impl AppConfig {
    /// Load config: defaults, then optional `basket-invoice.{toml,yaml,json}`,
    /// then `APP__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("basket-invoice").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Builder seeded with the defaults
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let d = Self::default();
        Config::builder()
            .set_default("server.host", d.server.host)?
            .set_default("server.port", i64::from(d.server.port))?
            .set_default("catalog.base_url", d.catalog.base_url)?
            .set_default("catalog.min_price", d.catalog.min_price)?
            .set_default("catalog.timeout_secs", d.catalog.timeout_secs as i64)?
            .set_default("upload.url", d.upload.url)?
            .set_default("export.output_dir", d.export.output_dir.to_string_lossy().into_owned())
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default_impl() {
        let cfg: AppConfig = AppConfig::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.catalog.min_price, 10.0);
        assert_eq!(cfg.catalog_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.export.output_dir, PathBuf::from("exports"));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn overrides_replace_defaults() {
        let cfg: AppConfig = AppConfig::builder()
            .unwrap()
            .set_override("server.port", 9090_i64)
            .unwrap()
            .set_override("catalog.min_price", 25.5)
            .unwrap()
            .set_override("export.output_dir", "/tmp/invoices")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.catalog.min_price, 25.5);
        assert_eq!(cfg.export.output_dir, PathBuf::from("/tmp/invoices"));
        assert_eq!(cfg.upload.url, AppConfig::default().upload.url);
    }
}
