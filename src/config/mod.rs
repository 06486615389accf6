use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::WikiError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SITE_NAME: &str = "Folio";

/// Which [`crate::services::ArticleStore`] implementation to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = WikiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(WikiError::Config(format!("unknown store backend '{}'", other))),
        }
    }
}

/// Application configuration and constants
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory the file store keeps articles in
    pub data_dir: PathBuf,
    /// Directory holding `header.html`, `footer.html`, `index.html`, `edit.html`, `view.html`
    pub template_dir: PathBuf,
    /// Directory holding the `css/`, `js/`, `font/` and `img/` asset trees
    pub asset_dir: PathBuf,
    pub store: StoreBackend,
    pub store_timeout: Duration,
    pub site_name: String,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("articles"),
            template_dir: PathBuf::from("tmpl"),
            asset_dir: PathBuf::from("public"),
            store: StoreBackend::File,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            site_name: DEFAULT_SITE_NAME.to_string(),
        }
    }

    /// Read `FOLIO_*` environment variables on top of the defaults
    pub fn from_env() -> Result<Self, WikiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WikiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(host) = lookup("FOLIO_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("FOLIO_PORT") {
            config.port = parse_value("FOLIO_PORT", &port)?;
        }
        if let Some(dir) = lookup("FOLIO_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("FOLIO_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("FOLIO_ASSET_DIR") {
            config.asset_dir = PathBuf::from(dir);
        }
        if let Some(store) = lookup("FOLIO_STORE") {
            config.store = store.parse()?;
        }
        if let Some(ms) = lookup("FOLIO_STORE_TIMEOUT_MS") {
            let ms: u64 = parse_value("FOLIO_STORE_TIMEOUT_MS", &ms)?;
            if ms == 0 {
                return Err(WikiError::Config("FOLIO_STORE_TIMEOUT_MS must be positive".to_string()));
            }
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Some(name) = lookup("FOLIO_SITE_NAME") {
            config.site_name = name;
        }

        Ok(config)
    }

    /// Get the socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, WikiError> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}:{}", host, self.port)
            .parse()
            .map_err(|e| WikiError::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, WikiError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| WikiError::Config(format!("{}={:?}: {}", key, raw, e)))
}
