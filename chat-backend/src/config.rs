//! Service configuration.
//!
//! Read once from `chat.toml` or `Chat.toml` in the working directory, or from the file
//! named by `CHAT_CONFIG`. Every key is optional. The database connection can also be set
//! with `CHAT_DATABASE_URL`, `CHAT_DATABASE_USER` and `CHAT_DATABASE`, and
//! `CHAT_LOG_QUERIES` turns on query logging.
//!
//! ```toml
//! [general]
//! port = 8000
//! storage = "postgres"
//!
//! [database]
//! url = "postgres://postgres@localhost/chat"
//!
//! [pagination]
//! default_size = 20
//! ```
use std::env::var;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

static CONFIG: OnceCell<Config> = OnceCell::new();

const FILE_NAMES: [&str; 2] = ["chat.toml", "Chat.toml"];

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no configuration file")]
    NoConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub http: Http,
    pub database: Database,
    pub pagination: Pagination,

    #[serde(skip)]
    source: Source,
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
enum Source {
    #[default]
    Defaults,
    File(PathBuf),
    Unreadable(String),
}

/// Where chat messages are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    #[default]
    Postgres,
    /// Lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct General {
    pub host: String,
    pub port: u16,
    pub log_queries: bool,
    pub storage: Storage,
    /// Color the logs. Not configurable: on when stderr is a terminal.
    #[serde(skip)]
    pub tty: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            log_queries: false,
            storage: Storage::Postgres,
            tty: std::io::stderr().is_terminal(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Http {
    pub header_max_size: usize,
    pub body_max_size: usize,
    pub cors_allowed_origin: String,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            header_max_size: 16 * 1024,
            body_max_size: 1024 * 1024,
            cors_allowed_origin: "*".into(),
        }
    }
}

/// `[database]`. Timeouts are in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: Option<String>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub pool_size: usize,
    pub idle_timeout: u64,
    pub checkout_timeout: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: None,
            name: None,
            user: None,
            pool_size: 10,
            idle_timeout: 3600,
            checkout_timeout: 5,
        }
    }
}

impl Database {
    /// `url` if set. Otherwise a local connection for `user` (default `$USER`) to
    /// `name` (default: the user name).
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let user = self
            .user
            .clone()
            .or_else(|| var("USER").ok())
            .unwrap_or_else(|| "postgres".into());
        let name = self.name.as_ref().unwrap_or(&user);

        format!("postgresql://{}@localhost/{}", user, name)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.checkout_timeout)
    }

    fn apply_env(&mut self) {
        for (key, field) in [
            ("CHAT_DATABASE_URL", &mut self.url),
            ("CHAT_DATABASE_USER", &mut self.user),
            ("CHAT_DATABASE", &mut self.name),
        ] {
            if let Ok(value) = var(key) {
                *field = Some(value);
            }
        }
    }
}

/// Used when the client leaves out or mangles the pagination parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub default_size: i64,
    pub max_size: i64,
    /// Send `X-Total-Count` and `X-Total-Pages` with list responses.
    pub total_count_header: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 2000,
            total_count_header: false,
        }
    }
}

impl Config {
    /// Read a configuration file. Environment overrides are not applied.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref().to_path_buf();

        let text = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let mut config: Config = toml::from_str(&text).map_err(|source| Error::Toml {
            path: path.clone(),
            source,
        })?;

        config.pagination.default_size = config.pagination.default_size.max(1);
        config.pagination.max_size = config.pagination.max_size.max(1);
        config.source = Source::File(path);

        Ok(config)
    }

    /// Load `$CHAT_CONFIG`, or the first configuration file found in the working directory.
    pub fn discover() -> Result<Config, Error> {
        if let Ok(path) = var("CHAT_CONFIG") {
            return Self::load(path);
        }

        match FILE_NAMES.iter().map(Path::new).find(|path| path.exists()) {
            Some(path) => Self::load(path),
            None => Err(Error::NoConfig),
        }
    }

    /// Defaults in place of a file that's missing or can't be read. The reason is kept
    /// for [`Config::log_info`], which runs once logging is up.
    fn or_defaults(loaded: Result<Config, Error>) -> Config {
        match loaded {
            Ok(config) => config,
            Err(Error::NoConfig) => Config::default(),
            Err(err) => Config {
                source: Source::Unreadable(err.to_string()),
                ..Config::default()
            },
        }
    }

    fn apply_env(mut self) -> Self {
        self.database.apply_env();
        self.general.log_queries |= var("CHAT_LOG_QUERIES").is_ok();
        self
    }

    /// The file this configuration was read from.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn log_info(&self) {
        match &self.source {
            Source::File(path) => info!("Configuration loaded from \"{}\"", path.display()),
            Source::Defaults => info!("No configuration file, using defaults"),
            Source::Unreadable(reason) => {
                warn!("Configuration not loaded ({}), using defaults", reason)
            }
        }

        info!("Storage: {:?}", self.general.storage);
    }
}

/// The configuration, loaded on first use.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::or_defaults(Config::discover()).apply_env())
}
