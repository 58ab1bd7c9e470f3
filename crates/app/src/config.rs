//! Runtime configuration.
//!
//! Values resolve in increasing priority: built-in defaults, `flashdeck.toml`,
//! environment variables (after loading `.env`), then command-line flags.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use services::auth_service::DEFAULT_TOKEN_TTL_HOURS;

pub const CONFIG_FILE: &str = "flashdeck.toml";
pub const DEFAULT_DB_URL: &str = "sqlite:flashdeck.sqlite3";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

pub const ENV_DB_URL: &str = "FLASHDECK_DB_URL";
pub const ENV_BIND: &str = "FLASHDECK_BIND";
pub const ENV_TOKEN_TTL_HOURS: &str = "FLASHDECK_TOKEN_TTL_HOURS";
pub const ENV_SERVER: &str = "FLASHDECK_SERVER";
pub const ENV_TOKEN: &str = "FLASHDECK_TOKEN";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid database url: {0}")]
    InvalidDbUrl(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<DatabaseSection>,
    server: Option<ServerSection>,
    client: Option<ClientSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseSection {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    bind: Option<String>,
    token_ttl_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientSection {
    server: Option<String>,
    token: Option<String>,
}

/// Fully resolved settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub bind: String,
    pub token_ttl_hours: i64,
    /// Base URL of a remote flashdeck server for `study`.
    pub server: Option<String>,
    /// Bearer token used against `server`.
    pub token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            bind: DEFAULT_BIND.to_owned(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            server: None,
            token: None,
        }
    }
}

impl AppConfig {
    /// Defaults, then `flashdeck.toml` in the working directory, then the
    /// process environment (including `.env`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unreadable or malformed config files and
    /// unparsable environment values.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.merge_file(Path::new(CONFIG_FILE))?;
        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a TOML file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        self.merge_toml(&contents)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "loaded config file");
        Ok(())
    }

    fn merge_toml(&mut self, contents: &str) -> Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(contents)?;
        if let Some(url) = file.database.and_then(|d| d.url) {
            self.db_url = url;
        }
        if let Some(server) = file.server {
            if let Some(bind) = server.bind {
                self.bind = bind;
            }
            if let Some(ttl) = server.token_ttl_hours {
                self.token_ttl_hours = ttl;
            }
        }
        if let Some(client) = file.client {
            if client.server.is_some() {
                self.server = client.server;
            }
            if client.token.is_some() {
                self.token = client.token;
            }
        }
        Ok(())
    }

    /// Overlay values from environment-style lookups.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a non-numeric token TTL.
    pub fn merge_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_DB_URL) {
            self.db_url = url;
        }
        if let Some(bind) = get(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(raw) = get(ENV_TOKEN_TTL_HOURS) {
            self.token_ttl_hours = parse_ttl(ENV_TOKEN_TTL_HOURS, &raw)?;
        }
        if let Some(server) = get(ENV_SERVER) {
            self.server = Some(server);
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(token);
        }
        Ok(())
    }
}

/// # Errors
///
/// Returns `ConfigError::InvalidValue` unless `raw` is a positive integer.
pub fn parse_ttl(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|hours| *hours > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
        })
}

/// Turn `path`, `sqlite:path` or `sqlite://path` into an absolute `sqlite://` URL.
///
/// In-memory URLs pass through unchanged.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_owned();
    }
    if trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist so the pool can open it.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDbUrl` for an empty path or `ConfigError::Io`.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl(db_url.to_owned()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl(db_url.to_owned()));
    }

    let path = Path::new(path);
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn file_values_override_defaults() {
        let mut config = AppConfig::default();
        config
            .merge_toml(
                r#"
                [database]
                url = "sqlite:/tmp/decks.db"

                [server]
                bind = "0.0.0.0:8080"
                token_ttl_hours = 12
                "#,
            )
            .unwrap();

        assert_eq!(config.db_url, "sqlite:/tmp/decks.db");
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.token_ttl_hours, 12);
        assert_eq!(config.server, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut config = AppConfig::default();
        assert!(config.merge_toml("[server]\nport = 1\n").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = AppConfig::default();
        config
            .merge_toml("[client]\nserver = \"http://file\"\n")
            .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SERVER, "http://env"),
            (ENV_TOKEN, "abc"),
            (ENV_BIND, "   "),
        ]);
        config
            .merge_env(|k| env.get(k).map(|v| (*v).to_owned()))
            .unwrap();

        assert_eq!(config.server.as_deref(), Some("http://env"));
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.bind, DEFAULT_BIND);
    }

    #[test]
    fn bad_ttl_is_reported() {
        let mut config = AppConfig::default();
        let err = config
            .merge_env(|k| (k == ENV_TOKEN_TTL_HOURS).then(|| "soon".to_owned()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(parse_ttl("x", "0").is_err());
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("sqlite:///a/b.db"), "sqlite:///a/b.db");
        assert_eq!(normalize_sqlite_url("/a/b.db"), "sqlite:///a/b.db");
        assert_eq!(normalize_sqlite_url("sqlite:/a/b.db"), "sqlite:///a/b.db");
        assert!(normalize_sqlite_url("rel.db").starts_with("sqlite://"));
    }
}
