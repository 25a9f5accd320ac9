//! Configuration management for the server.

use statesync_engine::ConflictPolicy;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// A remote store declared in `REMOTE_STORES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSpec {
    /// `memory:<id>`
    Memory { id: String },
    /// `postgres:<id>=<url>`
    Postgres { id: String, url: String },
}

impl RemoteSpec {
    pub fn id(&self) -> &str {
        match self {
            RemoteSpec::Memory { id } | RemoteSpec::Postgres { id, .. } => id,
        }
    }

    fn parse(entry: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRemote(entry.to_string());
        let (scheme, rest) = entry.split_once(':').ok_or_else(invalid)?;

        let spec = match scheme {
            "memory" => RemoteSpec::Memory {
                id: rest.to_string(),
            },
            "postgres" => {
                let (id, url) = rest.split_once('=').ok_or_else(invalid)?;
                if url.is_empty() {
                    return Err(invalid());
                }
                RemoteSpec::Postgres {
                    id: id.to_string(),
                    url: url.to_string(),
                }
            }
            _ => return Err(invalid()),
        };

        if spec.id().is_empty() {
            return Err(invalid());
        }
        Ok(spec)
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Where the local store is loaded from and saved to
    pub state_file: PathBuf,
    /// Key under which remote stores keep the state blob
    pub sync_key: String,
    /// Auto-sync period; `None` disables auto-sync
    pub sync_interval: Option<Duration>,
    /// Default conflict policy
    pub policy: ConflictPolicy,
    /// Remote stores in sync order
    pub remotes: Vec<RemoteSpec>,
    /// Pool size of each `postgres:` remote
    pub db_max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let state_file = lookup("STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("statesync-state.json"));

        let sync_key = lookup("SYNC_KEY").unwrap_or_else(|| "statesync".to_string());
        if sync_key.trim().is_empty() {
            return Err(ConfigError::EmptySyncKey);
        }

        let interval_secs: u64 = match lookup("SYNC_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidInterval(raw))?,
            None => 0,
        };
        let sync_interval = (interval_secs > 0).then(|| Duration::from_secs(interval_secs));

        let policy = match lookup("CONFLICT_POLICY") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPolicy(raw))?,
            None => ConflictPolicy::default(),
        };

        let remotes = parse_remotes(&lookup("REMOTE_STORES").unwrap_or_default())?;

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|&n: &u32| n > 0)
                .ok_or(ConfigError::InvalidPoolSize(raw))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Self {
            host,
            port,
            state_file,
            sync_key,
            sync_interval,
            policy,
            remotes,
            db_max_connections,
        })
    }
}

fn parse_remotes(raw: &str) -> Result<Vec<RemoteSpec>, ConfigError> {
    let mut seen = HashSet::new();
    let mut remotes = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let spec = RemoteSpec::parse(entry)?;
        if !seen.insert(spec.id().to_string()) {
            return Err(ConfigError::DuplicateRemote(spec.id().to_string()));
        }
        remotes.push(spec);
    }

    Ok(remotes)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("SYNC_KEY must not be empty")]
    EmptySyncKey,

    #[error("Invalid SYNC_INTERVAL_SECS value: {0}")]
    InvalidInterval(String),

    #[error("Invalid CONFLICT_POLICY value: {0} (expected local, remote, latest or manual)")]
    InvalidPolicy(String),

    #[error("Invalid REMOTE_STORES entry: {0}")]
    InvalidRemote(String),

    #[error("Remote store id used twice: {0}")]
    DuplicateRemote(String),

    #[error("Invalid DB_MAX_CONNECTIONS value: {0} (expected a positive integer)")]
    InvalidPoolSize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.sync_key, "statesync");
        assert_eq!(config.sync_interval, None);
        assert_eq!(config.policy, ConflictPolicy::Latest);
        assert!(config.remotes.is_empty());
        assert_eq!(config.db_max_connections, 5);
    }

    #[test]
    fn test_full_config() {
        let config = load(&[
            ("PORT", "8080"),
            ("SYNC_INTERVAL_SECS", "30"),
            ("CONFLICT_POLICY", "Remote"),
            ("DB_MAX_CONNECTIONS", "16"),
            (
                "REMOTE_STORES",
                "memory:kv, postgres:crm=postgres://u:p@db:5432/state?sslmode=disable",
            ),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.sync_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.policy, ConflictPolicy::Remote);
        assert_eq!(config.db_max_connections, 16);
        assert_eq!(
            config.remotes,
            vec![
                RemoteSpec::Memory { id: "kv".into() },
                RemoteSpec::Postgres {
                    id: "crm".into(),
                    url: "postgres://u:p@db:5432/state?sslmode=disable".into(),
                },
            ]
        );
    }

    #[test]
    fn test_zero_interval_disables_auto_sync() {
        let config = load(&[("SYNC_INTERVAL_SECS", "0")]).unwrap();
        assert!(config.sync_interval.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(load(&[("PORT", "http")]), Err(ConfigError::InvalidPort)));
        assert!(matches!(
            load(&[("SYNC_INTERVAL_SECS", "-5")]),
            Err(ConfigError::InvalidInterval(_))
        ));
        assert!(matches!(
            load(&[("CONFLICT_POLICY", "newest")]),
            Err(ConfigError::InvalidPolicy(_))
        ));
        assert!(matches!(load(&[("SYNC_KEY", " ")]), Err(ConfigError::EmptySyncKey)));
        for size in ["0", "-1", "many"] {
            assert!(matches!(
                load(&[("DB_MAX_CONNECTIONS", size)]),
                Err(ConfigError::InvalidPoolSize(_))
            ));
        }
    }

    #[test]
    fn test_invalid_remotes() {
        for entry in ["kv", "redis:kv", "memory:", "postgres:crm", "postgres:=url", "postgres:crm="] {
            assert!(
                matches!(load(&[("REMOTE_STORES", entry)]), Err(ConfigError::InvalidRemote(_))),
                "{entry} should be rejected"
            );
        }
    }

    #[test]
    fn test_duplicate_remote_ids() {
        assert!(matches!(
            load(&[("REMOTE_STORES", "memory:kv,memory:kv")]),
            Err(ConfigError::DuplicateRemote(id)) if id == "kv"
        ));
    }
}
