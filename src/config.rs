use crate::errors::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const ENV_DB_URL: &str = "FIELD_CAPTURE_DB_URL";
pub const ENV_DEVICE_ID: &str = "FIELD_CAPTURE_DEVICE_ID";
pub const ENV_OFFLINE_MODE: &str = "FIELD_CAPTURE_OFFLINE_MODE";
pub const ENV_MAX_CONNECTIONS: &str = "FIELD_CAPTURE_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Settings needed to bring the core up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub db_url: String,
    pub device_id: String,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl CoreConfig {
    pub fn new(db_url: &str, device_id: &str, offline_mode: bool) -> Self {
        Self {
            db_url: db_url.to_string(),
            device_id: device_id.to_string(),
            offline_mode,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read settings from the process environment, after loading a `.env` file if one exists
    pub fn from_env() -> ServiceResult<Self> {
        let _ = dotenv::dotenv();

        let db_url = env::var(ENV_DB_URL)
            .map_err(|_| ServiceError::Configuration(format!("{} is not set", ENV_DB_URL)))?;
        let device_id = env::var(ENV_DEVICE_ID)
            .map_err(|_| ServiceError::Configuration(format!("{} is not set", ENV_DEVICE_ID)))?;

        let offline_mode = match env::var(ENV_OFFLINE_MODE) {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                ServiceError::Configuration(format!("{} must be true or false, got '{}'", ENV_OFFLINE_MODE, raw))
            })?,
            Err(_) => false,
        };

        let max_connections = match env::var(ENV_MAX_CONNECTIONS) {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| {
                ServiceError::Configuration(format!("{} must be a positive integer, got '{}'", ENV_MAX_CONNECTIONS, raw))
            })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let config = Self {
            db_url,
            device_id,
            offline_mode,
            max_connections,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file bundled with the host app
    pub fn from_file(path: &Path) -> ServiceResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ServiceError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if !self.db_url.starts_with("sqlite:") {
            return Err(ServiceError::Configuration(
                "db_url must be a SQLite URL starting with 'sqlite:', not a file path".to_string(),
            ));
        }
        if self.device_id.trim().is_empty() {
            return Err(ServiceError::Configuration("device_id must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ServiceError::Configuration("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate() {
        assert!(CoreConfig::new("sqlite::memory:", "device-1", false).validate().is_ok());
        assert!(CoreConfig::new("sqlite:///tmp/field.sqlite?mode=rwc", "device-1", true).validate().is_ok());
        assert!(CoreConfig::new("/tmp/field.sqlite", "device-1", false).validate().is_err());
        assert!(CoreConfig::new("sqlite::memory:", "  ", false).validate().is_err());

        let mut config = CoreConfig::new("sqlite::memory:", "device-1", false);
        config.max_connections = 0;
        assert!(matches!(config.validate(), Err(ServiceError::Configuration(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"db_url":"sqlite::memory:","device_id":"ipad-7"}"#).unwrap();
        assert!(!config.offline_mode);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"db_url":"sqlite://field.sqlite?mode=rwc","device_id":"tablet-3","offline_mode":true}"#)
            .unwrap();
        let loaded = CoreConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.device_id, "tablet-3");
        assert!(loaded.offline_mode);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(br#"{"db_url":"/data/field.sqlite","device_id":"tablet-3"}"#).unwrap();
        assert!(matches!(CoreConfig::from_file(bad.path()), Err(ServiceError::Configuration(_))));

        assert!(CoreConfig::from_file(Path::new("/definitely/not/here.json")).is_err());
    }

    // Every case lives in this one test because the environment is process-wide
    #[test]
    fn test_from_env() {
        env::set_var(ENV_DB_URL, "sqlite://field.sqlite?mode=rwc");
        env::set_var(ENV_DEVICE_ID, "tablet-9");
        env::set_var(ENV_OFFLINE_MODE, "yes");
        env::set_var(ENV_MAX_CONNECTIONS, " 3 ");

        let config = CoreConfig::from_env().unwrap();
        assert_eq!(config.db_url, "sqlite://field.sqlite?mode=rwc");
        assert_eq!(config.device_id, "tablet-9");
        assert!(config.offline_mode);
        assert_eq!(config.max_connections, 3);

        env::set_var(ENV_OFFLINE_MODE, "sometimes");
        match CoreConfig::from_env() {
            Err(ServiceError::Configuration(msg)) => assert!(msg.contains(ENV_OFFLINE_MODE)),
            other => panic!("expected a configuration error, got {:?}", other),
        }
        env::set_var(ENV_OFFLINE_MODE, "off");

        env::set_var(ENV_MAX_CONNECTIONS, "many");
        match CoreConfig::from_env() {
            Err(ServiceError::Configuration(msg)) => assert!(msg.contains(ENV_MAX_CONNECTIONS)),
            other => panic!("expected a configuration error, got {:?}", other),
        }
        env::set_var(ENV_MAX_CONNECTIONS, "0");
        assert!(matches!(CoreConfig::from_env(), Err(ServiceError::Configuration(_))));
        env::remove_var(ENV_MAX_CONNECTIONS);

        let config = CoreConfig::from_env().unwrap();
        assert!(!config.offline_mode);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);

        env::set_var(ENV_DB_URL, "/data/field.sqlite");
        assert!(matches!(CoreConfig::from_env(), Err(ServiceError::Configuration(_))));

        for key in [ENV_DB_URL, ENV_DEVICE_ID, ENV_OFFLINE_MODE, ENV_MAX_CONNECTIONS] {
            env::remove_var(key);
        }
    }
}
