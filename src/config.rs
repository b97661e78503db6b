use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_LOG_FILTER: &str = "info,pub_till_lib=debug";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PosConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub backup_dir: PathBuf,
    pub log_filter: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("pub-till-data");
        PosConfig {
            backup_dir: data_dir.join("backups"),
            data_dir,
            database_file: "pub_till.db".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PosConfig {
    /// Defaults overridden by `PUB_TILL_DATA_DIR`, `PUB_TILL_BACKUP_DIR` and `PUB_TILL_LOG`.
    pub fn from_env() -> Self {
        let mut config = PosConfig::default();

        if let Ok(dir) = env::var("PUB_TILL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
            config.backup_dir = config.data_dir.join("backups");
        }
        if let Ok(dir) = env::var("PUB_TILL_BACKUP_DIR") {
            config.backup_dir = PathBuf::from(dir);
        }
        if let Ok(filter) = env::var("PUB_TILL_LOG") {
            config.log_filter = filter;
        }

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PosConfig = serde_json::from_str(r#"{ "data_dir": "/var/till" }"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/till"));
        assert_eq!(config.database_file, "pub_till.db");
        assert_eq!(config.database_path(), PathBuf::from("/var/till/pub_till.db"));
    }
}
