use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ENV_PREFIX: &str = "DEVICE_COLLECTOR";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub admin: AdminConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub users_key: String,      // blob name holding every submission
    pub max_age_days: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    pub session_key: String,
    pub session_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: Config::base_dir().join("data"),
            users_key: "invisible-users-data".to_string(),
            max_age_days: 30,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            session_key: "admin-session".to_string(),
            session_hours: 24,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "Device Data Collection.csv".to_string(),
        }
    }
}

impl Config {
    /// Reads the config file (if any), then `DEVICE_COLLECTOR__<SECTION>__<KEY>` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        debug!("Loading configuration from {:?}", config_path);

        let settings = config::Config::builder()
            .add_source(config::File::from(config_path.as_path()).format(config::FileFormat::Toml).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.users_max_age()?;
        config.admin.session_max_age()?;

        Ok(config)
    }

    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".device-collector")
    }

    pub fn config_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        fs::write(path, config_str)
            .context("Failed to write config file")?;

        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    pub fn users_max_age(&self) -> Result<chrono::Duration> {
        i64::try_from(self.storage.max_age_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .context("storage.max_age_days is out of range")
    }
}

impl AdminConfig {
    pub fn session_max_age(&self) -> Result<chrono::Duration> {
        i64::try_from(self.session_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .context("admin.session_hours is out of range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();

        assert_eq!(config.storage.users_key, "invisible-users-data");
        assert_eq!(config.storage.max_age_days, 30);
        assert_eq!(config.admin.session_hours, 24);
        assert_eq!(config.export.file_name, "Device Data Collection.csv");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.storage.data_dir = dir.path().join("data");
        config.admin.email = "admin@example.com".to_string();
        config.storage.max_age_days = 7;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.admin.email, "admin@example.com");
        assert_eq!(loaded.storage.max_age_days, 7);
        assert_eq!(loaded.storage.data_dir, dir.path().join("data"));
        assert_eq!(loaded.users_max_age().unwrap(), chrono::Duration::days(7));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[admin]\npassword = \"hunter2\"\n").unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.admin.password, "hunter2");
        assert_eq!(loaded.admin.session_key, "admin-session");
        assert_eq!(loaded.storage.users_key, "invisible-users-data");
    }

    #[test]
    fn test_huge_durations_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[admin]\nsession_hours = 9223372036854775807\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("session_hours"));

        fs::write(&path, "[storage]\nmax_age_days = 9223372036854775807\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("max_age_days"));
    }

    #[test]
    fn test_session_max_age_in_hours() {
        let admin = AdminConfig { session_hours: 2, ..AdminConfig::default() };
        assert_eq!(admin.session_max_age().unwrap(), chrono::Duration::hours(2));
    }
}
