//! Application configuration loaded from TOML.
//!
//! # Responsibility
//! - Parse the optional `gatinos.toml` file into typed settings.
//! - Provide defaults so that an empty file is a valid configuration.
//!
//! # Invariants
//! - `forgotten_after_days >= missing_after_days > 0`.
//! - `default_active_period_days > 0`.

use crate::model::colony::DEFAULT_ACTIVE_PERIOD_DAYS;
use crate::model::permission::{parse_permission, Permission, PermissionError};
use chrono::Duration;
use log::{error, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
    Permission { group: String, source: PermissionError },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
            Self::Permission { group, source } => {
                write!(f, "invalid permission in group `{group}`: {source}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
            Self::Permission { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub lifecycle: LifecycleConfig,
    pub colonies: ColoniesConfig,
    pub vaccines: VaccinesConfig,
    /// Group name to permission codes, applied by group sync.
    pub groups: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub title: String,
    pub placeholder_photo_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Gatinos".to_string(),
            placeholder_photo_url: "/static/img/relleno.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gatinos.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Falls back to [`crate::default_log_level`] when unset.
    pub level: Option<String>,
    /// File logging stays off while unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Idle days after which a free cat becomes missing.
    pub missing_after_days: u32,
    /// Idle days after which a missing cat becomes forgotten.
    pub forgotten_after_days: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            missing_after_days: 90,
            forgotten_after_days: 365,
        }
    }
}

impl LifecycleConfig {
    pub fn missing_after(&self) -> Duration {
        Duration::days(i64::from(self.missing_after_days))
    }

    pub fn forgotten_after(&self) -> Duration {
        Duration::days(i64::from(self.forgotten_after_days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColoniesConfig {
    pub default_active_period_days: u32,
}

impl Default for ColoniesConfig {
    fn default() -> Self {
        Self {
            default_active_period_days: DEFAULT_ACTIVE_PERIOD_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaccinesConfig {
    /// YAML catalog; the built-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|raw| Self::from_toml_str(&raw));
        let config = match loaded {
            Ok(config) => config,
            Err(err) => {
                error!(
                    "event=config_load module=config status=error path={} error={err}",
                    path.display()
                );
                return Err(err);
            }
        };
        info!(
            "event=config_load module=config status=ok path={} groups={}",
            path.display(),
            config.groups.len()
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let lifecycle = &self.lifecycle;
        if lifecycle.missing_after_days == 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.missing_after_days must be positive".to_string(),
            ));
        }
        if lifecycle.forgotten_after_days < lifecycle.missing_after_days {
            return Err(ConfigError::Invalid(format!(
                "lifecycle.forgotten_after_days ({}) must not be smaller than missing_after_days ({})",
                lifecycle.forgotten_after_days, lifecycle.missing_after_days
            )));
        }
        if self.colonies.default_active_period_days == 0 {
            return Err(ConfigError::Invalid(
                "colonies.default_active_period_days must be positive".to_string(),
            ));
        }
        self.group_permissions()?;
        Ok(())
    }

    /// Configured groups with their codes parsed.
    pub fn group_permissions(&self) -> ConfigResult<BTreeMap<String, Vec<Permission>>> {
        let mut groups = BTreeMap::new();
        for (group, codes) in &self.groups {
            let mut permissions = Vec::with_capacity(codes.len());
            for code in codes {
                let permission =
                    parse_permission(code).map_err(|source| ConfigError::Permission {
                        group: group.clone(),
                        source,
                    })?;
                permissions.push(permission);
            }
            groups.insert(group.clone(), permissions);
        }
        Ok(groups)
    }
}
