//! Configuration file handling.
//!
//! Settings live in an INI file at `<config_dir>/geotimesheet/config.ini`:
//!
//! ```ini
//! [monday]
//! token = ...
//! timesheet_board = 123456789
//! sites_board = 987654321
//!
//! [tracking]
//! distance_threshold_m = 150
//! fix_staleness_secs = 30
//! site_refresh_secs = 300
//!
//! [receiver]
//! port = 48701
//! ```
//!
//! Missing file or missing keys fall back to defaults; only malformed
//! values are errors.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use crate::monday::{ColumnIds, MondayConfig};
use crate::position::{FixReceiverConfig, DEFAULT_FIX_PORT};
use crate::service::{ServiceConfig, DEFAULT_SITE_REFRESH};
use crate::tracker::{TrackerConfig, DEFAULT_DISTANCE_THRESHOLD_M};

/// Errors from configuration handling.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not determine the platform config directory.
    #[error("could not determine the user configuration directory")]
    NoConfigDir,

    /// File I/O failure.
    #[error("config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The INI file could not be parsed.
    #[error("config file parse error: {0}")]
    Parse(String),

    /// A key holds a value of the wrong type.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Path of the configuration file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join("geotimesheet").join("config.ini"))
}

/// `[monday]` section.
#[derive(Debug, Clone)]
pub struct MondaySection {
    pub token: String,
    pub timesheet_board: String,
    pub sites_board: String,
    pub time_tracking_column: String,
    pub site_link_column: String,
    pub end_column: String,
    pub location_column: String,
}

impl Default for MondaySection {
    fn default() -> Self {
        let columns = ColumnIds::default();
        Self {
            token: String::new(),
            timesheet_board: String::new(),
            sites_board: String::new(),
            time_tracking_column: columns.time_tracking,
            site_link_column: columns.site_link,
            end_column: columns.end,
            location_column: columns.location,
        }
    }
}

/// `[tracking]` section.
#[derive(Debug, Clone)]
pub struct TrackingSection {
    pub distance_threshold_m: f64,
    pub fix_staleness_secs: u64,
    pub site_refresh_secs: u64,
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self {
            distance_threshold_m: DEFAULT_DISTANCE_THRESHOLD_M,
            fix_staleness_secs: 30,
            site_refresh_secs: DEFAULT_SITE_REFRESH.as_secs(),
        }
    }
}

/// `[receiver]` section.
#[derive(Debug, Clone)]
pub struct ReceiverSection {
    pub port: u16,
}

impl Default for ReceiverSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_FIX_PORT,
        }
    }
}

/// The loaded configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub monday: MondaySection,
    pub tracking: TrackingSection,
    pub receiver: ReceiverSection,
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_file_path()?;
        self.save_to(&path)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key(), key.get(self));
        }
        ini.write_to_file(path)?;
        Ok(())
    }

    /// Tracker configuration from the `[tracking]` section.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::default().with_distance_threshold(self.tracking.distance_threshold_m)
    }

    /// Service configuration from the `[tracking]` section.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::default()
            .with_site_refresh(Duration::from_secs(self.tracking.site_refresh_secs))
            .with_tracker(self.tracker_config())
    }

    /// Fix receiver configuration from `[receiver]` and `[tracking]`.
    pub fn receiver_config(&self) -> FixReceiverConfig {
        FixReceiverConfig {
            port: self.receiver.port,
            staleness: Duration::from_secs(self.tracking.fix_staleness_secs),
            ..FixReceiverConfig::default()
        }
    }

    /// Monday workspace configuration from the `[monday]` section.
    pub fn monday_config(&self) -> MondayConfig {
        MondayConfig {
            token: self.monday.token.clone(),
            timesheet_board: self.monday.timesheet_board.clone(),
            sites_board: self.monday.sites_board.clone(),
            columns: ColumnIds {
                time_tracking: self.monday.time_tracking_column.clone(),
                site_link: self.monday.site_link_column.clone(),
                end: self.monday.end_column.clone(),
                location: self.monday.location_column.clone(),
            },
        }
    }
}

/// A settable configuration key in `section.key` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    MondayToken,
    MondayTimesheetBoard,
    MondaySitesBoard,
    MondayTimeTrackingColumn,
    MondaySiteLinkColumn,
    MondayEndColumn,
    MondayLocationColumn,
    TrackingDistanceThreshold,
    TrackingFixStaleness,
    TrackingSiteRefresh,
    ReceiverPort,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::MondayToken,
            ConfigKey::MondayTimesheetBoard,
            ConfigKey::MondaySitesBoard,
            ConfigKey::MondayTimeTrackingColumn,
            ConfigKey::MondaySiteLinkColumn,
            ConfigKey::MondayEndColumn,
            ConfigKey::MondayLocationColumn,
            ConfigKey::TrackingDistanceThreshold,
            ConfigKey::TrackingFixStaleness,
            ConfigKey::TrackingSiteRefresh,
            ConfigKey::ReceiverPort,
        ]
    }

    /// INI section this key lives in.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::MondayToken
            | ConfigKey::MondayTimesheetBoard
            | ConfigKey::MondaySitesBoard
            | ConfigKey::MondayTimeTrackingColumn
            | ConfigKey::MondaySiteLinkColumn
            | ConfigKey::MondayEndColumn
            | ConfigKey::MondayLocationColumn => "monday",
            ConfigKey::TrackingDistanceThreshold
            | ConfigKey::TrackingFixStaleness
            | ConfigKey::TrackingSiteRefresh => "tracking",
            ConfigKey::ReceiverPort => "receiver",
        }
    }

    /// Key name within the section.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigKey::MondayToken => "token",
            ConfigKey::MondayTimesheetBoard => "timesheet_board",
            ConfigKey::MondaySitesBoard => "sites_board",
            ConfigKey::MondayTimeTrackingColumn => "time_tracking_column",
            ConfigKey::MondaySiteLinkColumn => "site_link_column",
            ConfigKey::MondayEndColumn => "end_column",
            ConfigKey::MondayLocationColumn => "location_column",
            ConfigKey::TrackingDistanceThreshold => "distance_threshold_m",
            ConfigKey::TrackingFixStaleness => "fix_staleness_secs",
            ConfigKey::TrackingSiteRefresh => "site_refresh_secs",
            ConfigKey::ReceiverPort => "port",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key())
    }

    /// Read this key's value as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::MondayToken => config.monday.token.clone(),
            ConfigKey::MondayTimesheetBoard => config.monday.timesheet_board.clone(),
            ConfigKey::MondaySitesBoard => config.monday.sites_board.clone(),
            ConfigKey::MondayTimeTrackingColumn => config.monday.time_tracking_column.clone(),
            ConfigKey::MondaySiteLinkColumn => config.monday.site_link_column.clone(),
            ConfigKey::MondayEndColumn => config.monday.end_column.clone(),
            ConfigKey::MondayLocationColumn => config.monday.location_column.clone(),
            ConfigKey::TrackingDistanceThreshold => {
                config.tracking.distance_threshold_m.to_string()
            }
            ConfigKey::TrackingFixStaleness => config.tracking.fix_staleness_secs.to_string(),
            ConfigKey::TrackingSiteRefresh => config.tracking.site_refresh_secs.to_string(),
            ConfigKey::ReceiverPort => config.receiver.port.to_string(),
        }
    }

    /// Set this key from a string value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        fn parse<T: FromStr>(key: &ConfigKey, value: &str) -> Result<T, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.name(),
                value: value.to_string(),
            })
        }

        match self {
            ConfigKey::MondayToken => config.monday.token = value.to_string(),
            ConfigKey::MondayTimesheetBoard => config.monday.timesheet_board = value.to_string(),
            ConfigKey::MondaySitesBoard => config.monday.sites_board = value.to_string(),
            ConfigKey::MondayTimeTrackingColumn => {
                config.monday.time_tracking_column = value.to_string();
            }
            ConfigKey::MondaySiteLinkColumn => {
                config.monday.site_link_column = value.to_string();
            }
            ConfigKey::MondayEndColumn => config.monday.end_column = value.to_string(),
            ConfigKey::MondayLocationColumn => {
                config.monday.location_column = value.to_string();
            }
            ConfigKey::TrackingDistanceThreshold => {
                config.tracking.distance_threshold_m = parse(self, value)?;
            }
            ConfigKey::TrackingFixStaleness => {
                config.tracking.fix_staleness_secs = parse(self, value)?;
            }
            ConfigKey::TrackingSiteRefresh => {
                config.tracking.site_refresh_secs = parse(self, value)?;
            }
            ConfigKey::ReceiverPort => config.receiver.port = parse(self, value)?,
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .find(|key| key.name() == s)
            .copied()
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.tracking.distance_threshold_m, 150.0);
        assert_eq!(config.tracking.fix_staleness_secs, 30);
        assert_eq!(config.tracking.site_refresh_secs, 300);
        assert_eq!(config.receiver.port, DEFAULT_FIX_PORT);
        assert_eq!(config.monday.time_tracking_column, "tt");
        assert_eq!(config.monday.site_link_column, "linked_site");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.monday.token = "secret".to_string();
        config.monday.timesheet_board = "123".to_string();
        config.tracking.distance_threshold_m = 200.0;
        config.receiver.port = 50000;
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.monday.token, "secret");
        assert_eq!(loaded.monday.timesheet_board, "123");
        assert_eq!(loaded.tracking.distance_threshold_m, 200.0);
        assert_eq!(loaded.receiver.port, 50000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[monday]\ntoken = abc\n").unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.monday.token, "abc");
        assert_eq!(loaded.tracking.distance_threshold_m, 150.0);
        assert_eq!(loaded.receiver.port, DEFAULT_FIX_PORT);
    }

    #[test]
    fn test_invalid_numeric_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[receiver]\nport = not-a-port\n").unwrap();

        let result = ConfigFile::load_from(&path);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_config_key_from_str() {
        assert_eq!(
            "tracking.distance_threshold_m".parse::<ConfigKey>(),
            Ok(ConfigKey::TrackingDistanceThreshold)
        );
        assert!("unknown.key".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_component_configs_reflect_sections() {
        let mut config = ConfigFile::default();
        config.tracking.distance_threshold_m = 80.0;
        config.tracking.site_refresh_secs = 60;
        config.receiver.port = 50001;

        assert_eq!(config.tracker_config().distance_threshold_m, 80.0);
        assert_eq!(
            config.service_config().site_refresh,
            Duration::from_secs(60)
        );
        assert_eq!(config.receiver_config().port, 50001);
    }
}
