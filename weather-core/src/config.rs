use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::units::UnitPreferences;

const DEFAULT_GEOCODING_URL: &str = "https://api.opencagedata.com/geocode/v1/json";
const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json";

/// Geocoding service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_url")]
    pub base_url: String,
}

/// Forecast service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_forecast_url")]
    pub base_url: String,
}

/// Where the device position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// Location access not granted.
    #[default]
    Off,
    Fixed,
    Ip,
}

impl std::fmt::Display for PositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PositionSource::Off => "off",
            PositionSource::Fixed => "fixed (from config)",
            PositionSource::Ip => "ip lookup",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    #[serde(default)]
    pub source: PositionSource,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_ip_lookup_url")]
    pub lookup_url: String,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// request_timeout_secs = 10
///
/// [geocoding]
/// api_key = "..."
///
/// [position]
/// source = "fixed"
/// latitude = 21.0285
/// longitude = 105.8048
///
/// [units]
/// temperature = "fahrenheit"
/// time_format = "am_pm"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file; `None` means the platform data directory.
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_position_timeout")]
    pub position_timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub units: UnitPreferences,
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_ip_lookup_url() -> String {
    DEFAULT_IP_LOOKUP_URL.to_string()
}

const fn default_request_timeout() -> u64 {
    10
}

const fn default_position_timeout() -> u64 {
    15
}

const fn default_refresh_timeout() -> u64 {
    30
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: default_geocoding_url() }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { base_url: default_forecast_url() }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            source: PositionSource::default(),
            latitude: None,
            longitude: None,
            lookup_url: default_ip_lookup_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            request_timeout_secs: default_request_timeout(),
            position_timeout_secs: default_position_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
            geocoding: GeocodingConfig::default(),
            forecast: ForecastConfig::default(),
            position: PositionConfig::default(),
            units: UnitPreferences::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-journey", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Configured database path, or `weather.db` in the platform data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("weather.db")),
        }
    }

    pub fn set_geocoding_api_key(&mut self, api_key: String) {
        self.geocoding.api_key = Some(api_key);
    }

    pub fn geocoding_api_key(&self) -> Option<&str> {
        self.geocoding.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn position_timeout(&self) -> Duration {
        Duration::from_secs(self.position_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{PressureUnit, TemperatureUnit};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.position.source, PositionSource::Off);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_geocoding_api_key("KEY".into());
        cfg.position.source = PositionSource::Fixed;
        cfg.position.latitude = Some(21.0285);
        cfg.position.longitude = Some(105.8048);
        cfg.units.temperature = Some(TemperatureUnit::Fahrenheit);
        cfg.units.pressure = Some(PressureUnit::InchOfMercury);

        cfg.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");

        assert_eq!(loaded, cfg);
        assert_eq!(loaded.geocoding_api_key(), Some("KEY"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [geocoding]
            api_key = "abc"

            [units]
            time_format = "am_pm"
            "#,
        )
        .expect("parse");

        assert_eq!(cfg.geocoding.base_url, DEFAULT_GEOCODING_URL);
        assert_eq!(cfg.forecast.base_url, DEFAULT_FORECAST_URL);
        assert_eq!(cfg.refresh_timeout_secs, 30);
        assert_eq!(cfg.units.time_format, Some(crate::units::TimeFormat::AmPm));
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_geocoding_api_key(String::new());
        assert_eq!(cfg.geocoding_api_key(), None);
    }

    #[test]
    fn explicit_database_path_wins() {
        let cfg = Config { database_path: Some(PathBuf::from("/tmp/w.db")), ..Config::default() };
        assert_eq!(cfg.database_path().expect("path"), PathBuf::from("/tmp/w.db"));
    }
}
