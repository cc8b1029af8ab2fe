//! Configuration management for cfbridge.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::convention::{DEFAULT_CALENDAR, DEFAULT_FILL_VALUE, STATION_ID_WIDTH};
use crate::discovery::GridStartCorner;
use crate::error::{BridgeError, Result};

/// Command-line arguments for the cfbridge inspection tool
#[derive(Parser, Debug)]
#[command(name = "cfbridge")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the NetCDF file to inspect
    pub netcdf_file: PathBuf,

    /// Path to JSON configuration file
    #[arg(short, long, env = "CFBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Orientation grids are presented in (north_west, south_west, unknown)
    #[arg(long, env = "CFBRIDGE_GRID_START_CORNER")]
    pub grid_start_corner: Option<GridStartCorner>,

    /// Absolute tolerance in days when matching times
    #[arg(long, env = "CFBRIDGE_TIME_TOLERANCE")]
    pub time_tolerance: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CFBRIDGE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Settings used when exchange items are read from a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Corner the first row of a grid should start in
    #[serde(default)]
    pub grid_start_corner: GridStartCorner,

    /// Tolerance in days for matching a source time to a stored time
    #[serde(default = "default_time_tolerance")]
    pub time_tolerance: f64,
}

/// Settings used when exchange items are written to a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Fill value attached to every numeric variable the bridge creates
    #[serde(default = "default_fill_value")]
    pub fill_value: f64,

    /// Calendar attribute of created time variables
    #[serde(default = "default_calendar")]
    pub calendar: String,

    /// Width of one entry of the station id variable
    #[serde(default = "default_station_id_width")]
    pub station_id_width: usize,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub writer: WriterConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, PathBuf)> {
        let args = Args::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.netcdf_file))
    }

    /// Build the configuration for already parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(corner) = args.grid_start_corner {
            config.reader.grid_start_corner = corner;
        }
        if let Some(tolerance) = args.time_tolerance {
            config.reader.time_tolerance = tolerance;
        }
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.reader = other.reader;
        self.writer = other.writer;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(BridgeError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if !self.reader.time_tolerance.is_finite() || self.reader.time_tolerance < 0.0 {
            return Err(BridgeError::Config {
                message: format!(
                    "Invalid time tolerance: {}. Must be a finite non-negative number of days",
                    self.reader.time_tolerance
                ),
            });
        }

        if self.writer.calendar.trim().is_empty() {
            return Err(BridgeError::Config {
                message: "Calendar cannot be empty".to_string(),
            });
        }

        if self.writer.station_id_width == 0 {
            return Err(BridgeError::Config {
                message: "Station id width cannot be 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            writer: WriterConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            grid_start_corner: GridStartCorner::default(),
            time_tolerance: default_time_tolerance(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            fill_value: default_fill_value(),
            calendar: default_calendar(),
            station_id_width: default_station_id_width(),
        }
    }
}

// Default value functions for serde
fn default_time_tolerance() -> f64 {
    1e-5
}

fn default_fill_value() -> f64 {
    DEFAULT_FILL_VALUE
}

fn default_calendar() -> String {
    DEFAULT_CALENDAR.to_string()
}

fn default_station_id_width() -> usize {
    STATION_ID_WIDTH
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(config: Option<PathBuf>) -> Args {
        Args {
            netcdf_file: PathBuf::from("data.nc"),
            config,
            grid_start_corner: None,
            time_tolerance: None,
            log_level: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reader.grid_start_corner, GridStartCorner::Unknown);
        assert_eq!(config.reader.time_tolerance, 1e-5);
        assert_eq!(config.writer.fill_value, 9.96921e36);
        assert_eq!(config.writer.calendar, "gregorian");
        assert_eq!(config.writer.station_id_width, 30);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"reader": {"grid_start_corner": "north_west"}}"#).unwrap();
        assert_eq!(config.reader.grid_start_corner, GridStartCorner::NorthWest);
        assert_eq!(config.reader.time_tolerance, 1e-5);
        assert_eq!(config.writer.calendar, "gregorian");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reader": {{"time_tolerance": 0.5}}, "log_level": "debug"}}"#
        )
        .unwrap();

        let mut args = args(Some(file.path().to_path_buf()));
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.reader.time_tolerance, 0.5);
        assert_eq!(config.log_level, "debug");

        args.time_tolerance = Some(0.25);
        args.grid_start_corner = Some(GridStartCorner::SouthWest);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.reader.time_tolerance, 0.25);
        assert_eq!(config.reader.grid_start_corner, GridStartCorner::SouthWest);
    }

    #[test]
    fn test_config_validation() {
        // Valid config should pass
        let config = Config::default();
        assert!(config.validate().is_ok());

        // Test invalid log level
        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        // Test invalid tolerance
        let mut config = Config::default();
        config.reader.time_tolerance = f64::NAN;
        assert!(config.validate().is_err());
        config.reader.time_tolerance = -1.0;
        assert!(config.validate().is_err());

        // Test empty calendar
        let mut config = Config::default();
        config.writer.calendar = " ".to_string();
        assert!(config.validate().is_err());

        // Test zero station id width
        let mut config = Config::default();
        config.writer.station_id_width = 0;
        assert!(config.validate().is_err());
    }
}
