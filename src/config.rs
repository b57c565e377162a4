/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub hardware: HardwareConfig,
    pub simulator: SimulatorConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub arrival_tolerance: f32,
    pub fast_threshold: f32,
    pub update_period_ms: u64,
}

/**
 * Relay board and ranging sensor wiring.
 *
 * # Fields
 *
 * - `backend`:             Drive the simulated shaft or the Linux GPIO lines.
 * - `*_pin`:               sysfs GPIO numbers, only read by the `gpio` backend.
 * - `echo_timeout_us`:     Budget for one ranging probe.
 * - `trigger_pulse_us`:    Width of the trigger pulse.
 * - `trigger_settle_us`:   Low time before the trigger pulse.
 */
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    pub backend: Backend,
    pub up_pin: u64,
    pub down_pin: u64,
    pub fast_pin: u64,
    pub power_pin: u64,
    pub trigger_pin: u64,
    pub echo_pin: u64,
    pub echo_timeout_us: u64,
    pub trigger_pulse_us: u32,
    pub trigger_settle_us: u32,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Simulator,
    Gpio,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub start_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub slow_speed: f32,
    pub fast_speed: f32,
    pub dropout_every: u32,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration in {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            arrival_tolerance: 0.5,
            fast_threshold: 6.0,
            update_period_ms: 100,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            backend: Backend::Simulator,
            up_pin: 17,
            down_pin: 27,
            fast_pin: 22,
            power_pin: 23,
            trigger_pin: 5,
            echo_pin: 6,
            echo_timeout_us: 30_000,
            trigger_pulse_us: 10,
            trigger_settle_us: 2,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            start_distance: 5.0,
            min_distance: 2.0,
            max_distance: 400.0,
            slow_speed: 4.0,
            fast_speed: 15.0,
            dropout_every: 0,
        }
    }
}

impl ControllerConfig {
    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms)
    }
}

impl Config {
    /// Rejects values the controller cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let controller = &self.controller;
        if !controller.arrival_tolerance.is_finite() || controller.arrival_tolerance < 0.0 {
            return Err(format!(
                "controller.arrival_tolerance must be a non-negative number, got {}",
                controller.arrival_tolerance
            ));
        }
        if !controller.fast_threshold.is_finite() || controller.fast_threshold < controller.arrival_tolerance {
            return Err(format!(
                "controller.fast_threshold must be at least arrival_tolerance ({}), got {}",
                controller.arrival_tolerance, controller.fast_threshold
            ));
        }
        if controller.update_period_ms == 0 {
            return Err("controller.update_period_ms must be greater than zero".to_string());
        }
        if self.hardware.echo_timeout_us == 0 {
            return Err("hardware.echo_timeout_us must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl HardwareConfig {
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_micros(self.echo_timeout_us)
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&config_str).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(config)
}

pub fn parse_config(config_str: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(config_str)
}

/***************************************/
/*             Unit tests              */
/***************************************/
