//! Configuration management for the V49 editor
//!
//! Handles loading and validating the YAML application settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiSettings,
    #[serde(default)]
    pub activity: ActivitySettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

/// MIDI device selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MidiSettings {
    /// Substring identifying the controller in port names
    #[serde(default = "default_device_marker")]
    pub device_marker: String,
    /// Client name registered with the MIDI backend
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

/// Live control highlighting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivitySettings {
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

/// Message log
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitorSettings {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            device_marker: default_device_marker(),
            client_name: default_client_name(),
        }
    }
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
        }
    }
}

impl ActivitySettings {
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

impl AppConfig {
    /// Load configuration from file
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let exists = fs::try_exists(path)
            .await
            .with_context(|| format!("Failed to access config file: {}", path.display()))?;
        if !exists {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.midi.device_marker.trim().is_empty() {
            anyhow::bail!("midi.device_marker cannot be empty");
        }
        if self.midi.client_name.trim().is_empty() {
            anyhow::bail!("midi.client_name cannot be empty");
        }
        if self.activity.hold_ms == 0 {
            anyhow::bail!("activity.hold_ms must be greater than 0");
        }
        if self.monitor.log_capacity == 0 {
            anyhow::bail!("monitor.log_capacity must be greater than 0");
        }
        Ok(())
    }
}

fn default_device_marker() -> String { crate::discovery::DEFAULT_DEVICE_MARKER.to_string() }
fn default_client_name() -> String { "v49-editor".to_string() }
fn default_hold_ms() -> u64 { 1000 }
fn default_log_capacity() -> usize { crate::midi::DEFAULT_LOG_CAPACITY }
