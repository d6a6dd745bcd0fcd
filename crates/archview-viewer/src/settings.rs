use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Timing and styling knobs for the viewer. Every field has a default, so a
/// partial settings file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerSettings {
    /// Ceiling on waiting for the drawing surface to get a non-zero size.
    pub surface_wait_ms: u64,
    /// Poll interval when the host offers no resize notifications.
    pub surface_poll_ms: u64,
    pub fit_retries: u32,
    pub fit_retry_delay_ms: u64,
    pub fit_padding: f64,
    /// Opacity of elements outside the focus scope.
    pub dim_opacity: f64,
    /// Ceiling on waiting for an algorithmic layout to report completion.
    pub layout_timeout_ms: u64,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            surface_wait_ms: 2000,
            surface_poll_ms: 50,
            fit_retries: 5,
            fit_retry_delay_ms: 100,
            fit_padding: 40.0,
            dim_opacity: 0.25,
            layout_timeout_ms: 10_000,
        }
    }
}

impl ViewerSettings {
    pub fn surface_wait(&self) -> Duration {
        Duration::from_millis(self.surface_wait_ms)
    }

    pub fn surface_poll(&self) -> Duration {
        Duration::from_millis(self.surface_poll_ms.max(1))
    }

    pub fn fit_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fit_retry_delay_ms)
    }

    pub fn layout_timeout(&self) -> Duration {
        Duration::from_millis(self.layout_timeout_ms)
    }
}

/// Resolve the settings file (<config dir>/archview/viewer.json).
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("archview")
        .join("viewer.json")
}

pub fn read_settings() -> ViewerSettings {
    read_settings_from(&settings_path())
}

/// Missing or unreadable files fall back to defaults.
pub fn read_settings_from(path: &Path) -> ViewerSettings {
    if !path.exists() {
        return ViewerSettings::default();
    }
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "invalid viewer settings, using defaults");
            ViewerSettings::default()
        })
}

pub fn write_settings(settings: &ViewerSettings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

pub fn write_settings_to(path: &Path, settings: &ViewerSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
