use std::fmt;
use std::path::Path;

use foundation::grid::DEFAULT_CELL_SIZE;
use foundation::math::Vec2;
use serde::{Deserialize, Serialize};
use streaming::cache::DEFAULT_HIGH_WATER;
use streaming::protocol::UrlTemplate;

use crate::pool::NavLink;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "cannot read config {path}: {message}"),
            ConfigError::Parse(message) => write!(f, "invalid config json: {message}"),
            ConfigError::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tunables for a mounted canvas.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Side length of one cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// Cells rendered on each side of the center cell.
    #[serde(default = "default_radius_in_cells")]
    pub radius_in_cells: u32,

    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,

    /// Texture count above which a settled viewport triggers eviction.
    #[serde(default = "default_cache_high_water")]
    pub cache_high_water: usize,

    /// Minimum interval between re-virtualizations while panning (ms).
    #[serde(default = "default_move_throttle_ms")]
    pub move_throttle_ms: u64,

    /// Quiet period after the last move before cache eviction runs (ms).
    #[serde(default = "default_settle_debounce_ms")]
    pub settle_debounce_ms: u64,

    /// Hover time on a loaded cell before it navigates (ms).
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,

    /// Driver timer period (ms).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// World position shown at mount; its cell becomes the origin cell.
    #[serde(default = "default_initial_center")]
    pub initial_center: [f64; 2],

    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    #[serde(default = "default_content_url")]
    pub content_url: UrlTemplate,

    #[serde(default = "default_detail_url")]
    pub detail_url: UrlTemplate,

    #[serde(default = "default_origin_title")]
    pub origin_title: String,

    #[serde(default = "default_signed_in_links")]
    pub signed_in_links: Vec<NavLink>,

    #[serde(default = "default_signed_out_links")]
    pub signed_out_links: Vec<NavLink>,
}

fn default_cell_size() -> f64 {
    DEFAULT_CELL_SIZE
}

fn default_radius_in_cells() -> u32 {
    2
}

fn default_max_concurrent_loads() -> usize {
    6
}

fn default_cache_high_water() -> usize {
    DEFAULT_HIGH_WATER
}

fn default_move_throttle_ms() -> u64 {
    16
}

fn default_settle_debounce_ms() -> u64 {
    2000
}

fn default_dwell_ms() -> u64 {
    3000
}

fn default_tick_ms() -> u64 {
    16
}

fn default_initial_center() -> [f64; 2] {
    [3000.0, 3000.0]
}

fn default_min_zoom() -> f64 {
    0.25
}

fn default_max_zoom() -> f64 {
    4.0
}

fn default_content_url() -> UrlTemplate {
    UrlTemplate::new("http://127.0.0.1:8080/images/{id}")
}

fn default_detail_url() -> UrlTemplate {
    UrlTemplate::new("http://127.0.0.1:8080/detail/{id}")
}

fn default_origin_title() -> String {
    "Mosaic".to_string()
}

fn default_signed_in_links() -> Vec<NavLink> {
    vec![NavLink::new("Upload", "/upload"), NavLink::new("Log out", "/logout")]
}

fn default_signed_out_links() -> Vec<NavLink> {
    vec![NavLink::new("Log in", "/login"), NavLink::new("Sign up", "/signup")]
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            radius_in_cells: default_radius_in_cells(),
            max_concurrent_loads: default_max_concurrent_loads(),
            cache_high_water: default_cache_high_water(),
            move_throttle_ms: default_move_throttle_ms(),
            settle_debounce_ms: default_settle_debounce_ms(),
            dwell_ms: default_dwell_ms(),
            tick_ms: default_tick_ms(),
            initial_center: default_initial_center(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            content_url: default_content_url(),
            detail_url: default_detail_url(),
            origin_title: default_origin_title(),
            signed_in_links: default_signed_in_links(),
            signed_out_links: default_signed_out_links(),
        }
    }
}

impl CanvasConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CanvasConfig =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.max_concurrent_loads == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_loads must be at least 1".to_string(),
            ));
        }
        if self.cache_high_water == 0 {
            return Err(ConfigError::Invalid(
                "cache_high_water must be at least 1".to_string(),
            ));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom range [{}, {}] is empty or non-positive",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn initial_center(&self) -> Vec2 {
        Vec2::new(self.initial_center[0], self.initial_center[1])
    }

    pub fn origin_links(&self, authenticated: bool) -> &[NavLink] {
        if authenticated {
            &self.signed_in_links
        } else {
            &self.signed_out_links
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{CanvasConfig, ConfigError};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CanvasConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CanvasConfig::default());
        assert_eq!(config.cell_size, 400.0);
        assert_eq!(config.radius_in_cells, 2);
        assert_eq!(config.cache_high_water, 50);
        assert_eq!(config.dwell_ms, 3000);
    }

    #[test]
    fn partial_override() {
        let config =
            CanvasConfig::from_json_str(r#"{"max_concurrent_loads": 2, "detail_url": "https://x/d/{id}"}"#)
                .unwrap();
        assert_eq!(config.max_concurrent_loads, 2);
        assert_eq!(config.detail_url.as_str(), "https://x/d/{id}");
        assert_eq!(config.settle_debounce_ms, 2000);
    }

    #[test]
    fn rejects_invalid_values() {
        for json in [
            r#"{"cell_size": 0}"#,
            r#"{"max_concurrent_loads": 0}"#,
            r#"{"cache_high_water": 0}"#,
            r#"{"min_zoom": 2.0, "max_zoom": 1.0}"#,
        ] {
            let err = CanvasConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json}: {err}");
        }
        assert!(matches!(
            CanvasConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"radius_in_cells": 3}}"#).unwrap();
        let config = CanvasConfig::from_path(file.path()).unwrap();
        assert_eq!(config.radius_in_cells, 3);

        let err = CanvasConfig::from_path("/definitely/missing.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn origin_links_follow_auth_flag() {
        let config = CanvasConfig::default();
        assert_eq!(config.origin_links(true)[0].label, "Upload");
        assert_eq!(config.origin_links(false)[0].label, "Log in");
    }
}
