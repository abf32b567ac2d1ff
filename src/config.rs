use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::TracksmithError;
use crate::gis::ZOOM_TO_METERS;

const CONFIG_DIR_NAME: &str = "tracksmith";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_ZOOM: u8 = 17;
pub const DEFAULT_WIDTH_M: f64 = 10.0;

/// Where the projected track is anchored in pixel space
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Bounds' minimum corner becomes (0, 0)
    #[default]
    MinCorner,
    /// Bounds' center becomes (0, 0)
    Center,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AssemblerConfig {
    pub zoom: u8,
    pub framing: Framing,
    /// Multiplier applied to heights before converting them to pixels
    pub elevation_exaggeration: f64,
    /// Pixels per meter per zoom unit
    pub meters_scale: f64,
    /// When set, point features that match no centerline index exactly are attached to the
    /// nearest index within this many pixels
    pub snap_tolerance: Option<f64>,
    /// Meters, used when a line has no width
    pub default_width: f64,
    /// Meters, used when a line has no height
    pub default_height: f64,
    pub default_camber: f64,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            framing: Framing::MinCorner,
            elevation_exaggeration: 1.0,
            meters_scale: ZOOM_TO_METERS,
            snap_tolerance: None,
            default_width: DEFAULT_WIDTH_M,
            default_height: 0.0,
            default_camber: 0.0,
        }
    }
}

impl AssemblerConfig {
    pub fn default_path() -> Result<PathBuf, TracksmithError> {
        Ok(dirs::config_dir()
            .ok_or(TracksmithError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Load the user config file, if there is one
    pub fn from_local_file() -> Result<Option<Self>, TracksmithError> {
        let config_path = Self::default_path()?;
        if config_path.exists() {
            Self::from_path(&config_path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, TracksmithError> {
        let file = std::fs::File::open(path)
            .map_err(|e| TracksmithError::ConfigIOError { source: e })?;
        serde_json::from_reader(file).map_err(|e| TracksmithError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), TracksmithError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), TracksmithError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TracksmithError::ConfigIOError { source: e })?;
            }
        }

        let file = std::fs::File::create(path)
            .map_err(|e| TracksmithError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| TracksmithError::ConfigSerializeError { source: e })
    }
}
