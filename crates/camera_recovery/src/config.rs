//! `DetectorConfig` - immutable per-session detector settings.
//!
//! Loaded once from a flat key/value TOML file (`camera_recovery.toml`). Every
//! key is optional; a missing file means built-in defaults.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::convention::{Convention, StorageOrder, UploadKind};
use crate::decompose::SyntheticProjection;
use crate::scorer::MAX_SCORE;

pub const DEFAULT_CONFIG_FILE: &str = "camera_recovery.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Write the diagnostic stream.
    pub enable_logging: bool,

    /// Memory order of the watched block.
    pub storage: StorageOrder,
    /// Whether the watched block is a composed VP or a bare view matrix.
    pub upload: UploadKind,
    /// First of the four registers watched for camera data.
    pub watch_register: u32,

    /// Minimum score for a block to compete for the frame.
    pub candidate_score_threshold: u32,
    /// Minimum score for a locked stream to commit the frame's best block.
    pub commit_score_threshold: u32,

    /// Frame-to-frame change of the motion scalar that counts as movement.
    pub motion_threshold: f32,
    /// Moving frames needed before locking.
    pub lock_frames: u32,

    /// Synthetic near plane handed downstream.
    pub z_near: f32,
    /// Synthetic far plane handed downstream.
    pub z_far: f32,
    /// Display aspect ratio, for view-only uploads.
    pub aspect: f32,
    /// Vertical field of view in degrees, for view-only uploads.
    pub fov_y_degrees: f32,

    /// Frames logged in full after the first plausible candidate.
    pub diagnostic_frames: u32,
    pub diagnostic_lines_per_frame: u32,
    /// Number of recovered World matrices to log.
    pub world_log_limit: u32,
    /// Status line period, in frames.
    pub status_interval_frames: u64,

    /// Uploads whose depth translation (canonical `[14]`) is at most this get an
    /// identity World: they belong to a secondary pass that strips the eye.
    /// Zero or negative disables the rule.
    pub secondary_pass_depth_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            storage: StorageOrder::ColumnMajor,
            upload: UploadKind::ViewProjection,
            watch_register: 0,
            candidate_score_threshold: 1,
            commit_score_threshold: 6,
            motion_threshold: 0.01,
            lock_frames: 3,
            z_near: 10.0,
            z_far: 100_000.0,
            aspect: 16.0 / 9.0,
            fov_y_degrees: 60.0,
            diagnostic_frames: 10,
            diagnostic_lines_per_frame: 15,
            world_log_limit: 5,
            status_interval_frames: 300,
            secondary_pass_depth_threshold: 1.0,
        }
    }
}

impl DetectorConfig {
    /// Reads and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::info!("Loaded detector config from {}", path.display());
        Ok(config)
    }

    /// Like [`DetectorConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                log::info!(
                    "No config at {}; using built-in defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.z_near > 0.0) {
            return invalid("z_near must be > 0");
        }
        if !(self.z_far > self.z_near) {
            return invalid("z_far must be greater than z_near");
        }
        if self.lock_frames == 0 {
            return invalid("lock_frames must be >= 1");
        }
        if !(self.motion_threshold >= 0.0) {
            return invalid("motion_threshold must be >= 0");
        }
        if !(self.aspect > 0.0) {
            return invalid("aspect must be > 0");
        }
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return invalid("fov_y_degrees must be in (0, 180)");
        }
        if self.candidate_score_threshold > MAX_SCORE {
            return invalid("candidate_score_threshold exceeds the maximum score");
        }
        if self.commit_score_threshold > MAX_SCORE {
            return invalid("commit_score_threshold exceeds the maximum score");
        }
        if self.status_interval_frames == 0 {
            return invalid("status_interval_frames must be >= 1");
        }
        Ok(())
    }

    pub fn convention(&self) -> Convention {
        Convention::new(self.storage, self.upload)
    }

    pub fn synthetic_projection(&self) -> SyntheticProjection {
        SyntheticProjection {
            z_near: self.z_near,
            z_far: self.z_far,
            fov_y_deg: self.fov_y_degrees,
            aspect: self.aspect,
        }
    }

    /// Whether the secondary-pass World rule applies to a canonical depth translation.
    pub fn is_secondary_pass(&self, depth_translation: f32) -> bool {
        self.secondary_pass_depth_threshold > 0.0
            && depth_translation.abs() <= self.secondary_pass_depth_threshold
    }
}
