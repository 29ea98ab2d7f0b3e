//! Persisted engine settings.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NormalError, NormalResult};
use crate::scheduler::ScheduleConfig;

/// Settings shared by every split normal pass.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalSettings {
    /// Maximum angle between faces (radians) that still shade smoothly.
    /// The default of PI only splits at sharp edges and flat faces.
    pub smoothing_angle: f32,
    /// When set, area weighting uses the area of linked coplanar patches
    /// whose face normals differ by at most this angle (radians).
    pub linked_area_angle: Option<f32>,
    /// Distance under which vertex normals are merged.
    pub merge_distance: f32,
    /// Whether unselected vertices join merge clusters.
    pub merge_unselected: bool,
    pub schedule: ScheduleConfig,
}

impl Default for NormalSettings {
    fn default() -> Self {
        Self {
            smoothing_angle: std::f32::consts::PI,
            linked_area_angle: None,
            merge_distance: 0.0001,
            merge_unselected: false,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl NormalSettings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("bevy_split_normals");
            p.push("settings.ron");
            p
        })
    }

    /// Load settings from the config directory, or return defaults.
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Using default split normal settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> NormalResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Save settings to the config directory.
    pub fn save(&self) -> NormalResult<PathBuf> {
        let Some(path) = Self::file_path() else {
            error!("Could not determine config directory");
            return Err(NormalError::Config(
                "no config directory on this platform".to_string(),
            ));
        };
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> NormalResult<()> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_ron_string()?)?;
        info!("Split normal settings saved to: {:?}", path);
        Ok(())
    }

    pub fn from_ron_str(content: &str) -> NormalResult<Self> {
        ron::from_str(content).map_err(|e| NormalError::Config(e.to_string()))
    }

    pub fn to_ron_string(&self) -> NormalResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| NormalError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = NormalSettings::default();
        assert_eq!(settings.smoothing_angle, std::f32::consts::PI);
        assert_eq!(settings.linked_area_angle, None);
        assert_eq!(settings.merge_distance, 0.0001);
        assert!(!settings.merge_unselected);
        assert_eq!(settings.schedule.parallel_threshold, 5000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let settings =
            NormalSettings::from_ron_str("(smoothing_angle: 0.5, linked_area_angle: Some(0.1))")
                .unwrap();
        assert_eq!(settings.smoothing_angle, 0.5);
        assert_eq!(settings.linked_area_angle, Some(0.1));
        assert_eq!(settings.merge_distance, 0.0001);
        assert_eq!(settings.schedule, ScheduleConfig::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = NormalSettings::from_ron_str("(smoothing_angle: \"wide\")").unwrap_err();
        assert!(matches!(err, NormalError::Config(_)));
    }

    #[test]
    fn save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("bevy_split_normals_test_{}", std::process::id()))
            .join("settings.ron");
        let settings = NormalSettings {
            merge_unselected: true,
            schedule: ScheduleConfig {
                parallel_threshold: 10,
                workers: Some(2),
            },
            ..default()
        };

        settings.save_to(&path).unwrap();
        let loaded = NormalSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("bevy_split_normals_missing/settings.ron");
        assert!(matches!(
            NormalSettings::load_from(&path),
            Err(NormalError::Io(_))
        ));
    }
}
