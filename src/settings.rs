//! Game settings and preferences
//!
//! Persisted as JSON next to the binary (or wherever `--settings` points).
//! Command-line flags override what is loaded here.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::GameError;
use crate::device::protocol::BAUD_RATE;
use crate::motion::MotionConfig;
use crate::sim::PlayerSkills;
use crate::skill::SkillLevel;

/// Default settings file name
pub const DEFAULT_PATH: &str = "hub-pong.json";

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Match skill level, used for both sides unless overridden
    pub skill: SkillLevel,
    /// Per-side overrides (handicap)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_a: Option<SkillLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_b: Option<SkillLevel>,

    // === Hub ===
    /// Serial device path; auto-detected when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    /// Swap which motor drives which paddle direction
    pub invert_a: bool,
    pub invert_b: bool,

    // === Control ===
    pub motion: MotionConfig,
    /// How long one key press keeps a paddle moving (ms)
    pub keyboard_hold_ms: u64,

    // === HUD ===
    /// Start with the debug overlay visible
    pub show_debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skill: SkillLevel::NORMAL,
            skill_a: None,
            skill_b: None,

            serial_port: None,
            baud_rate: BAUD_RATE,
            invert_a: false,
            invert_b: false,

            motion: MotionConfig::default(),
            keyboard_hold_ms: 180,

            show_debug: false,
        }
    }
}

impl Settings {
    /// Load settings; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, GameError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(GameError::SettingsIo {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings = serde_json::from_str(&json).map_err(|source| GameError::SettingsFormat {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), GameError> {
        let io_err = |source: std::io::Error| GameError::SettingsIo {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| io_err(e.into()))?;
        fs::write(path, json).map_err(io_err)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Effective skill of each side
    pub fn skills(&self) -> PlayerSkills {
        PlayerSkills {
            a: self.skill_a.unwrap_or(self.skill),
            b: self.skill_b.unwrap_or(self.skill),
        }
    }

    /// Whether skills were pinned per side, so selection can be skipped
    pub fn has_explicit_skills(&self) -> bool {
        self.skill_a.is_some() && self.skill_b.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.skill = SkillLevel::MAX;
        settings.skill_b = Some(SkillLevel::MIN);
        settings.motion.smoothing_window = 5;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.skills().a, SkillLevel::MAX);
        assert_eq!(loaded.skills().b, SkillLevel::MIN);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "skill": 2, "motion": { "gamma": 2.0 } }"#).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.skill.get(), 2);
        assert_eq!(loaded.motion.gamma, 2.0);
        assert_eq!(loaded.motion.smoothing_window, MotionConfig::default().smoothing_window);
        assert_eq!(loaded.baud_rate, BAUD_RATE);
    }

    #[test]
    fn test_invalid_skill_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "skill": 7 }"#).unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(GameError::SettingsFormat { .. })
        ));
    }
}
