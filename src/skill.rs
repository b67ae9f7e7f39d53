//! Skill levels
//!
//! Level 1 is the beginner setting (largest paddle, slowest ball), level 5 the
//! expert one (smallest paddle, fastest ball). The speed multiplier is linear
//! in the level; paddle heights follow a hand-tuned table.

use serde::{Deserialize, Serialize};

use crate::GameError;
use crate::consts::PADDLE_BASE_MAX_SPEED;

/// Paddle heights per level (px)
const PADDLE_HEIGHTS: [f32; 5] = [180.0, 140.0, 100.0, 70.0, 50.0];

/// Display labels for the selection screen
const LABELS: [&str; 5] = ["Beginner", "Easy", "Normal", "Hard", "Expert"];

/// A validated skill level in 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SkillLevel(u8);

impl SkillLevel {
    pub const MIN: SkillLevel = SkillLevel(1);
    pub const NORMAL: SkillLevel = SkillLevel(3);
    pub const MAX: SkillLevel = SkillLevel(5);

    pub fn new(level: u8) -> Result<Self, GameError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(GameError::InvalidSkillLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn slot(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Paddle height for a player at this level
    pub fn paddle_height(self) -> f32 {
        PADDLE_HEIGHTS[self.slot()]
    }

    /// Ball speed multiplier applied when the ball travels toward this player
    pub fn speed_multiplier(self) -> f32 {
        0.6 + 0.2 * (self.0 - 1) as f32
    }

    /// Paddle speed cap (px/s)
    pub fn max_paddle_speed(self) -> f32 {
        PADDLE_BASE_MAX_SPEED * self.speed_multiplier()
    }

    pub fn label(self) -> &'static str {
        LABELS[self.slot()]
    }

    /// One level harder, saturating at 5
    pub fn harder(self) -> Self {
        Self((self.0 + 1).min(5))
    }

    /// One level easier, saturating at 1
    pub fn easier(self) -> Self {
        Self((self.0 - 1).max(1))
    }

    pub fn all() -> impl Iterator<Item = SkillLevel> {
        (1..=5).map(SkillLevel)
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<u8> for SkillLevel {
    type Error = GameError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<SkillLevel> for u8 {
    fn from(level: SkillLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.0, self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(SkillLevel::new(0), Err(GameError::InvalidSkillLevel(0))));
        assert!(matches!(SkillLevel::new(6), Err(GameError::InvalidSkillLevel(6))));
        assert!(SkillLevel::new(1).is_ok());
        assert!(SkillLevel::new(5).is_ok());
    }

    #[test]
    fn test_higher_skill_means_smaller_paddle_and_faster_ball() {
        let levels: Vec<_> = SkillLevel::all().collect();
        for pair in levels.windows(2) {
            assert!(pair[1].paddle_height() < pair[0].paddle_height());
            assert!(pair[1].speed_multiplier() > pair[0].speed_multiplier());
            assert!(pair[1].max_paddle_speed() > pair[0].max_paddle_speed());
        }
        assert!((SkillLevel::NORMAL.speed_multiplier() - 1.0).abs() < 1e-6);
        assert!((SkillLevel::MIN.speed_multiplier() - 0.6).abs() < 1e-6);
        assert!((SkillLevel::MAX.speed_multiplier() - 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_stepping_saturates() {
        assert_eq!(SkillLevel::MAX.harder(), SkillLevel::MAX);
        assert_eq!(SkillLevel::MIN.easier(), SkillLevel::MIN);
        assert_eq!(SkillLevel::NORMAL.harder().get(), 4);
    }

    #[test]
    fn test_serde_validates() {
        let level: SkillLevel = serde_json::from_str("4").unwrap();
        assert_eq!(level.get(), 4);
        assert!(serde_json::from_str::<SkillLevel>("9").is_err());
        assert_eq!(serde_json::to_string(&SkillLevel::MAX).unwrap(), "5");
    }
}
