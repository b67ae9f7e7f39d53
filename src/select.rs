//! Pre-match skill selection
//!
//! Player A picks first, then player B. Turning your own motor by
//! `STEP_DEGREES` moves one level; Up/Down do the same. The hub button (on its
//! rising edge) or Enter/Space confirms.

use crate::Port;
use crate::device::{ButtonEdge, MotorSample};
use crate::input::Command;
use crate::sim::PlayerSkills;

/// Rotation needed to move the selection by one level
pub const STEP_DEGREES: i32 = 15;

/// Selection state machine
#[derive(Debug, Clone)]
pub struct SkillSelector {
    skills: PlayerSkills,
    selecting: Port,
    accumulator: i32,
    last_angle: [Option<i32>; 2],
    button: ButtonEdge,
}

impl SkillSelector {
    /// `button_level` primes the edge detector so a held button is ignored
    pub fn new(initial: PlayerSkills, button_level: bool) -> Self {
        Self {
            skills: initial,
            selecting: Port::A,
            accumulator: 0,
            last_angle: [None, None],
            button: ButtonEdge::primed(button_level),
        }
    }

    pub fn selecting(&self) -> Port {
        self.selecting
    }

    pub fn skills(&self) -> PlayerSkills {
        self.skills
    }

    /// Feed a motor sample; only the selecting player's motor counts
    pub fn on_sample(&mut self, sample: MotorSample) {
        let slot = &mut self.last_angle[sample.port.index()];
        let delta = slot.map_or(0, |last| sample.angle.saturating_sub(last));
        *slot = Some(sample.angle);
        if sample.port != self.selecting {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(delta);
        let level = self.skills.get(self.selecting);
        if self.accumulator >= STEP_DEGREES {
            self.skills.set(self.selecting, level.harder());
            self.accumulator = 0;
        } else if self.accumulator <= -STEP_DEGREES {
            self.skills.set(self.selecting, level.easier());
            self.accumulator = 0;
        }
    }

    /// Feed the hub button level; returns the final skills once B confirms
    pub fn on_button(&mut self, pressed: bool) -> Option<PlayerSkills> {
        if self.button.update(pressed) {
            self.confirm()
        } else {
            None
        }
    }

    /// Feed a keyboard command; returns the final skills once B confirms
    pub fn on_command(&mut self, command: Command) -> Option<PlayerSkills> {
        let level = self.skills.get(self.selecting);
        match command {
            Command::Up => self.skills.set(self.selecting, level.easier()),
            Command::Down => self.skills.set(self.selecting, level.harder()),
            Command::Confirm | Command::Launch => return self.confirm(),
            _ => {}
        }
        None
    }

    fn confirm(&mut self) -> Option<PlayerSkills> {
        match self.selecting {
            Port::A => {
                log::info!("Player 1 skill: {}", self.skills.a);
                self.selecting = Port::B;
                self.accumulator = 0;
                None
            }
            Port::B => {
                log::info!("Player 2 skill: {}", self.skills.b);
                Some(self.skills)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SkillLevel;
    use std::time::Duration;

    fn sample(port: Port, angle: i32) -> MotorSample {
        MotorSample {
            port,
            angle,
            timestamp: Duration::ZERO,
        }
    }

    fn selector() -> SkillSelector {
        SkillSelector::new(PlayerSkills::uniform(SkillLevel::NORMAL), false)
    }

    #[test]
    fn test_rotation_steps_by_threshold() {
        let mut sel = selector();
        sel.on_sample(sample(Port::A, 100));
        sel.on_sample(sample(Port::A, 110));
        assert_eq!(sel.skills().a.get(), 3);
        sel.on_sample(sample(Port::A, 115));
        assert_eq!(sel.skills().a.get(), 4);
        // Accumulator restarted after the step
        sel.on_sample(sample(Port::A, 105));
        assert_eq!(sel.skills().a.get(), 4);
        sel.on_sample(sample(Port::A, 95));
        assert_eq!(sel.skills().a.get(), 3);
    }

    #[test]
    fn test_extreme_angles_step_once() {
        let mut sel = selector();
        sel.on_sample(sample(Port::A, i32::MIN));
        sel.on_sample(sample(Port::A, i32::MAX));
        assert_eq!(sel.skills().a.get(), 4);
        sel.on_sample(sample(Port::A, i32::MIN));
        assert_eq!(sel.skills().a.get(), 3);
    }

    #[test]
    fn test_other_motor_is_ignored() {
        let mut sel = selector();
        sel.on_sample(sample(Port::B, 0));
        sel.on_sample(sample(Port::B, 90));
        assert_eq!(sel.skills(), PlayerSkills::uniform(SkillLevel::NORMAL));
    }

    #[test]
    fn test_levels_saturate() {
        let mut sel = selector();
        for _ in 0..10 {
            sel.on_command(Command::Down);
        }
        assert_eq!(sel.skills().a, SkillLevel::MAX);
        for _ in 0..10 {
            sel.on_command(Command::Up);
        }
        assert_eq!(sel.skills().a, SkillLevel::MIN);
    }

    #[test]
    fn test_two_confirms_finish() {
        let mut sel = selector();
        sel.on_command(Command::Down);
        assert_eq!(sel.on_command(Command::Confirm), None);
        assert_eq!(sel.selecting(), Port::B);
        sel.on_command(Command::Up);
        let skills = sel.on_command(Command::Launch).unwrap();
        assert_eq!(skills.a.get(), 4);
        assert_eq!(skills.b.get(), 2);
    }

    #[test]
    fn test_button_confirms_on_edge_only() {
        let mut sel = SkillSelector::new(PlayerSkills::default(), true);
        // Held from before the screen opened
        assert_eq!(sel.on_button(true), None);
        assert_eq!(sel.selecting(), Port::A);
        sel.on_button(false);
        assert_eq!(sel.on_button(true), None);
        assert_eq!(sel.selecting(), Port::B);
        assert_eq!(sel.on_button(true), None);
        sel.on_button(false);
        assert!(sel.on_button(true).is_some());
    }
}
