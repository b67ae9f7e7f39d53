//! Motor rotation to paddle velocity
//!
//! Each new sample is compared with the previous one for the same port. The
//! angular rate goes through a deadzone and a gamma curve, so slow turns give
//! fine control and fast turns cross the field quickly:
//!
//! `v = gain * r * (r / reference)^(gamma - 1)`, with `r = max(0, rate - deadzone)`
//!
//! then a short moving average and a clamp to the skill's paddle speed cap.
//! Device errors and gaps never reach the simulation: the last velocity is
//! held until the stall timeout, then ramps linearly to zero.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceError, MotorSample};

/// Tuning for the acceleration curve and stall handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Paddle pixels per motor degree at the reference rate
    pub gain: f32,
    /// Curve exponent (1.0 = linear, >1 = finer near zero)
    pub gamma: f32,
    /// Rate (deg/s) at which the curve is exactly linear
    pub reference_dps: f32,
    /// Rates below this (deg/s) are treated as jitter
    pub deadzone_dps: f32,
    /// Moving-average window over mapped velocities (1 = off)
    pub smoothing_window: usize,
    /// Gap without samples after which the hands are considered off
    pub stall_timeout_ms: u64,
    /// Time for a held velocity to ramp down to zero after a stall
    pub decay_window_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            gain: 1.5,
            gamma: 1.5,
            reference_dps: 180.0,
            deadzone_dps: 2.0,
            smoothing_window: 3,
            stall_timeout_ms: 150,
            decay_window_ms: 250,
        }
    }
}

impl MotionConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn decay_window(&self) -> Duration {
        Duration::from_millis(self.decay_window_ms)
    }

    /// Unsigned curve output for an angular rate, before the speed cap
    pub fn curve(&self, rate_dps: f32) -> f32 {
        let r = (rate_dps.abs() - self.deadzone_dps).max(0.0);
        if r == 0.0 {
            return 0.0;
        }
        let shape = (r / self.reference_dps.max(f32::EPSILON)).powf(self.gamma.max(1.0) - 1.0);
        self.gain * r * shape
    }
}

/// Speed for an angular rate, capped at `max_speed`
pub fn speed_for_rate(config: &MotionConfig, rate_dps: f32, max_speed: f32) -> f32 {
    config.curve(rate_dps).min(max_speed)
}

#[derive(Debug, Clone, Copy)]
struct Stall {
    started: Duration,
    from: f32,
}

/// Turns one port's sample stream into a paddle velocity (px/s, + = down)
#[derive(Debug, Clone)]
pub struct MotionMapper {
    config: MotionConfig,
    max_speed: f32,
    previous: Option<MotorSample>,
    recent: VecDeque<f32>,
    velocity: f32,
    stall: Option<Stall>,
}

impl MotionMapper {
    pub fn new(config: MotionConfig, max_speed: f32) -> Self {
        let window = config.smoothing_window.max(1);
        Self {
            config,
            max_speed,
            previous: None,
            recent: VecDeque::with_capacity(window),
            velocity: 0.0,
            stall: None,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn set_max_speed(&mut self, max_speed: f32) {
        self.max_speed = max_speed;
        self.velocity = self.velocity.clamp(-max_speed, max_speed);
    }

    /// Forget history (new match, skill change)
    pub fn reset(&mut self) {
        self.previous = None;
        self.recent.clear();
        self.velocity = 0.0;
        self.stall = None;
    }

    /// Fold this frame's read into the velocity and return it
    pub fn update(&mut self, read: Option<Result<MotorSample, DeviceError>>, now: Duration) -> f32 {
        match read {
            Some(Ok(sample)) => self.ingest(sample),
            Some(Err(_)) | None => self.coast(now),
        }
        self.velocity
    }

    fn ingest(&mut self, sample: MotorSample) {
        let Some(previous) = self.previous else {
            self.reseed(sample);
            return;
        };

        let gap = sample.timestamp.saturating_sub(previous.timestamp);
        if gap > self.config.stall_timeout() {
            // Back after a stall or reconnect; angles may have jumped
            self.reseed(sample);
            return;
        }
        if gap.is_zero() {
            self.velocity = 0.0;
            return;
        }

        let delta = (i64::from(sample.angle) - i64::from(previous.angle)) as f32;
        let rate = delta / gap.as_secs_f32();
        let mapped = rate.signum() * speed_for_rate(&self.config, rate, self.max_speed);
        let mapped = if delta == 0.0 { 0.0 } else { mapped };

        let window = self.config.smoothing_window.max(1);
        if self.recent.len() == window {
            self.recent.pop_front();
        }
        self.recent.push_back(mapped);
        let average = self.recent.iter().sum::<f32>() / self.recent.len() as f32;

        self.velocity = average.clamp(-self.max_speed, self.max_speed);
        self.previous = Some(sample);
        self.stall = None;
    }

    fn reseed(&mut self, sample: MotorSample) {
        self.previous = Some(sample);
        self.recent.clear();
        self.velocity = 0.0;
        self.stall = None;
    }

    fn coast(&mut self, now: Duration) {
        let Some(previous) = self.previous else {
            self.velocity = 0.0;
            return;
        };
        let stall_at = previous.timestamp + self.config.stall_timeout();
        if now <= stall_at {
            return;
        }

        let stall = *self.stall.get_or_insert(Stall {
            started: stall_at,
            from: self.velocity,
        });
        let decay = self.config.decay_window().as_secs_f32();
        let elapsed = now.saturating_sub(stall.started).as_secs_f32();
        let remaining = if decay > 0.0 {
            (1.0 - elapsed / decay).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.velocity = stall.from * remaining;
        if remaining == 0.0 {
            self.recent.clear();
        }
    }
}
