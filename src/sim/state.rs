//! Game state and core simulation types
//!
//! Everything the simulation mutates lives in `GameState`, passed explicitly
//! into `tick`. No globals.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::{Port, SkillLevel};

/// Current phase of a rally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Ball parked at the serving paddle, waiting for the launch trigger
    WaitingToLaunch,
    /// Ball in motion
    InPlay,
    /// Short pause after a goal; the score has already been counted
    PointScored { scorer: Port },
}

/// Something that happened during a tick, for rendering and logging
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Launched { by: Port },
    PaddleHit { port: Port, offset: f32 },
    SpeedUp { speed: f32 },
    WallHit,
    PointScored { scorer: Port, score_a: u32, score_b: u32 },
}

/// Skill level of each side, fixed for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerSkills {
    pub a: SkillLevel,
    pub b: SkillLevel,
}

impl PlayerSkills {
    pub fn uniform(level: SkillLevel) -> Self {
        Self { a: level, b: level }
    }

    pub fn get(&self, port: Port) -> SkillLevel {
        match port {
            Port::A => self.a,
            Port::B => self.b,
        }
    }

    pub fn set(&mut self, port: Port, level: SkillLevel) {
        match port {
            Port::A => self.a = level,
            Port::B => self.b = level,
        }
    }
}

/// A paddle; `position` is its vertical centre
#[derive(Debug, Clone, PartialEq)]
pub struct PaddleState {
    pub port: Port,
    pub position: f32,
    /// Current velocity (px/s, + = down)
    pub velocity: f32,
    /// Height, set by the skill level
    pub size: f32,
}

impl PaddleState {
    pub fn new(port: Port, skill: SkillLevel) -> Self {
        Self {
            port,
            position: FIELD_HEIGHT / 2.0,
            velocity: 0.0,
            size: skill.paddle_height(),
        }
    }

    /// Left edge
    pub fn left(&self) -> f32 {
        match self.port {
            Port::A => PADDLE_MARGIN,
            Port::B => FIELD_WIDTH - PADDLE_MARGIN - PADDLE_WIDTH,
        }
    }

    pub fn right(&self) -> f32 {
        self.left() + PADDLE_WIDTH
    }

    /// x of the face the ball bounces off
    pub fn face(&self) -> f32 {
        match self.port {
            Port::A => self.right(),
            Port::B => self.left(),
        }
    }

    pub fn top(&self) -> f32 {
        self.position - self.size / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.position + self.size / 2.0
    }

    /// Integrate velocity and keep the paddle inside the field
    pub fn advance(&mut self, velocity: f32, dt: f32) {
        self.velocity = velocity;
        let half = self.size / 2.0;
        self.position = (self.position + velocity * dt).clamp(half, FIELD_HEIGHT - half);
    }
}

/// The ball; a square of edge `BALL_SIZE` centred on `pos`
#[derive(Debug, Clone, PartialEq)]
pub struct BallState {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Paddle hits since the last point
    pub hit_count: u32,
    /// Rally speed before the receiver's skill multiplier
    pub speed: f32,
    /// Serving paddle while the ball is parked
    pub attached_to: Option<Port>,
}

impl BallState {
    pub const HALF: f32 = BALL_SIZE / 2.0;

    /// A fresh ball parked at `server`'s paddle
    pub fn serving(server: Port) -> Self {
        Self {
            pos: Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0),
            vel: Vec2::ZERO,
            hit_count: 0,
            speed: BALL_BASE_SPEED,
            attached_to: Some(server),
        }
    }

    /// Follow the serving paddle while parked
    pub fn update_attached(&mut self, paddle: &PaddleState) {
        if self.attached_to == Some(paddle.port) {
            let gap = BALL_SERVE_GAP + Self::HALF;
            let x = match paddle.port {
                Port::A => paddle.right() + gap,
                Port::B => paddle.left() - gap,
            };
            self.pos = Vec2::new(x, paddle.position);
        }
    }
}

/// Scores and match-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    pub score_a: u32,
    pub score_b: u32,
    pub skills: PlayerSkills,
    pub debug_visible: bool,
    /// Completed rallies; always `score_a + score_b`
    pub rallies: u32,
}

impl MatchState {
    pub fn new(skills: PlayerSkills) -> Self {
        Self {
            score_a: 0,
            score_b: 0,
            skills,
            debug_visible: false,
            rallies: 0,
        }
    }

    pub fn score(&self, port: Port) -> u32 {
        match port {
            Port::A => self.score_a,
            Port::B => self.score_b,
        }
    }

    pub fn add_point(&mut self, scorer: Port) {
        match scorer {
            Port::A => self.score_a += 1,
            Port::B => self.score_b += 1,
        }
        self.rallies += 1;
    }
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed for the serve-angle RNG
    pub seed: u64,
    pub rng: Pcg32,
    pub match_state: MatchState,
    pub paddles: [PaddleState; 2],
    pub ball: BallState,
    pub phase: GamePhase,
    /// Ticks left in the post-point pause
    pub point_ticks: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Port B serves first
    pub const FIRST_SERVER: Port = Port::B;

    pub fn new(skills: PlayerSkills, seed: u64) -> Self {
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            match_state: MatchState::new(skills),
            paddles: [
                PaddleState::new(Port::A, skills.a),
                PaddleState::new(Port::B, skills.b),
            ],
            ball: BallState::serving(Self::FIRST_SERVER),
            phase: GamePhase::WaitingToLaunch,
            point_ticks: 0,
            time_ticks: 0,
            events: Vec::new(),
        };
        state.park_ball();
        state
    }

    /// Start over with the same skills, keeping the debug overlay setting
    pub fn new_match(&mut self) {
        let debug = self.match_state.debug_visible;
        *self = Self::new(self.match_state.skills, self.seed.wrapping_add(1));
        self.match_state.debug_visible = debug;
    }

    pub fn paddle(&self, port: Port) -> &PaddleState {
        &self.paddles[port.index()]
    }

    pub fn paddle_mut(&mut self, port: Port) -> &mut PaddleState {
        &mut self.paddles[port.index()]
    }

    pub fn skill(&self, port: Port) -> SkillLevel {
        self.match_state.skills.get(port)
    }

    /// Keep a parked ball next to its serving paddle
    pub fn park_ball(&mut self) {
        if let Some(server) = self.ball.attached_to {
            let paddle = &self.paddles[server.index()];
            self.ball.update_attached(paddle);
        }
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }
}
