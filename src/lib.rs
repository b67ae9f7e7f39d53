//! Hub Pong - two-player Pong driven by the motors of a programmable hub
//!
//! Core modules:
//! - `device`: Hub link (serial REPL protocol, non-blocking polling)
//! - `motion`: Motor rotation to paddle velocity (acceleration curve)
//! - `sim`: Deterministic fixed-timestep simulation (ball, paddles, scoring)
//! - `skill`: Skill levels and everything derived from them
//! - `select`: Pre-match skill selection
//! - `input`: Keyboard fallback controls
//! - `render`: Terminal renderer
//! - `settings`: Persisted tuning and preferences
//! - `app`: Frame loop tying device, simulation and rendering together

pub mod app;
pub mod device;
pub mod error;
pub mod input;
pub mod motion;
pub mod render;
pub mod select;
pub mod settings;
pub mod sim;
pub mod skill;

pub use error::GameError;
pub use settings::Settings;
pub use skill::SkillLevel;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Frame rate of the outer loop (device poll + render)
    pub const FRAME_RATE: u32 = 60;

    /// Playfield dimensions (pixels, y grows downward)
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Paddle geometry; height comes from the skill level
    pub const PADDLE_WIDTH: f32 = 15.0;
    pub const PADDLE_MARGIN: f32 = 30.0;
    /// Paddle speed cap at skill multiplier 1.0 (px/s)
    pub const PADDLE_BASE_MAX_SPEED: f32 = 900.0;

    /// Ball is a square of this edge length
    pub const BALL_SIZE: f32 = 15.0;
    /// Gap between a serving paddle and the parked ball
    pub const BALL_SERVE_GAP: f32 = 5.0;
    /// Rally speed at serve (px/s, before the receiver's skill multiplier)
    pub const BALL_BASE_SPEED: f32 = 420.0;
    /// Rally speed ceiling
    pub const BALL_MAX_SPEED: f32 = 1200.0;
    /// Every this many paddle hits since the last point, the ball speeds up
    pub const SPEEDUP_EVERY_HITS: u32 = 4;
    /// Multiplicative speed-up step
    pub const SPEEDUP_FACTOR: f32 = 1.1;
    /// Share of the ball speed that an edge hit turns into vertical speed
    pub const SPIN_FRACTION: f32 = 0.8;
    /// Serve angle range, as vertical share of the serve speed
    pub const SERVE_SPIN_MIN: f32 = 0.2;
    pub const SERVE_SPIN_MAX: f32 = 0.45;

    /// Pause after a point before the next serve (ticks at 120 Hz)
    pub const POINT_PAUSE_TICKS: u32 = 60;
}

/// One of the two motor ports on the hub, each owning a paddle.
///
/// Port A drives the left paddle, port B the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
}

impl Port {
    pub const ALL: [Port; 2] = [Port::A, Port::B];

    /// Index into per-port arrays
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Port::A => 0,
            Port::B => 1,
        }
    }

    /// The port defending the other goal
    #[inline]
    pub fn opponent(self) -> Port {
        match self {
            Port::A => Port::B,
            Port::B => Port::A,
        }
    }

    /// Horizontal direction a ball travels when this side hits it
    #[inline]
    pub fn attack_direction(self) -> f32 {
        match self {
            Port::A => 1.0,
            Port::B => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Port::A => "A",
            Port::B => "B",
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
