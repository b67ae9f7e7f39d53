//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only (serve angles)
//! - No rendering, device or platform dependencies

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{PaddleContact, bounce_walls, goal_scorer, paddle_bounce, sweep_paddle};
pub use state::{
    BallState, GameEvent, GamePhase, GameState, MatchState, PaddleState, PlayerSkills,
};
pub use tick::{TickInput, tick};
