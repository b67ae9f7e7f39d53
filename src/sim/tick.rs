//! Fixed timestep simulation tick
//!
//! Advances the rally state machine:
//! `WaitingToLaunch` -> `InPlay` -> `PointScored` -> `WaitingToLaunch`.

use glam::Vec2;
use rand::Rng;

use super::collision::{bounce_walls, goal_scorer, paddle_bounce, sweep_paddle};
use super::state::{BallState, GameEvent, GamePhase, GameState};
use crate::Port;
use crate::consts::*;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired paddle velocity per port (px/s, + = down), indexed by `Port::index`
    pub paddle_velocity: [f32; 2],
    /// Launch trigger (hub button edge or key)
    pub launch: bool,
    /// Flip the debug overlay
    pub toggle_debug: bool,
}

impl TickInput {
    pub fn velocity(&self, port: Port) -> f32 {
        self.paddle_velocity[port.index()]
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.toggle_debug {
        state.match_state.debug_visible = !state.match_state.debug_visible;
    }

    state.time_ticks += 1;

    for port in Port::ALL {
        let cap = state.skill(port).max_paddle_speed();
        let velocity = input.velocity(port).clamp(-cap, cap);
        state.paddle_mut(port).advance(velocity, dt);
    }

    match state.phase {
        GamePhase::WaitingToLaunch => {
            state.park_ball();
            if input.launch {
                launch(state);
            }
        }

        GamePhase::InPlay => advance_ball(state, dt),

        GamePhase::PointScored { .. } => {
            state.park_ball();
            state.point_ticks = state.point_ticks.saturating_sub(1);
            if state.point_ticks == 0 {
                state.phase = GamePhase::WaitingToLaunch;
            }
        }
    }
}

/// Serve toward the other side at the rally speed scaled for the receiver
fn launch(state: &mut GameState) {
    let Some(server) = state.ball.attached_to else {
        return;
    };
    let receiver = server.opponent();
    let magnitude = state.ball.speed * state.skill(receiver).speed_multiplier();

    let spin = state.rng.random_range(SERVE_SPIN_MIN..SERVE_SPIN_MAX);
    let spin = if state.rng.random_bool(0.5) { spin } else { -spin };
    let vy = magnitude * spin;
    let vx = (magnitude * magnitude - vy * vy).sqrt();

    state.ball.vel = Vec2::new(server.attack_direction() * vx, vy);
    state.ball.attached_to = None;
    state.phase = GamePhase::InPlay;
    state.events.push(GameEvent::Launched { by: server });
}

/// Move the ball one tick: paddle, then walls, then goal lines
fn advance_ball(state: &mut GameState, dt: f32) {
    let half = BallState::HALF;
    let from = state.ball.pos;
    let mut vel = state.ball.vel;
    let mut to = from + vel * dt;

    let defender = if vel.x < 0.0 { Port::A } else { Port::B };
    if let Some(contact) = sweep_paddle(from, to, half, state.paddle(defender)) {
        state.ball.hit_count += 1;
        if state.ball.hit_count % SPEEDUP_EVERY_HITS == 0 {
            state.ball.speed = (state.ball.speed * SPEEDUP_FACTOR).min(BALL_MAX_SPEED);
            state.events.push(GameEvent::SpeedUp {
                speed: state.ball.speed,
            });
        }

        let receiver = defender.opponent();
        let magnitude = state.ball.speed * state.skill(receiver).speed_multiplier();
        vel = paddle_bounce(magnitude, contact.offset, defender.attack_direction());
        to = contact.point + vel * dt * (1.0 - contact.t);
        state.events.push(GameEvent::PaddleHit {
            port: defender,
            offset: contact.offset,
        });
    }

    if bounce_walls(&mut to, &mut vel, half) {
        state.events.push(GameEvent::WallHit);
    }

    state.ball.pos = to;
    state.ball.vel = vel;

    if let Some(scorer) = goal_scorer(to, half) {
        score_point(state, scorer);
    }
}

/// Count the point, hand the serve to the side that conceded
fn score_point(state: &mut GameState, scorer: Port) {
    state.match_state.add_point(scorer);
    state.ball = BallState::serving(scorer.opponent());
    state.park_ball();
    state.phase = GamePhase::PointScored { scorer };
    state.point_ticks = POINT_PAUSE_TICKS;
    state.events.push(GameEvent::PointScored {
        scorer,
        score_a: state.match_state.score_a,
        score_b: state.match_state.score_b,
    });
}
