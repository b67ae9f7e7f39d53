//! Collision detection and response
//!
//! The ball is swept along its path each tick so a fast ball cannot skip a
//! paddle. Walls mirror the ball back into the field; goal lines are checked
//! last, on the already-reflected position.

use glam::Vec2;

use super::state::PaddleState;
use crate::Port;
use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH, PADDLE_WIDTH, SPIN_FRACTION};

/// Where the ball met a paddle during a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddleContact {
    /// Fraction of the sweep at which contact happened (0..=1)
    pub t: f32,
    /// Ball centre at contact, pushed clear of the paddle face
    pub point: Vec2,
    /// Contact offset from paddle centre, -1 (top edge) to 1 (bottom edge)
    pub offset: f32,
}

/// Sweep the ball from `from` to `to` against a paddle's front face.
///
/// Depth is measured from the face toward the paddle's goal. The ball hits if
/// its leading edge reaches the face this tick and was not already behind the
/// paddle, and it lines up vertically at the moment of contact.
pub fn sweep_paddle(from: Vec2, to: Vec2, half: f32, paddle: &PaddleState) -> Option<PaddleContact> {
    let face = paddle.face();
    let depth = |p: Vec2| match paddle.port {
        Port::A => face - (p.x - half),
        Port::B => (p.x + half) - face,
    };
    let d0 = depth(from);
    let d1 = depth(to);
    if d1 < 0.0 || d0 > PADDLE_WIDTH || d1 <= d0 {
        return None;
    }

    let t = if d0 < 0.0 { (-d0 / (d1 - d0)).clamp(0.0, 1.0) } else { 0.0 };
    let at = from + (to - from) * t;
    let reach = paddle.size / 2.0 + half;
    let dy = at.y - paddle.position;
    if dy.abs() > reach {
        return None;
    }

    let x = match paddle.port {
        Port::A => face + half,
        Port::B => face - half,
    };
    Some(PaddleContact {
        t,
        point: Vec2::new(x, at.y),
        offset: (dy / (paddle.size / 2.0)).clamp(-1.0, 1.0),
    })
}

/// Outgoing velocity after a paddle hit.
///
/// The vertical part is proportional to the contact offset; the horizontal
/// part takes the rest so the speed is exactly `magnitude`.
pub fn paddle_bounce(magnitude: f32, offset: f32, direction: f32) -> Vec2 {
    let vy = magnitude * SPIN_FRACTION * offset.clamp(-1.0, 1.0);
    let vx = (magnitude * magnitude - vy * vy).max(0.0).sqrt();
    Vec2::new(direction.signum() * vx, vy)
}

/// Reflect off the top and bottom walls, mirroring overshoot back into the
/// field. Returns true if any wall was hit.
pub fn bounce_walls(pos: &mut Vec2, vel: &mut Vec2, half: f32) -> bool {
    let mut hit = false;
    // A very fast ball can overshoot more than once
    for _ in 0..4 {
        if pos.y - half < 0.0 {
            pos.y = 2.0 * half - pos.y;
            vel.y = vel.y.abs();
            hit = true;
        } else if pos.y + half > FIELD_HEIGHT {
            pos.y = 2.0 * (FIELD_HEIGHT - half) - pos.y;
            vel.y = -vel.y.abs();
            hit = true;
        } else {
            break;
        }
    }
    hit
}

/// The side that scores if the ball has reached a goal line
pub fn goal_scorer(pos: Vec2, half: f32) -> Option<Port> {
    if pos.x - half <= 0.0 {
        Some(Port::B)
    } else if pos.x + half >= FIELD_WIDTH {
        Some(Port::A)
    } else {
        None
    }
}
