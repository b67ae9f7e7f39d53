//! Scene composition: playfield, HUD, overlays

use crate::Port;
use crate::consts::FIELD_HEIGHT;
use crate::device::HubStatus;
use crate::select::SkillSelector;
use crate::sim::{BallState, GamePhase, GameState, PaddleState};
use crate::skill::SkillLevel;

use super::Canvas;

const PADDLE_GLYPH: char = '█';
const BALL_GLYPH: char = '●';
const NET_GLYPH: char = '┆';
const WALL_GLYPH: char = '─';

/// Player-facing name of a side
pub fn player_name(port: Port) -> &'static str {
    match port {
        Port::A => "Player 1",
        Port::B => "Player 2",
    }
}

/// Frame-level facts drawn alongside the match
#[derive(Debug, Clone, Copy)]
pub struct Hud {
    pub hub: HubStatus,
    pub fps: u32,
}

/// Draw a match in progress
pub fn draw_game(canvas: &mut Canvas, state: &GameState, hud: &Hud) {
    draw_field(canvas);
    for paddle in &state.paddles {
        draw_paddle(canvas, paddle);
    }
    draw_ball(canvas, &state.ball);
    draw_score(canvas, state);

    let mid = canvas.row_for(FIELD_HEIGHT / 2.0);
    match state.phase {
        GamePhase::WaitingToLaunch => {
            if let Some(server) = state.ball.attached_to {
                let hint = format!(" {} serves: button or SPACE ", player_name(server));
                canvas.text_centered(mid + 2, &hint);
            }
        }
        GamePhase::PointScored { scorer } => {
            canvas.text_centered(mid, &format!(" Point to {}! ", player_name(scorer)));
        }
        GamePhase::InPlay => {}
    }

    draw_status(canvas, state, hud);
}

fn draw_field(canvas: &mut Canvas) {
    let bottom = canvas.rows() as i32 - 1;
    for col in 0..canvas.cols() as i32 {
        canvas.put(col, 0, WALL_GLYPH);
    }
    let net = canvas.cols() as i32 / 2;
    for row in (1..bottom).step_by(2) {
        canvas.put(net, row, NET_GLYPH);
    }
}

fn draw_paddle(canvas: &mut Canvas, paddle: &PaddleState) {
    let col = canvas.col_for((paddle.left() + paddle.right()) / 2.0);
    let top = canvas.row_for(paddle.top());
    let bottom = canvas.row_for(paddle.bottom() - 0.5);
    for row in top..=bottom {
        canvas.put(col, row, PADDLE_GLYPH);
    }
}

fn draw_ball(canvas: &mut Canvas, ball: &BallState) {
    canvas.put(canvas.col_for(ball.pos.x), canvas.row_for(ball.pos.y), BALL_GLYPH);
}

fn draw_score(canvas: &mut Canvas, state: &GameState) {
    let m = &state.match_state;
    let quarter = canvas.cols() as i32 / 4;
    let a = format!(" {} ", m.score_a);
    let b = format!(" {} ", m.score_b);
    canvas.text(quarter - a.len() as i32 / 2, 0, &a);
    canvas.text(3 * quarter - b.len() as i32 / 2, 0, &b);
}

fn draw_status(canvas: &mut Canvas, state: &GameState, hud: &Hud) {
    let row = canvas.rows() as i32 - 1;
    let hub = hud.hub;
    if state.match_state.debug_visible {
        let a = state.paddle(Port::A);
        let b = state.paddle(Port::B);
        let left = format!(
            "hub: {} | P1 y={:.0} v={:.0} | P2 y={:.0} v={:.0}",
            hub.describe(),
            a.position,
            a.velocity,
            b.position,
            b.velocity,
        );
        let right = format!(
            "ball {:.0} px/s hits {} | {} / {} | {} fps",
            state.ball.speed,
            state.ball.hit_count,
            state.skill(Port::A),
            state.skill(Port::B),
            hud.fps,
        );
        canvas.text(0, row, &left);
        canvas.text_right(row, &right);
    } else {
        canvas.text_right(row, "D debug  N new game  Esc quit");
        if !hub.is_connected() {
            // Drawn last so it wins on narrow terminals
            let hint = format!("W/S + Up/Down | {}", hub.describe());
            canvas.text(0, row, &hint);
        }
    }
}

/// Confirmation prompt over the current frame
pub fn draw_confirm(canvas: &mut Canvas, question: &str) {
    let mid = canvas.row_for(FIELD_HEIGHT / 2.0);
    let width = question.chars().count().max(20) + 4;
    let blank: String = " ".repeat(width);
    for row in mid - 2..=mid + 2 {
        canvas.text_centered(row, &blank);
    }
    canvas.text_centered(mid - 1, question);
    canvas.text_centered(mid + 1, "Y / Enter = yes   N / Esc = no");
}

/// Pre-match skill selection screen
pub fn draw_selection(canvas: &mut Canvas, selector: &SkillSelector, hub: HubStatus) {
    let top = (canvas.rows() as i32 / 2 - 8).max(0);
    canvas.text_centered(top, "HUB PONG");
    let who = selector.selecting();
    canvas.text_centered(
        top + 2,
        &format!("{}: choose your skill level", player_name(who)),
    );

    let current = selector.skills().get(who);
    for (i, level) in SkillLevel::all().enumerate() {
        let marker = if level == current { ">" } else { " " };
        let line = format!("{marker} {level:<16}");
        canvas.text_centered(top + 4 + i as i32, &line);
    }

    canvas.text_centered(
        top + 10,
        "Turn your motor or use Up/Down, then press the hub button or Enter",
    );
    if who == Port::B {
        let chosen = format!("{} chose {}", player_name(Port::A), selector.skills().a);
        canvas.text_centered(top + 12, &chosen);
    }
    canvas.text(0, canvas.rows() as i32 - 1, &format!("hub: {}", hub.describe()));
}
