//! Keyboard fallback controls
//!
//! Terminals report key presses and auto-repeats but usually not releases, so
//! a press keeps its paddle moving for a short hold window; auto-repeat keeps
//! renewing it while the key is held down.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::Port;

/// What a key press means to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move a paddle; -1 = up, 1 = down
    Move { port: Port, direction: i8 },
    Launch,
    ToggleDebug,
    NewGame,
    /// Enter/Y: confirm a selection or prompt
    Confirm,
    /// Selection screen: pick a harder/easier level
    Up,
    Down,
    /// Esc: dismiss a prompt, otherwise quit
    Cancel,
    Quit,
}

/// Map a terminal key event to a command
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }
    let command = match key.code {
        KeyCode::Esc => Command::Cancel,
        KeyCode::Char('w') | KeyCode::Char('W') => Command::Move {
            port: Port::A,
            direction: -1,
        },
        KeyCode::Char('s') | KeyCode::Char('S') => Command::Move {
            port: Port::A,
            direction: 1,
        },
        KeyCode::Up => Command::Up,
        KeyCode::Down => Command::Down,
        KeyCode::Char(' ') => Command::Launch,
        KeyCode::Enter => Command::Confirm,
        KeyCode::Char('d') | KeyCode::Char('D') => Command::ToggleDebug,
        KeyCode::Char('n') | KeyCode::Char('N') => Command::NewGame,
        KeyCode::Char('y') | KeyCode::Char('Y') => Command::Confirm,
        KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// In play, the arrow keys drive paddle B
pub fn in_play(command: Command) -> Command {
    match command {
        Command::Up => Command::Move {
            port: Port::B,
            direction: -1,
        },
        Command::Down => Command::Move {
            port: Port::B,
            direction: 1,
        },
        other => other,
    }
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    direction: i8,
    until: Duration,
}

/// Per-port keyboard paddle control
#[derive(Debug, Clone)]
pub struct KeyboardControl {
    hold: Duration,
    held: [Option<Hold>; 2],
}

impl KeyboardControl {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            held: [None, None],
        }
    }

    pub fn press(&mut self, port: Port, direction: i8, now: Duration) {
        self.held[port.index()] = Some(Hold {
            direction: direction.signum(),
            until: now + self.hold,
        });
    }

    /// Keyboard velocity for `port`, or `None` when the keys are idle
    pub fn velocity(&mut self, port: Port, speed: f32, now: Duration) -> Option<f32> {
        let slot = &mut self.held[port.index()];
        match *slot {
            Some(hold) if now < hold.until => Some(hold.direction as f32 * speed),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn release_all(&mut self) {
        self.held = [None, None];
    }
}

/// Keyboard overrides the motor while a key is held
pub fn combine(motor: f32, keyboard: Option<f32>) -> f32 {
    keyboard.unwrap_or(motor)
}
