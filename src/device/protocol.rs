//! Hub REPL protocol
//!
//! The hub runs a MicroPython REPL on its USB serial port. We break into the
//! REPL, switch both motors to cumulative position mode, then repeatedly ask
//! for `POS: <a> <b> <button>` lines.

use std::time::Duration;

/// Serial baud rate of the hub's REPL
pub const BAUD_RATE: u32 = 115_200;

/// Marker printed in front of every position reply
pub const REPLY_MARKER: &str = "POS:";

/// Position query, answered with one reply line
pub const POSITION_QUERY: &[u8] = b"print(\"POS:\", hub.port.A.motor.get()[0], \
hub.port.B.motor.get()[0], hub.button.center.is_pressed())\r\n";

/// One step of the connection setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitStep {
    pub bytes: &'static [u8],
    /// Clear the input buffer before writing
    pub clear_before: bool,
    /// Settle time before the next step may run
    pub settle: Duration,
}

/// Setup sequence: interrupt to REPL, import, position mode on A and B
pub const INIT_SCRIPT: &[InitStep] = &[
    InitStep {
        bytes: b"\x03",
        clear_before: true,
        settle: Duration::from_millis(300),
    },
    InitStep {
        bytes: b"import hub\r\n",
        clear_before: true,
        settle: Duration::from_millis(100),
    },
    InitStep {
        bytes: b"hub.port.A.motor.mode([(2,0)])\r\n",
        clear_before: false,
        settle: Duration::from_millis(100),
    },
    InitStep {
        bytes: b"hub.port.B.motor.mode([(2,0)])\r\n",
        clear_before: false,
        settle: Duration::from_millis(100),
    },
];

/// A decoded position reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubReading {
    pub angle_a: i32,
    pub angle_b: i32,
    pub button: bool,
}

/// Find the last complete reply in `text`.
///
/// The REPL echoes the query itself (`print("POS:", ...`), which must not
/// parse, so each marker occurrence is tried and the last valid one wins.
pub fn parse_reply(text: &str) -> Option<HubReading> {
    text.rmatch_indices(REPLY_MARKER)
        .find_map(|(idx, _)| parse_fields(&text[idx + REPLY_MARKER.len()..]))
}

fn parse_fields(rest: &str) -> Option<HubReading> {
    let mut fields = rest.split_whitespace();
    let angle_a = fields.next()?.parse().ok()?;
    let angle_b = fields.next()?.parse().ok()?;
    let button = match fields.next()? {
        token if token.starts_with("True") => true,
        token if token.starts_with("False") => false,
        _ => return None,
    };
    Some(HubReading {
        angle_a,
        angle_b,
        button,
    })
}

/// Byte offset just past the last complete line, if any
pub fn consumed_len(text: &str) -> Option<usize> {
    text.rfind('\n').map(|idx| idx + 1)
}
