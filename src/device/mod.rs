//! Hub device reader
//!
//! The game loop polls the hub explicitly once per frame:
//! 1. `poll(now)` pumps serial I/O without blocking
//! 2. `read_angle(port)` hands out the fresh sample for each port (at most once)
//!
//! Errors are reported per read and absorbed by the motion mapper.

pub mod protocol;
pub mod serial;

use std::time::Duration;

pub use crate::error::DeviceError;
use crate::Port;
pub use serial::{HubReader, SerialConnector};

/// A single rotation reading from one motor port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorSample {
    pub port: Port,
    /// Cumulative rotation in degrees
    pub angle: i32,
    /// Capture time since the session started
    pub timestamp: Duration,
}

/// Connection state, surfaced in the debug overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubStatus {
    /// Hub support turned off (`--no-hub`)
    Disabled,
    /// Looking for the hub / waiting to retry
    Disconnected,
    /// Sending the REPL setup commands
    Initializing,
    /// Receiving positions
    Connected,
}

impl HubStatus {
    pub fn is_connected(self) -> bool {
        self == HubStatus::Connected
    }

    pub fn describe(self) -> &'static str {
        match self {
            HubStatus::Disabled => "Hub disabled - keyboard control",
            HubStatus::Disconnected => "Hub disconnected - check USB (keyboard active)",
            HubStatus::Initializing => "Hub initializing...",
            HubStatus::Connected => "Hub connected",
        }
    }
}

/// Source of motor samples and the hub button
pub trait DeviceReader {
    /// Pump I/O for this frame. Must not block beyond a short time box.
    fn poll(&mut self, now: Duration);

    /// Fresh sample for `port` since the last call, or the current error.
    /// `None` means nothing new arrived this frame.
    fn read_angle(&mut self, port: Port) -> Option<Result<MotorSample, DeviceError>>;

    /// Last known state of the hub's center button
    fn button_pressed(&self) -> bool;

    fn status(&self) -> HubStatus;
}

/// Reader used when hub support is disabled
#[derive(Debug, Default)]
pub struct NullReader;

impl DeviceReader for NullReader {
    fn poll(&mut self, _now: Duration) {}

    fn read_angle(&mut self, _port: Port) -> Option<Result<MotorSample, DeviceError>> {
        Some(Err(DeviceError::Unavailable))
    }

    fn button_pressed(&self) -> bool {
        false
    }

    fn status(&self) -> HubStatus {
        HubStatus::Disabled
    }
}

/// Rising-edge detector for the hub button
#[derive(Debug, Clone, Default)]
pub struct ButtonEdge {
    last: bool,
}

impl ButtonEdge {
    /// Start from the current level so a held button does not fire
    pub fn primed(level: bool) -> Self {
        Self { last: level }
    }

    /// Returns true only on a released -> pressed transition
    pub fn update(&mut self, level: bool) -> bool {
        let fired = level && !self.last;
        self.last = level;
        fired
    }
}
