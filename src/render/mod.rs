//! Terminal rendering
//!
//! Frames are drawn into a `Canvas` (a plain character grid) by the functions
//! in `scene`, then pushed to the terminal by `TerminalRenderer`.

pub mod canvas;
pub mod scene;
pub mod terminal;

pub use canvas::Canvas;
pub use terminal::TerminalRenderer;
