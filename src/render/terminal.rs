//! Terminal output via crossterm
//!
//! `TerminalRenderer` owns raw mode and the alternate screen for as long as it
//! lives; dropping it restores the terminal, including on early returns.

use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::Print;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};

use crate::GameError;

use super::Canvas;

pub struct TerminalRenderer {
    out: Stdout,
    size: (u16, u16),
}

impl TerminalRenderer {
    pub fn new() -> Result<Self, GameError> {
        enable_raw_mode().map_err(GameError::RenderInit)?;
        // From here on Drop undoes whatever succeeded
        let mut renderer = Self {
            out: io::stdout(),
            size: (0, 0),
        };
        execute!(renderer.out, EnterAlternateScreen, Hide, Clear(ClearType::All))
            .map_err(GameError::RenderInit)?;
        renderer.size = terminal::size().map_err(GameError::RenderInit)?;
        log::info!("Terminal {}x{}", renderer.size.0, renderer.size.1);
        Ok(renderer)
    }

    /// Blank canvas matching the current terminal size
    pub fn canvas(&mut self) -> Canvas {
        match terminal::size() {
            Ok(size) if size != self.size => {
                log::debug!("Terminal resized to {}x{}", size.0, size.1);
                self.size = size;
                // Stale cells from the old layout
                let _ = queue!(self.out, Clear(ClearType::All));
            }
            _ => {}
        }
        Canvas::new(self.size.0, self.size.1)
    }

    pub fn present(&mut self, canvas: &Canvas) -> io::Result<()> {
        for (row, line) in canvas.lines().enumerate() {
            queue!(self.out, MoveTo(0, row as u16), Print(line))?;
        }
        self.out.flush()
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}
