use std::io::{self, Stdout, Write};

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Restores the terminal when dropped, including on early returns and panics.
pub struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// Switches to the alternate screen in raw mode.
pub fn enter() -> Result<(Tui, TuiGuard)> {
    enter_on(io::stdout())
}

fn enter_on<W: Write>(mut out: W) -> Result<(Terminal<CrosstermBackend<W>>, TuiGuard)> {
    enable_raw_mode()?;
    // Any failure from here on drops the guard and leaves raw mode.
    let guard = TuiGuard;
    execute!(out, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let terminal = Terminal::new(CrosstermBackend::new(out))?;
    Ok((terminal, guard))
}
