use std::io::{self, Stdout};

use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::Result;

/// Owns the terminal for the lifetime of a session: raw mode, the alternate
/// screen and optional mouse capture.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mouse_enabled: bool,
}

impl Tui {
    pub fn new(enable_mouse: bool) -> Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        if enable_mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            mouse_enabled: enable_mouse,
        })
    }

    /// Hand the terminal back to the shell.
    pub fn restore(&mut self) -> Result<()> {
        if self.mouse_enabled {
            execute!(self.terminal.backend_mut(), DisableMouseCapture)?;
        }
        terminal::disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

/// Restore the terminal before the default hook prints a panic, so the
/// message is readable.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let mut stdout = io::stdout();
        let _ = terminal::disable_raw_mode();
        let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen, cursor::Show);
        tracing::error!(%panic_info, "panic");
        original_hook(panic_info);
    }));
}
