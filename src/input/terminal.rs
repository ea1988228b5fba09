use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::errors::TerminalError;

/// A single key read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    /// Ctrl+C arrives as a key in raw mode instead of a signal.
    CtrlC,
    Resize,
}

/// Raw-mode keyboard access. Swappable so the controller can be driven by
/// scripted keys in tests.
pub trait TerminalDriver: Send {
    fn enable_raw_mode(&mut self) -> Result<(), TerminalError>;
    fn disable_raw_mode(&mut self);
    /// Return the next pending key, or `None` immediately if there is none.
    fn read_key_nonblocking(&mut self) -> io::Result<Option<KeyInput>>;
}

/// Keyboard driver backed by crossterm's event queue.
#[derive(Debug, Default)]
pub struct CrosstermDriver;

impl TerminalDriver for CrosstermDriver {
    fn enable_raw_mode(&mut self) -> Result<(), TerminalError> {
        terminal::enable_raw_mode().map_err(TerminalError::Unavailable)
    }

    fn disable_raw_mode(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!(error = %e, "failed to disable raw mode");
        }
    }

    fn read_key_nonblocking(&mut self) -> io::Result<Option<KeyInput>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        let input = match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(KeyInput::CtrlC)
                }
                KeyCode::Char(c) => Some(KeyInput::Char(c)),
                _ => None,
            },
            Event::Resize(..) => Some(KeyInput::Resize),
            _ => None,
        };
        Ok(input)
    }
}

pub type DashTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Owns the alternate screen for the lifetime of the dashboard.
///
/// Dropping the guard restores the terminal (raw mode off, cursor shown,
/// main screen back) on every exit path, including early returns.
pub struct TerminalGuard {
    terminal: DashTerminal,
    restored: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self, TerminalError> {
        let terminal = enter_screen(io::stdout, |stdout| {
            let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
            terminal.clear()?;
            Ok(terminal)
        })?;
        Ok(Self {
            terminal,
            restored: false,
        })
    }

    pub fn terminal_mut(&mut self) -> &mut DashTerminal {
        &mut self.terminal
    }

    /// Put the terminal back. Safe to call more than once.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        // No-op when raw mode was never enabled.
        let _ = terminal::disable_raw_mode();
        if let Err(e) = execute!(
            self.terminal.backend_mut(),
            terminal::LeaveAlternateScreen,
            cursor::Show
        ) {
            tracing::warn!(error = %e, "failed to restore terminal");
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Switch to the alternate screen and hand the writer to `build`.
///
/// If any step fails the screen is left again and the cursor shown before
/// the error is returned, so a failed start never strands the user.
fn enter_screen<W, T>(
    mut open: impl FnMut() -> W,
    build: impl FnOnce(W) -> io::Result<T>,
) -> Result<T, TerminalError>
where
    W: Write,
{
    let mut out = open();
    let entered = execute!(out, terminal::EnterAlternateScreen, cursor::Hide);
    let result = match entered {
        Ok(()) => build(out),
        Err(e) => Err(e),
    };
    result.map_err(|e| {
        let mut out = open();
        if let Err(restore_err) = execute!(out, terminal::LeaveAlternateScreen, cursor::Show) {
            tracing::warn!(error = %restore_err, "failed to restore terminal after init error");
        }
        TerminalError::FatalInit(e)
    })
}
