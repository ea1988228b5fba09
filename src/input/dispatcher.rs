use crate::errors::TerminalError;

use super::{KeyInput, TerminalDriver};

/// Dashboard commands, one per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    StartPipeline,
    DownloadOnly,
    TrainOnly,
    UploadOnly,
    TogglePause,
    Refresh,
    Help,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::StartPipeline,
        Command::DownloadOnly,
        Command::TrainOnly,
        Command::UploadOnly,
        Command::TogglePause,
        Command::Refresh,
        Command::Help,
        Command::Quit,
    ];

    /// Case-insensitive key lookup.
    pub fn from_key(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(Command::Quit),
            's' => Some(Command::StartPipeline),
            'd' => Some(Command::DownloadOnly),
            't' => Some(Command::TrainOnly),
            'u' => Some(Command::UploadOnly),
            'p' => Some(Command::TogglePause),
            'r' => Some(Command::Refresh),
            'h' => Some(Command::Help),
            _ => None,
        }
    }

    pub fn key(&self) -> char {
        match self {
            Command::Quit => 'q',
            Command::StartPipeline => 's',
            Command::DownloadOnly => 'd',
            Command::TrainOnly => 't',
            Command::UploadOnly => 'u',
            Command::TogglePause => 'p',
            Command::Refresh => 'r',
            Command::Help => 'h',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Quit => "Quit",
            Command::StartPipeline => "Start full pipeline",
            Command::DownloadOnly => "Download datasets",
            Command::TrainOnly => "Train model",
            Command::UploadOnly => "Upload predictions",
            Command::TogglePause => "Pause / resume",
            Command::Refresh => "Force redraw",
            Command::Help => "Toggle this help",
        }
    }
}

/// What one key press means to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Unknown(char),
    Resize,
}

/// Polls the terminal driver once per tick and maps keys to commands.
///
/// Until raw mode is enabled the dispatcher reports no input, so a
/// terminal without raw mode degrades to a render-only dashboard.
pub struct InputDispatcher {
    driver: Box<dyn TerminalDriver>,
    enabled: bool,
}

impl InputDispatcher {
    pub fn new(driver: Box<dyn TerminalDriver>) -> Self {
        Self {
            driver,
            enabled: false,
        }
    }

    pub fn enable(&mut self) -> Result<(), TerminalError> {
        self.driver.enable_raw_mode()?;
        self.enabled = true;
        Ok(())
    }

    pub fn disable(&mut self) {
        if self.enabled {
            self.driver.disable_raw_mode();
            self.enabled = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Next raw key, never blocking. Read errors are logged and dropped.
    pub fn try_read_key(&mut self) -> Option<KeyInput> {
        if !self.enabled {
            return None;
        }
        match self.driver.read_key_nonblocking() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "keyboard read failed");
                None
            }
        }
    }

    pub fn try_next(&mut self) -> Option<Input> {
        let input = match self.try_read_key()? {
            KeyInput::CtrlC => Input::Command(Command::Quit),
            KeyInput::Resize => Input::Resize,
            KeyInput::Char(c) => match Command::from_key(c) {
                Some(cmd) => Input::Command(cmd),
                None => Input::Unknown(c),
            },
        };
        Some(input)
    }
}

impl Drop for InputDispatcher {
    fn drop(&mut self) {
        self.disable();
    }
}
