//! Keyboard input and terminal ownership.
//!
//! Keys are read one at a time without blocking, so the tick loop keeps
//! rendering while no key is pressed.

mod dispatcher;
mod terminal;

pub use dispatcher::{Command, Input, InputDispatcher};
pub use terminal::{CrosstermDriver, KeyInput, TerminalDriver, TerminalGuard};

#[cfg(test)]
pub(crate) use dispatcher::tests::ScriptedDriver;
