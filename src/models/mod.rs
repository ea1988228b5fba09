mod event;
mod operation;
mod system;

pub use event::*;
pub use operation::*;
pub use system::*;
