mod draw;
pub mod frame;
pub mod theme;
mod throttle;

pub use draw::draw;
pub use frame::{build_frame, FrameInput, RenderedFrame};
pub use theme::Theme;
pub use throttle::RenderThrottle;
