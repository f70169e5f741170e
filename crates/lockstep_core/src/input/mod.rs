//! Input events and the sources that deliver them.

mod handler;
mod source;

pub use handler::{InputEvent, InputHandler};
pub use source::{ChannelInputSource, InputSource, LineInputSource};
