// Session engine: tick driver, event channels, and the frame source seam

pub mod channels;
pub mod core;
pub mod frame_source;

pub use self::core::{SessionEngine, TickOutcome};
pub use channels::SessionChannels;
pub use frame_source::{FramePoll, FrameSource, ScriptedFrameSource, StaticFrameSource};
