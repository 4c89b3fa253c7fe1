pub mod event;
pub mod sink;

pub use event::ProgressEvent;
pub use sink::{ChannelSink, CompositeSink, EventSink, LogFileSink, TracingSink};
