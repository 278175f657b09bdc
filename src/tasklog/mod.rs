pub mod event;
pub mod logger;

pub use event::{ChannelSink, TaskEvent, TaskSink, TaskStatus};
pub use logger::TaskLogger;
