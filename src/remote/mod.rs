pub mod handler;
pub mod pool;

pub use handler::{RemoteConfig, RemoteHandler, RemoteProvider};
pub use pool::RemoteHandlerPool;
