pub mod config;
pub mod session;

pub use config::Config;
pub use session::{captions, resolve, watch, ResolveReport, WatchOptions};
