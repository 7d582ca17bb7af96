//! Configuration, paths, and logging bootstrap for the Tether services.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, StoreBackend, DEFAULT_CODE_TTL_SECS, DEFAULT_LOG_LEVEL};
pub use error::{ConfigError, ConfigResult};
pub use logging::init_logging;
pub use paths::Paths;
