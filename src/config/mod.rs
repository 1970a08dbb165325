//! Configuration loading and logging setup.

mod logging;
mod settings;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use settings::{Config, CorporaConfig, LoadConfig, QueryConfig, XrefConfig};
