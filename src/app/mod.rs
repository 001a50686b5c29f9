//! Application module
//!
//! Configuration layering, logging setup, and fatal error reporting for the
//! command line front.

pub mod config;
pub mod error_handling;
pub mod logging;

pub use config::{AppConfig, ConfigFile};
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
