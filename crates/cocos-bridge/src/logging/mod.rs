//! Logging setup.
//!
//! The library itself only emits through the `log` facade. Binaries and
//! demos call [`init_logging`] once at startup to install `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
