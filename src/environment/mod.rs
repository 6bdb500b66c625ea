//! Runtime environment detection.
//!
//! Determines whether the program runs on the host or inside a container, which
//! decides how handlers see the host root filesystem.
mod checks;
mod detect;
mod error;

pub use detect::{Probe, RuntimeEnvironment, detect_runtime_environment};
pub use error::{Error, Result};
