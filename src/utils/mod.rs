//! Utility modules
//!
//! Path resolution and logger setup shared by the library and the binary.

pub mod config_paths;
pub mod logger;
