pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
pub use scribe_common::config::*;
