pub mod backend;
pub mod config;
pub mod publish;
pub mod resolution;
pub mod session;

pub use scribe_common::error;
pub use scribe_common::intent;
pub use scribe_common::protocol;
