pub mod backend;
pub mod cdp;
pub mod inject;
pub mod lookup;

pub use backend::HeadlessBackend;
