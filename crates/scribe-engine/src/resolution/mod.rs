pub mod catalog;
pub mod resolver;
pub mod result;

pub use catalog::{EditorIntent, IntentCatalog};
pub use resolver::ActionResolver;
pub use result::ResolutionError;
