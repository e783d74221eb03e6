pub mod element;
pub mod pool;
pub mod resource;
pub mod processor;

pub use element::TermElement;
pub use pool::{TermMap, TermPool};
pub use processor::TermProcessor;
pub use resource::TermResource;
