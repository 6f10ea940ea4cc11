pub mod hub;
pub mod reference;
pub mod registry;
pub mod resolver;

pub use hub::{HfHub, ModelHub};
pub use reference::ModelReference;
pub use registry::{CachedModel, ModelRegistry};
pub use resolver::AssetResolver;
