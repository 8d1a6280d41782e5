mod errors;
mod registry;
mod types;

pub use errors::EmbodimentError;
pub use registry::EmbodimentRegistry;
pub use types::EmbodimentDescriptor;
