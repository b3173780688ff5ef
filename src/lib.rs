pub mod core;
pub mod document;
pub mod invoice;
pub mod utils;

// Re-exports
pub use crate::core::config::PatcherConfig;
pub use crate::core::error::PatchError;
pub use crate::core::types::{CarrierSelection, FieldKind, PatchStats, Strategy};
pub use document::Document;
pub use invoice::Engine;
