//! The enhancement pipeline and its file ingestion helpers.
//!
//! - **processor**: Orchestrates classify → enhance → evaluate
//! - **validate**: Pre-decode checks on files (existence, size, magic bytes)
//! - **decode**: Load and decode images, normalizing to 8-bit samples
//! - **hash**: BLAKE3 content hashes of source files
//! - **discovery**: Find image files in directories

pub mod decode;
pub mod discovery;
pub mod hash;
pub mod processor;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::{content_hash, content_hash_from_bytes};
pub use processor::{Pipeline, RunOptions};
pub use validate::Validator;
