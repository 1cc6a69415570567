//! Embedded code signature structures for iOS/macOS binaries

pub mod constants;
pub mod superblob;

pub use superblob::{Blob, EmbeddedSignature, SuperBlob};
