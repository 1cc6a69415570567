//! Error types for machoinfo operations.
//!
//! This module defines the [`enum@Error`] enum covering the hard failures of
//! plist decoding and Mach-O signature extraction. Recoverable anomalies
//! (unsupported object types, detached signatures, bad blob index entries)
//! are not errors: they are logged with `tracing` and decoding continues.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use thiserror::Error;

/// Error type for machoinfo operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Match on variants to handle specific failure cases.
///
/// # Examples
///
/// ```no_run
/// use machoinfo::{Error, Inspector};
///
/// let bytes = std::fs::read("Payload/App.app/App").unwrap();
/// match Inspector::new().inspect_macho(&bytes) {
///     Ok(info) => println!("Signed by {:?}", info.common_name),
///     Err(Error::ResourceLimitExceeded { what, .. }) => eprintln!("Refusing oversized {what}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Only raised by the file-path conveniences on [`crate::Inspector`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Textual property list parsing failed.
    ///
    /// Raised when a buffer without the `bplist` signature is handed to the
    /// XML plist parser and it rejects the input.
    #[error("Plist error: {0}")]
    Plist(#[from] plist::Error),

    /// A declared size exceeded the decoder's resource bound.
    ///
    /// Input is treated as untrusted, so oversized object counts, string
    /// lengths and reference tables abort the whole decode.
    #[error("{what} of {size} exceeds the limit of {limit}")]
    ResourceLimitExceeded {
        /// The quantity that was checked
        what: &'static str,
        /// The size declared by the input
        size: u64,
        /// The configured bound
        limit: u64,
    },

    /// A read ran past the end of the buffer.
    #[error("read of {len} bytes at offset {offset:#x} is out of bounds (buffer is {available} bytes)")]
    Truncated {
        offset: u64,
        len: u64,
        available: usize,
    },

    /// An object reference pointed outside the offset table.
    #[error("object reference {index} is outside the offset table ({num_objects} objects)")]
    InvalidObjectRef { index: u64, num_objects: usize },

    /// A bplist trailer declared an integer width the format does not allow.
    #[error("bplist trailer {field} of {value} is not between 1 and 8")]
    InvalidTrailer { field: &'static str, value: u8 },

    /// Plist nesting went deeper than the configured limit.
    #[error("plist nesting exceeds the depth limit of {limit}")]
    DepthLimitExceeded { limit: usize },

    /// An object referenced itself, directly or through its children.
    #[error("object {index} references itself")]
    CyclicReference { index: usize },

    /// Invalid or unsupported Mach-O structure.
    #[error("Invalid Mach-O: {0}")]
    MachO(String),

    /// PEM armor or CMS structure could not be decoded.
    #[error("CMS error: {0}")]
    Cms(String),

    /// Invalid builder configuration.
    ///
    /// A limit on [`crate::Inspector`] was set to a value decoding cannot work with.
    #[error("Configuration error: {0}")]
    Config(String),
}
