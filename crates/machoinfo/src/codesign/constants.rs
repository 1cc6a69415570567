//! Apple code signing magic numbers and slot types
//!
//! Values match `cs_blobs.h` from xnu. Everything inside the code signature
//! is stored big-endian.

// =============================================================================
// Blob Magic Numbers
// =============================================================================

/// SuperBlob containing all signature components (embedded signature)
pub const CSMAGIC_EMBEDDED_SIGNATURE: u32 = 0xfade0cc0;

/// Detached signature magic
pub const CSMAGIC_DETACHED_SIGNATURE: u32 = 0xfade0cc1;

/// CodeDirectory blob magic
pub const CSMAGIC_CODEDIRECTORY: u32 = 0xfade0c02;

/// Requirements blob magic
pub const CSMAGIC_REQUIREMENTS: u32 = 0xfade0c01;

/// Embedded entitlements (XML plist format)
pub const CSMAGIC_EMBEDDED_ENTITLEMENTS: u32 = 0xfade7171;

/// CMS signature wrapper blob
pub const CSMAGIC_BLOBWRAPPER: u32 = 0xfade0b01;

// =============================================================================
// Slot Types (for SuperBlob index)
// =============================================================================

/// Main code directory slot
pub const CSSLOT_CODEDIRECTORY: u32 = 0x0000;

/// Code requirements slot
pub const CSSLOT_REQUIREMENTS: u32 = 0x0002;

/// Entitlements slot (XML format)
pub const CSSLOT_ENTITLEMENTS: u32 = 0x0005;

/// CMS signature slot
pub const CSSLOT_SIGNATURESLOT: u32 = 0x10000;

// =============================================================================
// Layout
// =============================================================================

/// SuperBlob header: magic + length + count
pub const SUPERBLOB_HEADER_SIZE: usize = 12;

/// Index entry: type + offset
pub const BLOB_INDEX_SIZE: usize = 8;

/// Generic blob header: magic + length
pub const BLOB_HEADER_SIZE: usize = 8;
