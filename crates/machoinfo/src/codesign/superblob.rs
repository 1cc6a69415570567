//! SuperBlob parsing for embedded Apple code signatures
//!
//! The SuperBlob is the top-level container for all code signature components.
//! It contains a header followed by an index of blob entries, each pointing
//! to an embedded blob (CodeDirectory, requirements, entitlements, CMS
//! signature, etc.).
//!
//! ## Structure
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ SuperBlob Header (12 bytes)        │
//! │  - magic: 0xfade0cc0 (4 bytes)     │
//! │  - length: total size (4 bytes)    │
//! │  - count: number of blobs (4 bytes)│
//! ├────────────────────────────────────┤
//! │ Index Entry 0 (8 bytes)            │
//! │  - blob_type (4 bytes)             │
//! │  - offset (4 bytes)                │
//! ├────────────────────────────────────┤
//! │ ... more index entries             │
//! ├────────────────────────────────────┤
//! │ Blob 0: magic, length, payload     │
//! ├────────────────────────────────────┤
//! │ ... more blob data                 │
//! └────────────────────────────────────┘
//! ```
//!
//! Every field in this region is big-endian, unlike the little-endian load
//! commands that point at it. Index offsets are relative to the start of the
//! SuperBlob, not the file.

use tracing::{debug, info, warn};

use super::constants::*;
use crate::reader::{ByteReader, Endian, WordStruct};
use crate::{Error, Result};

/// Byte order of every field inside the code signature region.
pub const BLOB_ENDIAN: Endian = Endian::Big;

/// SuperBlob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlobHeader {
    pub magic: u32,
    pub length: u32,
    pub count: u32,
}

impl WordStruct for SuperBlobHeader {
    const WORDS: usize = 3;

    fn from_words(words: &[u32]) -> Self {
        Self {
            magic: words[0],
            length: words[1],
            count: words[2],
        }
    }
}

/// One entry of the SuperBlob index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobIndex {
    /// Slot type, see the `CSSLOT_*` constants.
    pub blob_type: u32,
    /// Offset of the blob from the start of the SuperBlob.
    pub offset: u32,
}

impl WordStruct for BlobIndex {
    const WORDS: usize = 2;

    fn from_words(words: &[u32]) -> Self {
        Self {
            blob_type: words[0],
            offset: words[1],
        }
    }
}

/// Header shared by every blob.
#[derive(Debug, Clone, Copy)]
struct BlobHeader {
    magic: u32,
    length: u32,
}

impl WordStruct for BlobHeader {
    const WORDS: usize = 2;

    fn from_words(words: &[u32]) -> Self {
        Self {
            magic: words[0],
            length: words[1],
        }
    }
}

/// A blob referenced from the SuperBlob index, classified by its magic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blob<'a> {
    /// DER-encoded CMS `SignedData`, blob header stripped.
    Cms(&'a [u8]),
    /// XML entitlements plist text.
    Entitlements(String),
    /// Any blob this crate does not interpret.
    Other { magic: u32 },
}

/// A parsed embedded-signature SuperBlob borrowing the signature region.
#[derive(Debug, Clone)]
pub struct SuperBlob<'a> {
    pub header: SuperBlobHeader,
    pub index: Vec<BlobIndex>,
    reader: ByteReader<'a>,
}

impl<'a> SuperBlob<'a> {
    /// Parse the SuperBlob at the start of `region`.
    ///
    /// Returns `Ok(None)` when the magic is not [`CSMAGIC_EMBEDDED_SIGNATURE`],
    /// which is how detached and ad-hoc signatures present. A `count` above
    /// `max_count` aborts.
    pub fn parse(region: &'a [u8], max_count: usize) -> Result<Option<Self>> {
        let reader = ByteReader::new(region);
        let header: SuperBlobHeader = reader.read_struct(0, BLOB_ENDIAN)?;

        if header.magic != CSMAGIC_EMBEDDED_SIGNATURE {
            info!(
                "signature external to binary (SuperBlob magic {:#010x})",
                header.magic
            );
            return Ok(None);
        }

        if header.count as usize > max_count {
            return Err(Error::ResourceLimitExceeded {
                what: "SuperBlob index count",
                size: u64::from(header.count),
                limit: max_count as u64,
            });
        }

        let mut index = Vec::with_capacity(header.count as usize);
        for i in 0..header.count as usize {
            let offset = SUPERBLOB_HEADER_SIZE + i * BLOB_INDEX_SIZE;
            match reader.read_struct::<BlobIndex>(offset, BLOB_ENDIAN) {
                Ok(entry) => index.push(entry),
                Err(e) => {
                    warn!("SuperBlob index truncated after {} of {} entries: {}", i, header.count, e);
                    break;
                }
            }
        }

        debug!(
            "SuperBlob: length {}, {} index entries",
            header.length,
            index.len()
        );

        Ok(Some(Self {
            header,
            index,
            reader,
        }))
    }

    /// Resolve one index entry to its blob.
    ///
    /// Entries whose header or payload fall outside the region yield `None`.
    pub fn blob(&self, entry: &BlobIndex) -> Option<Blob<'a>> {
        let offset = entry.offset as usize;
        let header: BlobHeader = match self.reader.read_struct(offset, BLOB_ENDIAN) {
            Ok(header) => header,
            Err(e) => {
                warn!("blob index entry {:#x} points outside the signature: {}", entry.blob_type, e);
                return None;
            }
        };

        let length = header.length as usize;
        if length < BLOB_HEADER_SIZE {
            warn!(
                "blob {:#010x} at {:#x} declares length {} shorter than its header",
                header.magic, offset, length
            );
            return None;
        }

        // Payload bounds come from the blob's own length, never the SuperBlob's.
        let payload = match self
            .reader
            .bytes(offset + BLOB_HEADER_SIZE, length - BLOB_HEADER_SIZE)
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!("blob {:#010x} at {:#x} overruns the signature: {}", header.magic, offset, e);
                return None;
            }
        };

        Some(match header.magic {
            CSMAGIC_BLOBWRAPPER => Blob::Cms(payload),
            CSMAGIC_EMBEDDED_ENTITLEMENTS => {
                Blob::Entitlements(String::from_utf8_lossy(payload).into_owned())
            }
            magic => Blob::Other { magic },
        })
    }

    /// All resolvable blobs, in index order.
    pub fn blobs(&self) -> impl Iterator<Item = Blob<'a>> + '_ {
        self.index.iter().filter_map(|entry| self.blob(entry))
    }
}

/// The parts of an embedded signature this crate reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedSignature<'a> {
    /// DER bytes of the CMS signature blob.
    pub cms: Option<&'a [u8]>,
    /// Entitlements plist text.
    pub entitlements: Option<String>,
}

impl<'a> EmbeddedSignature<'a> {
    /// Parse `region` and collect the CMS and entitlements blobs.
    ///
    /// A region without the embedded-signature magic yields an empty result.
    pub fn extract(region: &'a [u8], max_count: usize) -> Result<Self> {
        let mut signature = Self::default();
        let Some(superblob) = SuperBlob::parse(region, max_count)? else {
            return Ok(signature);
        };

        for blob in superblob.blobs() {
            match blob {
                Blob::Cms(der) => {
                    debug!("found CMS blob ({} bytes)", der.len());
                    signature.cms = Some(der);
                }
                Blob::Entitlements(text) => {
                    debug!("found entitlements blob ({} bytes)", text.len());
                    signature.entitlements = Some(text);
                }
                Blob::Other { .. } => {}
            }
        }

        Ok(signature)
    }
}

/// Wrap `payload` in a blob header.
///
/// Inspection never writes signatures; this and [`build_superblob`] exist to
/// assemble fixtures for tests and downstream tooling.
pub fn build_blob(magic: u32, payload: &[u8]) -> Vec<u8> {
    let total_len = (BLOB_HEADER_SIZE + payload.len()) as u32;
    let mut buf = Vec::with_capacity(total_len as usize);

    buf.extend(&magic.to_be_bytes());
    buf.extend(&total_len.to_be_bytes());
    buf.extend(payload);

    buf
}

/// Serialize an embedded-signature SuperBlob from `(slot type, blob)` pairs.
///
/// Blobs are laid out after the index in the order given.
pub fn build_superblob(entries: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let count = entries.len();
    let header_size = SUPERBLOB_HEADER_SIZE + count * BLOB_INDEX_SIZE;
    let total_length = header_size + entries.iter().map(|(_, blob)| blob.len()).sum::<usize>();

    let mut buf = Vec::with_capacity(total_length);
    buf.extend(&CSMAGIC_EMBEDDED_SIGNATURE.to_be_bytes());
    buf.extend(&(total_length as u32).to_be_bytes());
    buf.extend(&(count as u32).to_be_bytes());

    let mut offset = header_size;
    for (slot_type, blob) in entries {
        buf.extend(&slot_type.to_be_bytes());
        buf.extend(&(offset as u32).to_be_bytes());
        offset += blob.len();
    }

    for (_, blob) in entries {
        buf.extend(blob);
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITLEMENTS: &[u8] = b"<plist><dict><key>aps-environment</key><string>production</string></dict></plist>";

    #[test]
    fn test_layout_sizes_match_records() {
        assert_eq!(SUPERBLOB_HEADER_SIZE, SuperBlobHeader::size());
        assert_eq!(BLOB_INDEX_SIZE, BlobIndex::size());
        assert_eq!(BLOB_HEADER_SIZE, BlobHeader::size());
    }

    #[test]
    fn test_superblob_index() {
        let region = build_superblob(&[
            (CSSLOT_CODEDIRECTORY, build_blob(CSMAGIC_CODEDIRECTORY, &[0xab; 20])),
            (CSSLOT_ENTITLEMENTS, build_blob(CSMAGIC_EMBEDDED_ENTITLEMENTS, ENTITLEMENTS)),
        ]);

        let superblob = SuperBlob::parse(&region, 32768).unwrap().unwrap();
        assert_eq!(superblob.header.count, 2);
        assert_eq!(superblob.header.length as usize, region.len());
        assert_eq!(
            superblob.index,
            vec![
                BlobIndex { blob_type: CSSLOT_CODEDIRECTORY, offset: 28 },
                BlobIndex { blob_type: CSSLOT_ENTITLEMENTS, offset: 56 },
            ]
        );
    }

    #[test]
    fn test_blob_dispatch() {
        let region = build_superblob(&[
            (CSSLOT_REQUIREMENTS, build_blob(CSMAGIC_REQUIREMENTS, &[0, 0, 0, 0])),
            (CSSLOT_ENTITLEMENTS, build_blob(CSMAGIC_EMBEDDED_ENTITLEMENTS, ENTITLEMENTS)),
            (CSSLOT_SIGNATURESLOT, build_blob(CSMAGIC_BLOBWRAPPER, &[0x30, 0x03, 1, 2, 3])),
        ]);

        let superblob = SuperBlob::parse(&region, 32768).unwrap().unwrap();
        let blobs: Vec<Blob> = superblob.blobs().collect();
        assert_eq!(
            blobs,
            vec![
                Blob::Other { magic: CSMAGIC_REQUIREMENTS },
                Blob::Entitlements(String::from_utf8(ENTITLEMENTS.to_vec()).unwrap()),
                Blob::Cms(&[0x30, 0x03, 1, 2, 3]),
            ]
        );
    }

    #[test]
    fn test_little_endian_magic_is_external() {
        let mut region = build_superblob(&[]);
        region[..4].copy_from_slice(&CSMAGIC_EMBEDDED_SIGNATURE.to_le_bytes());
        assert!(SuperBlob::parse(&region, 32768).unwrap().is_none());

        let signature = EmbeddedSignature::extract(&region, 32768).unwrap();
        assert_eq!(signature, EmbeddedSignature::default());
    }

    #[test]
    fn test_detached_magic_is_external() {
        let mut region = build_superblob(&[]);
        region[..4].copy_from_slice(&CSMAGIC_DETACHED_SIGNATURE.to_be_bytes());
        assert!(SuperBlob::parse(&region, 32768).unwrap().is_none());
    }

    #[test]
    fn test_index_count_limit() {
        let mut region = build_superblob(&[]);
        region[8..12].copy_from_slice(&40000u32.to_be_bytes());
        assert!(matches!(
            SuperBlob::parse(&region, 32768),
            Err(Error::ResourceLimitExceeded { what: "SuperBlob index count", .. })
        ));
    }

    #[test]
    fn test_truncated_index_is_soft() {
        let mut region = build_superblob(&[(
            CSSLOT_ENTITLEMENTS,
            build_blob(CSMAGIC_EMBEDDED_ENTITLEMENTS, b"x"),
        )]);
        // Claim more entries than fit; the real one still resolves.
        region[8..12].copy_from_slice(&100u32.to_be_bytes());
        let superblob = SuperBlob::parse(&region, 32768).unwrap().unwrap();
        assert!(superblob.index.len() < 100);
        assert!(superblob
            .blobs()
            .any(|blob| blob == Blob::Entitlements("x".into())));
    }

    #[test]
    fn test_blob_uses_its_own_length() {
        let cms = build_blob(CSMAGIC_BLOBWRAPPER, &[1, 2, 3, 4]);
        let mut region = build_superblob(&[(CSSLOT_SIGNATURESLOT, cms)]);
        // Trailing padding after the blob must not leak into the payload.
        region.extend([0xee; 16]);

        let signature = EmbeddedSignature::extract(&region, 32768).unwrap();
        assert_eq!(signature.cms, Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_overrunning_blob_is_skipped() {
        let mut region = build_superblob(&[
            (CSSLOT_SIGNATURESLOT, build_blob(CSMAGIC_BLOBWRAPPER, &[1, 2, 3, 4])),
            (CSSLOT_ENTITLEMENTS, build_blob(CSMAGIC_EMBEDDED_ENTITLEMENTS, b"ok")),
        ]);
        // First blob starts at 12 + 2 * 8 = 28; inflate its length.
        region[32..36].copy_from_slice(&0x1000u32.to_be_bytes());

        let signature = EmbeddedSignature::extract(&region, 32768).unwrap();
        assert_eq!(signature.cms, None);
        assert_eq!(signature.entitlements.as_deref(), Some("ok"));
    }

    #[test]
    fn test_short_region_is_truncated() {
        assert!(matches!(
            SuperBlob::parse(&[0xfa, 0xde], 32768),
            Err(Error::Truncated { .. })
        ));
    }
}
