//! Binary property list (`bplist00`) decoder
//!
//! A binary plist is laid out as four segments:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header: "bplist" + 2-byte version    │
//! ├──────────────────────────────────────┤
//! │ Object table: marker-tagged records  │
//! ├──────────────────────────────────────┤
//! │ Offset table: one offset per object  │
//! ├──────────────────────────────────────┤
//! │ Trailer (last 32 bytes)              │
//! │  - offset int size   @ 6             │
//! │  - object ref size   @ 7             │
//! │  - object count      @ 8  (u64 BE)   │
//! │  - top object        @ 16 (u64 BE)   │
//! │  - offset table      @ 24 (u64 BE)   │
//! └──────────────────────────────────────┘
//! ```
//!
//! Objects refer to each other by index into the offset table, so decoding
//! walks the table like an arena. The object count, every declared length and
//! the nesting depth are bounded before any allocation they would drive.

use tracing::{debug, warn};

use super::value::{BplistValue, Dictionary};
use crate::reader::{ByteReader, Endian};
use crate::{Error, Result};

/// Signature at the start of every binary plist.
pub const BPLIST_MAGIC: &[u8] = b"bplist";

/// Size of the trailer at the end of the buffer.
pub const TRAILER_SIZE: usize = 32;

/// Upper bound on object counts, byte lengths and reference table sizes.
pub const MAX_OBJECTS: usize = 32768;

/// Default bound on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default bound on the number of objects materialized by one decode.
pub const DEFAULT_MAX_NODES: usize = 1 << 20;

// Marker type tags (high nibble)
const TAG_SIMPLE: u8 = 0x0;
const TAG_UINT: u8 = 0x1;
const TAG_ASCII_STRING: u8 = 0x5;
const TAG_UTF16_STRING: u8 = 0x6;
const TAG_ARRAY: u8 = 0xa;
const TAG_DICT: u8 = 0xd;

/// Low nibble meaning "length follows as a nested integer".
const EXTENDED_LENGTH: u8 = 0xf;

/// Widest integer the format encodes (`0x14`, 16 bytes).
const MAX_INT_WIDTH: usize = 16;

/// Widest offset or object reference a trailer may declare.
const MAX_TRAILER_INT_SIZE: u8 = 8;

/// Resource bounds applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Bound on the object count and on every declared byte/element length.
    pub max_objects: usize,
    /// Bound on container nesting.
    pub max_depth: usize,
    /// Bound on decoded objects, counting shared objects once per use.
    pub max_nodes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_objects: MAX_OBJECTS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// The fixed 32-byte bplist trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub offset_int_size: u8,
    pub object_ref_size: u8,
    pub num_objects: u64,
    pub top_object: u64,
    pub offset_table_offset: u64,
}

impl Trailer {
    /// Read the trailer from the last [`TRAILER_SIZE`] bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let start = data.len().checked_sub(TRAILER_SIZE).ok_or(Error::Truncated {
            offset: 0,
            len: TRAILER_SIZE as u64,
            available: data.len(),
        })?;
        let trailer = ByteReader::new(&data[start..]);

        Ok(Self {
            offset_int_size: trailer.read_u8(6)?,
            object_ref_size: trailer.read_u8(7)?,
            num_objects: trailer.read_u64(8, Endian::Big)?,
            top_object: trailer.read_u64(16, Endian::Big)?,
            offset_table_offset: trailer.read_u64(24, Endian::Big)?,
        })
    }

    /// Reject offset and reference widths outside `1..=8`.
    ///
    /// A zero reference width would make every reference table zero bytes
    /// long whatever its element count.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("offset int size", self.offset_int_size),
            ("object ref size", self.object_ref_size),
        ] {
            if value == 0 || value > MAX_TRAILER_INT_SIZE {
                return Err(Error::InvalidTrailer { field, value });
            }
        }
        Ok(())
    }
}

/// Decoder over one binary plist buffer.
pub struct BplistDecoder<'a> {
    reader: ByteReader<'a>,
    trailer: Trailer,
    offsets: Vec<usize>,
    limits: DecodeLimits,
    in_progress: Vec<bool>,
    nodes: usize,
}

impl<'a> BplistDecoder<'a> {
    /// Decode `data` with the default [`DecodeLimits`].
    pub fn decode(data: &[u8]) -> Result<BplistValue> {
        Self::decode_with_limits(data, DecodeLimits::default())
    }

    /// Decode `data`, starting from the trailer's top object.
    pub fn decode_with_limits(data: &[u8], limits: DecodeLimits) -> Result<BplistValue> {
        let mut decoder = BplistDecoder::new(data, limits)?;
        decoder.decode_top()
    }

    /// Parse the trailer and build the offset table.
    ///
    /// The object count is checked against `limits.max_objects` before the
    /// table is allocated.
    pub fn new(data: &'a [u8], limits: DecodeLimits) -> Result<Self> {
        let trailer = Trailer::parse(data)?;
        trailer.validate()?;
        check_limit("object count", trailer.num_objects, limits.max_objects)?;
        let num_objects = trailer.num_objects as usize;

        debug!(
            "bplist: {} objects, offset table at {:#x}",
            num_objects, trailer.offset_table_offset
        );

        let reader = ByteReader::new(data);
        let width = usize::from(trailer.offset_int_size);
        let table = to_offset(trailer.offset_table_offset, data.len())?;

        let mut offsets = Vec::with_capacity(num_objects);
        for i in 0..num_objects {
            let entry = offset_add(table, i * width, data.len())?;
            let offset = reader.read_uint_be(entry, width)?;
            offsets.push(to_offset(offset, data.len())?);
        }

        Ok(Self {
            reader,
            trailer,
            offsets,
            limits,
            in_progress: vec![false; num_objects],
            nodes: 0,
        })
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn offset_table(&self) -> &[usize] {
        &self.offsets
    }

    /// Decode the object named by the trailer's top-object index.
    pub fn decode_top(&mut self) -> Result<BplistValue> {
        let top = self.trailer.top_object;
        self.parse_object(top)
    }

    /// Decode the object at offset-table index `index` and everything it references.
    pub fn parse_object(&mut self, index: u64) -> Result<BplistValue> {
        self.parse_object_at_depth(index, 0)
    }

    fn parse_object_at_depth(&mut self, index: u64, depth: usize) -> Result<BplistValue> {
        if depth > self.limits.max_depth {
            return Err(Error::DepthLimitExceeded {
                limit: self.limits.max_depth,
            });
        }

        let slot = usize::try_from(index)
            .ok()
            .filter(|&slot| slot < self.offsets.len())
            .ok_or(Error::InvalidObjectRef {
                index,
                num_objects: self.offsets.len(),
            })?;

        if self.in_progress[slot] {
            return Err(Error::CyclicReference { index: slot });
        }

        self.nodes += 1;
        check_limit("decoded object count", self.nodes as u64, self.limits.max_nodes)?;

        let offset = self.offsets[slot];
        self.in_progress[slot] = true;
        let value = self.parse_record(offset, depth);
        self.in_progress[slot] = false;
        value
    }

    fn parse_record(&mut self, offset: usize, depth: usize) -> Result<BplistValue> {
        let marker = self.reader.read_u8(offset)?;
        let tag = marker >> 4;
        let info = marker & 0x0f;

        match tag {
            TAG_SIMPLE => Ok(parse_simple(info)),
            TAG_UINT => self.parse_uint(offset, info),
            TAG_ASCII_STRING => self.parse_ascii_string(offset, info),
            TAG_UTF16_STRING => self.parse_utf16_string(offset, info),
            TAG_ARRAY => self.parse_array(offset, info, depth),
            TAG_DICT => self.parse_dict(offset, info, depth),
            _ => {
                warn!("unsupported bplist object type {marker:#04x} at offset {offset:#x}");
                Ok(BplistValue::Null)
            }
        }
    }

    fn parse_uint(&self, offset: usize, info: u8) -> Result<BplistValue> {
        let width = int_width(info)?;
        let value = self.reader.read_uint_be(offset + 1, width)?;
        Ok(BplistValue::UInt(value))
    }

    fn parse_ascii_string(&self, offset: usize, info: u8) -> Result<BplistValue> {
        let (len, start) = self.read_length(offset, info)?;
        check_limit("string length", len, self.limits.max_objects)?;
        let bytes = self.reader.bytes(start, len as usize)?;
        Ok(BplistValue::String(String::from_utf8_lossy(bytes).into_owned()))
    }

    fn parse_utf16_string(&self, offset: usize, info: u8) -> Result<BplistValue> {
        let (len, start) = self.read_length(offset, info)?;
        let byte_len = len.saturating_mul(2);
        check_limit("string length", byte_len, self.limits.max_objects)?;
        let bytes = self.reader.bytes(start, byte_len as usize)?;

        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        let text = char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        Ok(BplistValue::String(text))
    }

    fn parse_array(&mut self, offset: usize, info: u8, depth: usize) -> Result<BplistValue> {
        let (len, start) = self.read_length(offset, info)?;
        check_limit("array length", len, self.limits.max_objects)?;
        let ref_size = usize::from(self.trailer.object_ref_size);
        check_limit(
            "array reference table",
            len.saturating_mul(ref_size as u64),
            self.limits.max_objects,
        )?;

        let len = len as usize;
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let index = self.reader.read_uint_be(start + i * ref_size, ref_size)?;
            items.push(self.parse_object_at_depth(index, depth + 1)?);
        }
        Ok(BplistValue::Array(items))
    }

    fn parse_dict(&mut self, offset: usize, info: u8, depth: usize) -> Result<BplistValue> {
        let (len, start) = self.read_length(offset, info)?;
        check_limit("dictionary length", len, self.limits.max_objects)?;
        let ref_size = usize::from(self.trailer.object_ref_size);
        check_limit(
            "dictionary reference table",
            len.saturating_mul(2).saturating_mul(ref_size as u64),
            self.limits.max_objects,
        )?;

        let len = len as usize;
        let values_start = start + len * ref_size;
        let mut dict = Dictionary::new();
        for i in 0..len {
            let key_index = self.reader.read_uint_be(start + i * ref_size, ref_size)?;
            let value_index = self.reader.read_uint_be(values_start + i * ref_size, ref_size)?;

            let key = self.parse_object_at_depth(key_index, depth + 1)?;
            let value = self.parse_object_at_depth(value_index, depth + 1)?;

            match key.to_key() {
                Some(key) => {
                    dict.insert(key, value);
                }
                None => warn!("skipping dictionary entry with a container key at offset {offset:#x}"),
            }
        }
        Ok(BplistValue::Dict(dict))
    }

    /// Resolve the shared length convention of strings, arrays and dictionaries.
    ///
    /// Returns the declared length and the offset where the payload starts.
    fn read_length(&self, offset: usize, info: u8) -> Result<(u64, usize)> {
        if info != EXTENDED_LENGTH {
            return Ok((u64::from(info), offset + 1));
        }

        let nested = self.reader.read_u8(offset + 1)?;
        if nested >> 4 != TAG_UINT {
            warn!("unexpected length integer type {nested:#04x} at offset {offset:#x}");
        }
        let width = int_width(nested & 0x0f)?;
        let len = self.reader.read_uint_be(offset + 2, width)?;
        Ok((len, offset + 2 + width))
    }
}

fn parse_simple(info: u8) -> BplistValue {
    match info {
        0x8 => BplistValue::Bool(false),
        0x9 => BplistValue::Bool(true),
        _ => BplistValue::Null,
    }
}

/// Byte width `2^info` of an integer record, capped at [`MAX_INT_WIDTH`].
fn int_width(info: u8) -> Result<usize> {
    let width = 1usize << info;
    check_limit("integer width", width as u64, MAX_INT_WIDTH)?;
    Ok(width)
}

fn check_limit(what: &'static str, size: u64, limit: usize) -> Result<()> {
    if size > limit as u64 {
        return Err(Error::ResourceLimitExceeded {
            what,
            size,
            limit: limit as u64,
        });
    }
    Ok(())
}

fn to_offset(value: u64, available: usize) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::Truncated {
        offset: value,
        len: 0,
        available,
    })
}

fn offset_add(base: usize, delta: usize, available: usize) -> Result<usize> {
    base.checked_add(delta).ok_or(Error::Truncated {
        offset: base as u64,
        len: delta as u64,
        available,
    })
}
