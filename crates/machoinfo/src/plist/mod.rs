//! Property list decoding for Info.plist buffers
//!
//! Binary plists are decoded by [`BplistDecoder`]. Anything without the
//! `bplist` signature is handed, unchanged, to the `plist` crate's XML reader.

pub mod binary;
pub mod value;

use std::io::Cursor;

use tracing::debug;

pub use binary::{BplistDecoder, DecodeLimits, Trailer, BPLIST_MAGIC, MAX_OBJECTS};
pub use value::{BplistValue, Dictionary};

use crate::Result;

/// A decoded property list, in whichever representation produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Plist {
    /// Decoded by [`BplistDecoder`].
    Binary(BplistValue),
    /// Decoded by the textual plist parser.
    Text(plist::Value),
}

impl Plist {
    /// Follow `path` through nested dictionaries and return the string there.
    pub fn string_at(&self, path: &[&str]) -> Option<&str> {
        match self {
            Plist::Binary(value) => binary_at(value, path)?.as_str(),
            Plist::Text(value) => text_at(value, path)?.as_string(),
        }
    }

    /// Follow `path` and return the array of strings there.
    ///
    /// Non-string elements are skipped.
    pub fn strings_at(&self, path: &[&str]) -> Option<Vec<&str>> {
        match self {
            Plist::Binary(value) => Some(
                binary_at(value, path)?
                    .as_array()?
                    .iter()
                    .filter_map(BplistValue::as_str)
                    .collect(),
            ),
            Plist::Text(value) => Some(
                text_at(value, path)?
                    .as_array()?
                    .iter()
                    .filter_map(plist::Value::as_string)
                    .collect(),
            ),
        }
    }
}

fn binary_at<'v>(value: &'v BplistValue, path: &[&str]) -> Option<&'v BplistValue> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

fn text_at<'v>(value: &'v plist::Value, path: &[&str]) -> Option<&'v plist::Value> {
    path.iter()
        .try_fold(value, |node, key| node.as_dictionary()?.get(key))
}

/// Decode a property list buffer.
///
/// The decision is made on the first six bytes: `bplist` selects the binary
/// decoder, anything else is parsed as an XML plist.
pub fn decode_plist(data: &[u8], limits: DecodeLimits) -> Result<Plist> {
    if data.starts_with(BPLIST_MAGIC) {
        let value = BplistDecoder::decode_with_limits(data, limits)?;
        return Ok(Plist::Binary(value));
    }

    debug!("no bplist signature, falling back to the XML plist parser");
    let value = plist::Value::from_reader_xml(Cursor::new(data))?;
    Ok(Plist::Text(value))
}
