//! Generic value tree produced by the binary plist decoder.

use std::collections::BTreeMap;

/// Dictionary of decoded plist values keyed by the rendered key object.
pub type Dictionary = BTreeMap<String, BplistValue>;

/// A decoded binary plist object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BplistValue {
    /// `null`, fill bytes and object types the decoder does not support.
    Null,
    Bool(bool),
    /// Unsigned integer. Encodings wider than 8 bytes keep their low 64 bits.
    UInt(u64),
    String(String),
    Array(Vec<BplistValue>),
    Dict(Dictionary),
}

impl BplistValue {
    /// Look up `key` when this value is a dictionary.
    pub fn get(&self, key: &str) -> Option<&BplistValue> {
        self.as_dict().and_then(|dict| dict.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BplistValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BplistValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            BplistValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[BplistValue]> {
        match self {
            BplistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            BplistValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BplistValue::Null)
    }

    /// Render a scalar as a dictionary key.
    ///
    /// Containers cannot be keys and yield `None`.
    pub fn to_key(&self) -> Option<String> {
        match self {
            BplistValue::Null => Some("null".to_string()),
            BplistValue::Bool(b) => Some(b.to_string()),
            BplistValue::UInt(v) => Some(v.to_string()),
            BplistValue::String(s) => Some(s.clone()),
            BplistValue::Array(_) | BplistValue::Dict(_) => None,
        }
    }
}
