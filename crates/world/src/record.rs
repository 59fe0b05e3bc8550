//! Keyed record format used to persist pieces and structure starts.
//!
//! A [`Record`] is an ordered map of string keys to typed [`Tag`] values.
//! Typed getters return [`DecodeError`] instead of panicking so corrupt saves
//! surface as errors for the caller to isolate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use structgen_core::{BoundingBox, ParseEnumError};
use thiserror::Error;

/// Errors raised while decoding persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{key}` is not a {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("unknown piece id `{0}`")]
    UnknownPiece(String),
    #[error("unknown structure id `{0}`")]
    UnknownStructure(String),
    #[error(transparent)]
    InvalidEnum(#[from] ParseEnumError),
    #[error("field `{key}` holds {len} ints, expected 6")]
    InvalidBoundingBox { key: String, len: usize },
    #[error("field `{key}` is out of range: {value}")]
    OutOfRange { key: String, value: i64 },
    #[error("structure start `{0}` has no pieces")]
    EmptyStart(String),
}

/// One typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    Byte(i8),
    Int(i32),
    Long(i64),
    String(String),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<Tag>),
    Compound(Record),
}

/// String-keyed map of tags with deterministic key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    entries: BTreeMap<String, Tag>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw tag lookup.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: &str, tag: Tag) {
        self.entries.insert(key.to_string(), tag);
    }

    pub fn put_bool(&mut self, key: &str, value: bool) {
        self.put(key, Tag::Byte(value as i8));
    }

    pub fn put_int(&mut self, key: &str, value: i32) {
        self.put(key, Tag::Int(value));
    }

    pub fn put_long(&mut self, key: &str, value: i64) {
        self.put(key, Tag::Long(value));
    }

    pub fn put_string(&mut self, key: &str, value: &str) {
        self.put(key, Tag::String(value.to_string()));
    }

    pub fn put_int_array(&mut self, key: &str, value: Vec<i32>) {
        self.put(key, Tag::IntArray(value));
    }

    pub fn put_long_array(&mut self, key: &str, value: Vec<i64>) {
        self.put(key, Tag::LongArray(value));
    }

    pub fn put_list(&mut self, key: &str, value: Vec<Tag>) {
        self.put(key, Tag::List(value));
    }

    pub fn put_compound(&mut self, key: &str, value: Record) {
        self.put(key, Tag::Compound(value));
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn put_bounding_box(&mut self, key: &str, bb: &BoundingBox) {
        self.put_int_array(key, bb.to_array().to_vec());
    }

    fn require(&self, key: &str) -> Result<&Tag, DecodeError> {
        self.entries
            .get(key)
            .ok_or_else(|| DecodeError::MissingField(key.to_string()))
    }

    fn wrong_type(key: &str, expected: &'static str) -> DecodeError {
        DecodeError::WrongType {
            key: key.to_string(),
            expected,
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, DecodeError> {
        match self.require(key)? {
            Tag::Byte(value) => Ok(*value != 0),
            _ => Err(Self::wrong_type(key, "byte")),
        }
    }

    /// Boolean that defaults to `false` when absent.
    pub fn get_bool_or_false(&self, key: &str) -> Result<bool, DecodeError> {
        if self.contains(key) {
            self.get_bool(key)
        } else {
            Ok(false)
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i32, DecodeError> {
        match self.require(key)? {
            Tag::Int(value) => Ok(*value),
            _ => Err(Self::wrong_type(key, "int")),
        }
    }

    pub fn get_long(&self, key: &str) -> Result<i64, DecodeError> {
        match self.require(key)? {
            Tag::Long(value) => Ok(*value),
            _ => Err(Self::wrong_type(key, "long")),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<&str, DecodeError> {
        match self.require(key)? {
            Tag::String(value) => Ok(value),
            _ => Err(Self::wrong_type(key, "string")),
        }
    }

    pub fn get_int_array(&self, key: &str) -> Result<&[i32], DecodeError> {
        match self.require(key)? {
            Tag::IntArray(value) => Ok(value),
            _ => Err(Self::wrong_type(key, "int array")),
        }
    }

    pub fn get_long_array(&self, key: &str) -> Result<&[i64], DecodeError> {
        match self.require(key)? {
            Tag::LongArray(value) => Ok(value),
            _ => Err(Self::wrong_type(key, "long array")),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<&[Tag], DecodeError> {
        match self.require(key)? {
            Tag::List(value) => Ok(value),
            _ => Err(Self::wrong_type(key, "list")),
        }
    }

    pub fn get_compound(&self, key: &str) -> Result<&Record, DecodeError> {
        match self.require(key)? {
            Tag::Compound(value) => Ok(value),
            _ => Err(Self::wrong_type(key, "compound")),
        }
    }

    /// Six-int array `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub fn get_bounding_box(&self, key: &str) -> Result<BoundingBox, DecodeError> {
        let values = self.get_int_array(key)?;
        bounding_box_from_ints(key, values)
    }
}

/// Decode a six-int bounding box, reporting `key` on failure.
pub fn bounding_box_from_ints(key: &str, values: &[i32]) -> Result<BoundingBox, DecodeError> {
    let array: [i32; 6] = values
        .try_into()
        .map_err(|_| DecodeError::InvalidBoundingBox {
            key: key.to_string(),
            len: values.len(),
        })?;
    Ok(BoundingBox::from_array(array))
}

/// Compound tags nested in a list, in order.
pub fn compounds<'a>(key: &str, tags: &'a [Tag]) -> Result<Vec<&'a Record>, DecodeError> {
    tags.iter()
        .map(|tag| match tag {
            Tag::Compound(record) => Ok(record),
            _ => Err(DecodeError::WrongType {
                key: key.to_string(),
                expected: "list of compounds",
            }),
        })
        .collect()
}
