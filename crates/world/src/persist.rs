//! On-disk storage for generated structure starts and legacy indices.
//!
//! Each file is a small blob: a 14-byte header (magic, version, CRC32 of the
//! payload, payload length) followed by a zstd-compressed bincode payload of
//! [`Record`]s.

use crate::legacy_index::LegacyStructureHandler;
use crate::record::Record;
use crate::structure_start::StructureStart;
use anyhow::{Context, Result};
use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Magic number for structure blobs ("SGST").
const BLOB_MAGIC: u32 = 0x5347_5354;

/// Current blob format version.
const BLOB_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

const STARTS_FILE: &str = "starts.sgb";
const LEGACY_FILE: &str = "legacy_structures.sgb";

#[derive(Debug, Clone, PartialEq, Eq)]
struct BlobHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl BlobHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: BLOB_MAGIC,
            version: BLOB_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.crc32.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            anyhow::bail!("Blob header too short");
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != BLOB_MAGIC {
            anyhow::bail!(
                "Invalid blob magic: expected 0x{:08X}, got 0x{:08X}",
                BLOB_MAGIC,
                magic
            );
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != BLOB_VERSION {
            anyhow::bail!("Unsupported blob version {version}");
        }
        let crc32 = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        Ok(Self {
            magic,
            version,
            crc32,
            payload_len,
        })
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Serialize, compress and frame `value`.
pub fn encode_blob<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let serialized = bincode::serialize(value).context("Failed to serialize payload")?;
    let compressed = zstd::encode_all(&serialized[..], 3).context("Failed to compress payload")?;
    let payload_len = u32::try_from(compressed.len()).context("Payload too large")?;
    let header = BlobHeader::new(checksum(&compressed), payload_len);

    let mut bytes = header.to_bytes();
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Inverse of [`encode_blob`]; rejects bad magic, truncation and CRC mismatches.
pub fn decode_blob<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let header = BlobHeader::from_bytes(bytes)?;
    let payload = bytes
        .get(HEADER_LEN..HEADER_LEN + header.payload_len as usize)
        .context("Blob payload truncated")?;

    let computed = checksum(payload);
    if computed != header.crc32 {
        anyhow::bail!(
            "CRC32 mismatch: expected {:08X}, got {:08X}",
            header.crc32,
            computed
        );
    }

    let decompressed = zstd::decode_all(payload).context("Failed to decompress payload")?;
    bincode::deserialize(&decompressed).context("Failed to deserialize payload")
}

/// Decode every start record; unreadable starts are logged and skipped.
pub fn decode_starts_lenient(records: &[Record]) -> Vec<StructureStart> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match StructureStart::from_record(record) {
            Ok(start) => Some(start),
            Err(err) => {
                warn!(index, %err, "skipping unreadable structure start");
                None
            }
        })
        .collect()
}

/// Directory holding the structure blobs of one world.
pub struct StructureStore {
    dir: PathBuf,
}

impl StructureStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create structure directory")?;
        Ok(Self { dir })
    }

    pub fn starts_path(&self) -> PathBuf {
        self.dir.join(STARTS_FILE)
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.dir.join(LEGACY_FILE)
    }

    fn write(path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn read(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Replace the saved starts with `starts`.
    pub fn save_starts(&self, starts: &[StructureStart]) -> Result<()> {
        let records: Vec<Record> = starts.iter().map(StructureStart::to_record).collect();
        let bytes = encode_blob(&records)?;
        Self::write(&self.starts_path(), &bytes)?;
        debug!(count = starts.len(), "saved structure starts");
        Ok(())
    }

    /// Load every saved start; any bad start fails the whole load.
    pub fn load_starts(&self) -> Result<Vec<StructureStart>> {
        let records: Vec<Record> = decode_blob(&Self::read(&self.starts_path())?)?;
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                StructureStart::from_record(record)
                    .with_context(|| format!("Failed to decode structure start {index}"))
            })
            .collect()
    }

    /// Load saved starts, treating an unreadable file or start as absent.
    pub fn load_starts_lenient(&self) -> Vec<StructureStart> {
        let path = self.starts_path();
        if !path.exists() {
            return Vec::new();
        }
        match Self::read(&path).and_then(|bytes| decode_blob::<Vec<Record>>(&bytes)) {
            Ok(records) => decode_starts_lenient(&records),
            Err(err) => {
                warn!("Failed to load {}: {err:#}. Ignoring saved starts", path.display());
                Vec::new()
            }
        }
    }

    pub fn save_legacy(&self, handler: &LegacyStructureHandler) -> Result<()> {
        let bytes = encode_blob(&handler.to_record())?;
        Self::write(&self.legacy_path(), &bytes)
    }

    /// Load legacy indices; missing or corrupt data yields an empty handler.
    pub fn load_legacy_lenient(&self) -> LegacyStructureHandler {
        let path = self.legacy_path();
        if !path.exists() {
            return LegacyStructureHandler::new();
        }
        match Self::read(&path).and_then(|bytes| decode_blob::<Record>(&bytes)) {
            Ok(record) => LegacyStructureHandler::from_record_lenient(&record),
            Err(err) => {
                warn!("Failed to load {}: {err:#}. Starting without legacy data", path.display());
                LegacyStructureHandler::new()
            }
        }
    }
}
