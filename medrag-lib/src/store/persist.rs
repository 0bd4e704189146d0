//! Paired on-disk artifacts for a flat knowledge base.
//!
//! # Storage Format
//!
//! Vector file:
//! - Header (16 bytes): magic `MRAG`, version, dimension, vector count
//!   (little-endian `u32`)
//! - Vectors: contiguous `f32` values in little-endian format
//!
//! Metadata file: JSON array of [`Entry`] in index order.
//!
//! The two files are always written and read together. Each is written to a
//! temporary sibling and renamed into place, so readers never observe a
//! half-written file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::index::{FlatIndex, VectorIndex};
use crate::store::{Entry, KnowledgeBase};
use crate::{Error, Result};

const MAGIC_BYTES: &[u8; 4] = b"MRAG";

const STORAGE_VERSION: u32 = 1;

const HEADER_SIZE: usize = 16;

const BYTES_PER_F32: usize = 4;

/// Write the vector file and metadata file for `kb`.
pub fn save(
    kb: &KnowledgeBase<FlatIndex>,
    index_path: impl AsRef<Path>,
    metadata_path: impl AsRef<Path>,
) -> Result<()> {
    let index_path = index_path.as_ref();
    let metadata_path = metadata_path.as_ref();

    let vectors = encode_vectors(kb.index())?;
    let metadata = serde_json::to_vec_pretty(kb.entries())?;

    let index_tmp = write_temp(index_path, &vectors)?;
    let metadata_tmp = write_temp(metadata_path, &metadata)?;
    fs::rename(&index_tmp, index_path)?;
    fs::rename(&metadata_tmp, metadata_path)?;

    info!(
        vectors = kb.len(),
        dimension = kb.dimension(),
        index = %index_path.display(),
        metadata = %metadata_path.display(),
        "saved knowledge base"
    );
    Ok(())
}

/// Read a vector file and metadata file back into a knowledge base.
///
/// Any missing, malformed or mismatched artifact is a `CorruptIndex` error.
pub fn load(
    index_path: impl AsRef<Path>,
    metadata_path: impl AsRef<Path>,
) -> Result<KnowledgeBase<FlatIndex>> {
    let index_path = index_path.as_ref();
    let metadata_path = metadata_path.as_ref();

    let vectors = read_artifact(index_path)?;
    let metadata = read_artifact(metadata_path)?;

    let index = decode_vectors(&vectors)?;
    let entries: Vec<Entry> = serde_json::from_slice(&metadata).map_err(|e| {
        Error::CorruptIndex(format!("invalid metadata in {}: {e}", metadata_path.display()))
    })?;

    let kb = KnowledgeBase::from_parts(index, entries)?;
    info!(
        vectors = kb.len(),
        dimension = kb.dimension(),
        index = %index_path.display(),
        "loaded knowledge base"
    );
    Ok(kb)
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            Error::CorruptIndex(format!("missing index artifact: {}", path.display()))
        }
        _ => Error::Io(e),
    })
}

fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    Ok(tmp)
}

fn encode_vectors(index: &FlatIndex) -> Result<Vec<u8>> {
    let dimension = to_u32(index.dimension(), "dimension")?;
    let count = to_u32(index.len(), "vector count")?;

    let data = index.as_slice();
    let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len() * BYTES_PER_F32);
    bytes.extend_from_slice(MAGIC_BYTES);
    bytes.extend_from_slice(&STORAGE_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dimension.to_le_bytes());
    bytes.extend_from_slice(&count.to_le_bytes());
    for value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

fn decode_vectors(bytes: &[u8]) -> Result<FlatIndex> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::CorruptIndex("vector file shorter than header".to_string()));
    }
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(Error::CorruptIndex("vector file has bad magic bytes".to_string()));
    }

    let version = read_u32(bytes, 4);
    if version != STORAGE_VERSION {
        return Err(Error::CorruptIndex(format!(
            "unsupported vector file version {version}, expected {STORAGE_VERSION}"
        )));
    }

    let dimension = read_u32(bytes, 8) as usize;
    let count = read_u32(bytes, 12) as usize;
    let body = &bytes[HEADER_SIZE..];

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(BYTES_PER_F32))
        .ok_or_else(|| Error::CorruptIndex("vector file header overflows".to_string()))?;
    if body.len() != expected {
        return Err(Error::CorruptIndex(format!(
            "header declares {count} vectors of dimension {dimension} ({expected} bytes) \
             but file holds {} bytes",
            body.len()
        )));
    }

    let data = body
        .chunks_exact(BYTES_PER_F32)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    FlatIndex::from_raw(dimension, data).map_err(|e| Error::CorruptIndex(e.to_string()))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{what} {value} does not fit the vector file header")))
}
