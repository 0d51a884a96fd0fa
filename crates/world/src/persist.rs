//! Deferred store persistence with zstd compression.
//!
//! The store is flattened into a [`DeferredRecord`], bincode-encoded, zstd
//! compressed and written behind a small header carrying a CRC32 of the
//! payload. Loading is all-or-nothing: any malformed record fails the load.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use terra_core::{RegistryKey, RegistryKeyError};
use thiserror::Error;
use tracing::{debug, info};

use crate::chunk::{BlockPos, BlockState, ChunkPos};
use crate::deferred::{DeferredEntry, DeferredStore, SharedDeferredStore};
use crate::vein::replacer::{Replacer, ReplacerList};

/// Top-level record name.
pub const RECORD_NAME: &str = "terra_deferred_ore";

/// File name inside the world directory.
pub const STORE_FILE_NAME: &str = "terra_deferred_ore.dat";

/// Magic number for deferred store files ("TRDF").
const STORE_MAGIC: u32 = 0x5452_4446;

/// Current store file format version.
const STORE_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

const KIND_TAG: &str = "tag";
const KIND_STATE: &str = "state";

/// Why a persisted store could not be loaded.
#[derive(Debug, Error)]
pub enum DeferredLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store header too short: {0} bytes")]
    HeaderTooShort(usize),
    #[error("invalid store magic: expected 0x{expected:08X}, got 0x{found:08X}")]
    BadMagic { expected: u32, found: u32 },
    #[error("unsupported store version {0}")]
    UnsupportedVersion(u16),
    #[error("payload length mismatch: header says {expected}, found {found}")]
    PayloadLength { expected: usize, found: usize },
    #[error("CRC32 mismatch: expected {expected:08X}, got {found:08X}")]
    CrcMismatch { expected: u32, found: u32 },
    #[error("failed to decompress payload: {0}")]
    Decompress(#[source] io::Error),
    #[error("failed to decode record: {0}")]
    Decode(#[from] bincode::Error),
    #[error("unexpected record name {0:?}")]
    WrongRecord(String),
    #[error("unknown replacer kind {kind:?} at {pos}")]
    UnknownReplacerKind { kind: String, pos: BlockPos },
    #[error("{kind} replacer at {pos} is missing {field}")]
    MissingField {
        kind: String,
        pos: BlockPos,
        field: &'static str,
    },
    #[error("invalid tag {tag:?} at {pos}: {source}")]
    InvalidTag {
        tag: String,
        pos: BlockPos,
        #[source]
        source: RegistryKeyError,
    },
    #[error("chunk {0} recorded twice")]
    DuplicateChunk(ChunkPos),
}

/// Persisted form of the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredRecord {
    pub name: String,
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub x: i32,
    pub z: i32,
    pub ores: Vec<OreRecord>,
    pub pebbles: Vec<PebbleRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OreRecord {
    pub pos: BlockPos,
    pub replacers: Vec<ReplacerRecord>,
}

/// One replacer. `kind` selects which match operand is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacerRecord {
    pub kind: String,
    pub tag_to_replace: Option<String>,
    pub state_to_replace: Option<BlockState>,
    pub state_to_place: BlockState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PebbleRecord {
    pub pos: BlockPos,
    pub pebble: BlockState,
}

impl From<&Replacer> for ReplacerRecord {
    fn from(replacer: &Replacer) -> Self {
        match replacer {
            Replacer::Tag { tag, place } => Self {
                kind: KIND_TAG.to_string(),
                tag_to_replace: Some(tag.to_string()),
                state_to_replace: None,
                state_to_place: *place,
            },
            Replacer::State { target, place } => Self {
                kind: KIND_STATE.to_string(),
                tag_to_replace: None,
                state_to_replace: Some(*target),
                state_to_place: *place,
            },
        }
    }
}

impl ReplacerRecord {
    fn to_replacer(&self, pos: BlockPos) -> Result<Replacer, DeferredLoadError> {
        let missing = |field| DeferredLoadError::MissingField {
            kind: self.kind.clone(),
            pos,
            field,
        };
        match self.kind.as_str() {
            KIND_TAG => {
                let tag = self.tag_to_replace.as_ref().ok_or_else(|| missing("tag_to_replace"))?;
                let key = RegistryKey::parse(tag).map_err(|source| DeferredLoadError::InvalidTag {
                    tag: tag.clone(),
                    pos,
                    source,
                })?;
                Ok(Replacer::tag(key, self.state_to_place))
            }
            KIND_STATE => {
                let target = self.state_to_replace.ok_or_else(|| missing("state_to_replace"))?;
                Ok(Replacer::state(target, self.state_to_place))
            }
            _ => Err(DeferredLoadError::UnknownReplacerKind {
                kind: self.kind.clone(),
                pos,
            }),
        }
    }
}

/// Flatten the store into its persisted record.
pub fn to_record(store: &DeferredStore) -> DeferredRecord {
    let chunks = store
        .iter()
        .map(|(chunk, entry)| ChunkRecord {
            x: chunk.x,
            z: chunk.z,
            ores: entry
                .ores
                .iter()
                .map(|(pos, replacers)| OreRecord {
                    pos: *pos,
                    replacers: replacers.iter().map(ReplacerRecord::from).collect(),
                })
                .collect(),
            pebbles: entry
                .pebbles
                .iter()
                .map(|(pos, pebble)| PebbleRecord {
                    pos: *pos,
                    pebble: *pebble,
                })
                .collect(),
        })
        .collect();

    DeferredRecord {
        name: RECORD_NAME.to_string(),
        chunks,
    }
}

/// Rebuild a store from its record. The result is not dirty.
///
/// Identical replacer lists share one allocation.
pub fn from_record(record: &DeferredRecord) -> Result<DeferredStore, DeferredLoadError> {
    if record.name != RECORD_NAME {
        return Err(DeferredLoadError::WrongRecord(record.name.clone()));
    }

    let mut interned: HashMap<Vec<Replacer>, ReplacerList> = HashMap::new();
    let mut entries = BTreeMap::new();

    for chunk_record in &record.chunks {
        let chunk = ChunkPos::new(chunk_record.x, chunk_record.z);
        let mut entry = DeferredEntry::default();

        for ore in &chunk_record.ores {
            let replacers = ore
                .replacers
                .iter()
                .map(|replacer| replacer.to_replacer(ore.pos))
                .collect::<Result<Vec<_>, _>>()?;
            let list = interned
                .entry(replacers)
                .or_insert_with_key(|replacers| replacers.clone().into())
                .clone();
            entry.ores.insert(ore.pos, list);
        }
        for pebble in &chunk_record.pebbles {
            entry.pebbles.insert(pebble.pos, pebble.pebble);
        }

        if entries.insert(chunk, entry).is_some() {
            return Err(DeferredLoadError::DuplicateChunk(chunk));
        }
    }

    Ok(DeferredStore::from_entries(entries))
}

/// Encode the store as an uncompressed bincode record.
pub fn encode(store: &DeferredStore) -> Result<Vec<u8>> {
    bincode::serialize(&to_record(store)).context("Failed to serialize deferred store")
}

/// Decode an uncompressed bincode record.
pub fn decode(bytes: &[u8]) -> Result<DeferredStore, DeferredLoadError> {
    let record: DeferredRecord = bincode::deserialize(bytes)?;
    from_record(&record)
}

/// Store file header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoreHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl StoreHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: STORE_MAGIC,
            version: STORE_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, DeferredLoadError> {
        if bytes.len() < HEADER_LEN {
            return Err(DeferredLoadError::HeaderTooShort(bytes.len()));
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != STORE_MAGIC {
            return Err(DeferredLoadError::BadMagic {
                expected: STORE_MAGIC,
                found: magic,
            });
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != STORE_VERSION {
            return Err(DeferredLoadError::UnsupportedVersion(version));
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

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Full file image: header plus compressed record.
pub fn to_file_bytes(store: &DeferredStore) -> Result<Vec<u8>> {
    let serialized = encode(store)?;
    let compressed =
        zstd::encode_all(&serialized[..], 3).context("Failed to compress deferred store")?;
    let payload_len =
        u32::try_from(compressed.len()).context("Deferred store payload exceeds 4 GiB")?;

    let header = StoreHeader::new(crc32(&compressed), payload_len);
    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Parse a full file image produced by [`to_file_bytes`].
pub fn from_file_bytes(bytes: &[u8]) -> Result<DeferredStore, DeferredLoadError> {
    let header = StoreHeader::from_bytes(bytes)?;
    let compressed = &bytes[HEADER_LEN..];
    if compressed.len() != header.payload_len as usize {
        return Err(DeferredLoadError::PayloadLength {
            expected: header.payload_len as usize,
            found: compressed.len(),
        });
    }

    let computed = crc32(compressed);
    if computed != header.crc32 {
        return Err(DeferredLoadError::CrcMismatch {
            expected: header.crc32,
            found: computed,
        });
    }

    let decompressed = zstd::decode_all(compressed).map_err(DeferredLoadError::Decompress)?;
    decode(&decompressed)
}

/// The store's file inside a world directory.
#[derive(Debug, Clone)]
pub struct DeferredStoreFile {
    path: PathBuf,
}

impl DeferredStoreFile {
    /// Store file for the world rooted at `world_dir`.
    pub fn in_world<P: AsRef<Path>>(world_dir: P) -> Self {
        Self {
            path: world_dir.as_ref().join(STORE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store. A missing file is an empty store.
    pub fn load(&self) -> Result<DeferredStore, DeferredLoadError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no deferred store on disk");
                return Ok(DeferredStore::new());
            }
            Err(source) => {
                return Err(DeferredLoadError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let store = from_file_bytes(&bytes)?;
        let (ores, pebbles) = store.pending_counts();
        info!(
            path = %self.path.display(),
            chunks = store.len(),
            ores,
            pebbles,
            "loaded deferred store"
        );
        Ok(store)
    }

    /// Write the store, replacing any previous file atomically.
    pub fn save(&self, store: &DeferredStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create world directory")?;
        }
        let bytes = to_file_bytes(store)?;

        let tmp = self.path.with_extension("dat.tmp");
        fs::write(&tmp, &bytes)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        let (ores, pebbles) = store.pending_counts();
        info!(
            path = %self.path.display(),
            chunks = store.len(),
            ores,
            pebbles,
            bytes = bytes.len(),
            "saved deferred store"
        );
        Ok(())
    }

    /// Save only when the shared store is dirty. Returns whether a write happened.
    ///
    /// The dirty flag is cleared from a snapshot taken under the lock; it is
    /// restored if the write fails.
    pub fn save_if_dirty(&self, shared: &SharedDeferredStore) -> Result<bool> {
        let snapshot = {
            let mut guard = shared.lock();
            if !guard.take_dirty() {
                return Ok(false);
            }
            guard.clone()
        };

        if let Err(err) = self.save(&snapshot) {
            shared.lock().mark_dirty();
            return Err(err);
        }
        Ok(true)
    }
}
