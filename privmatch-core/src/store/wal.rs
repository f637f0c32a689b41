//! Write-Ahead Log (WAL) for entity mutations.
//!
//! Every mutation is appended to the WAL before it is applied in memory. On
//! open, the WAL is replayed on top of the last snapshot.
//!
//! # Format
//!
//! Each WAL entry has the format:
//! ```text
//! [checksum:u32][length:u32][json:length]
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};

/// Sync mode for WAL writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Sync after every write (safest, slowest).
    Immediate,
    /// Sync after a batch of writes.
    #[default]
    Batched,
    /// Don't sync (fastest, risk of data loss on crash).
    NoSync,
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" => Ok(SyncMode::Immediate),
            "batched" => Ok(SyncMode::Batched),
            "none" | "nosync" => Ok(SyncMode::NoSync),
            other => Err(Error::StoreError(format!("unknown sync mode: {}", other))),
        }
    }
}

/// The kind of operation in a WAL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalEntryKind {
    /// Insert or replace an entity.
    Upsert,
    /// Delete an entity.
    Delete,
    /// Checkpoint marker (WAL can be truncated before this point).
    Checkpoint,
}

/// A single WAL entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub kind: WalEntryKind,
    /// Target entity (None for checkpoint).
    pub id: Option<EntityId>,
    /// Full entity state for upserts.
    pub entity: Option<Entity>,
}

impl WalEntry {
    /// Creates an upsert entry carrying the entity's full state.
    pub fn upsert(entity: Entity) -> Self {
        Self {
            kind: WalEntryKind::Upsert,
            id: Some(entity.id()),
            entity: Some(entity),
        }
    }

    /// Creates a delete entry.
    pub fn delete(id: EntityId) -> Self {
        Self {
            kind: WalEntryKind::Delete,
            id: Some(id),
            entity: None,
        }
    }

    /// Creates a checkpoint entry.
    pub fn checkpoint() -> Self {
        Self {
            kind: WalEntryKind::Checkpoint,
            id: None,
            entity: None,
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::WalCorrupted(format!("serialization failed: {}", e)))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::WalCorrupted(format!("deserialization failed: {}", e)))
    }
}

/// Write-Ahead Log for durable operations.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    sync_mode: SyncMode,
    /// Number of entries since last sync.
    entries_since_sync: usize,
    batch_size: usize,
}

impl Wal {
    /// Opens or creates a WAL file.
    pub fn open<P: AsRef<Path>>(path: P, sync_mode: SyncMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::IoError(format!("failed to open WAL: {}", e)))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            sync_mode,
            entries_since_sync: 0,
            batch_size: 100,
        })
    }

    /// Appends an entry to the WAL.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let data = entry.to_bytes()?;
        let checksum = crc32fast::hash(&data);
        let length = u32::try_from(data.len())
            .map_err(|_| Error::WalCorrupted(format!("entry too large: {} bytes", data.len())))?;

        self.writer
            .write_all(&checksum.to_le_bytes())
            .map_err(|e| Error::IoError(format!("write checksum failed: {}", e)))?;
        self.writer
            .write_all(&length.to_le_bytes())
            .map_err(|e| Error::IoError(format!("write length failed: {}", e)))?;
        self.writer
            .write_all(&data)
            .map_err(|e| Error::IoError(format!("write data failed: {}", e)))?;

        self.entries_since_sync += 1;

        match self.sync_mode {
            SyncMode::Immediate => self.sync()?,
            SyncMode::Batched if self.entries_since_sync >= self.batch_size => self.sync()?,
            _ => self
                .writer
                .flush()
                .map_err(|e| Error::IoError(format!("flush failed: {}", e)))?,
        }

        Ok(())
    }

    /// Forces a sync to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::IoError(format!("flush failed: {}", e)))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| Error::IoError(format!("sync failed: {}", e)))?;
        self.entries_since_sync = 0;
        Ok(())
    }

    /// Writes a checkpoint and truncates the WAL.
    ///
    /// Only call this once the state up to this point is in a snapshot.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.append(&WalEntry::checkpoint())?;
        self.sync()?;

        let truncated = File::create(&self.path)
            .map_err(|e| Error::IoError(format!("truncate failed: {}", e)))?;
        drop(std::mem::replace(&mut self.writer, BufWriter::new(truncated)));

        Ok(())
    }

    /// Reads all entries for recovery.
    ///
    /// A torn final record (crash mid-append) ends the log; a checksum
    /// mismatch anywhere is corruption.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<WalEntry>> {
        Self::read_entries(path.as_ref()).map(|(entries, _)| entries)
    }

    /// Reads all entries and cuts a torn final record off the file, so that
    /// later appends follow the last complete record.
    pub fn recover<P: AsRef<Path>>(path: P) -> Result<Vec<WalEntry>> {
        let path = path.as_ref();
        let (entries, valid_len) = Self::read_entries(path)?;
        if !path.exists() {
            return Ok(entries);
        }

        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| Error::IoError(format!("failed to open WAL for repair: {}", e)))?;
        let len = file
            .metadata()
            .map_err(|e| Error::IoError(format!("stat WAL failed: {}", e)))?
            .len();
        if len > valid_len {
            tracing::warn!(
                path = %path.display(),
                discarded = len - valid_len,
                "truncating torn WAL tail"
            );
            file.set_len(valid_len)
                .map_err(|e| Error::IoError(format!("truncate torn tail failed: {}", e)))?;
            file.sync_all()
                .map_err(|e| Error::IoError(format!("sync failed: {}", e)))?;
        }
        Ok(entries)
    }

    // Returns the entries and the byte length covered by complete records.
    fn read_entries(path: &Path) -> Result<(Vec<WalEntry>, u64)> {
        if !path.exists() {
            return Ok((Vec::new(), 0));
        }

        let file = File::open(path)
            .map_err(|e| Error::IoError(format!("failed to open WAL for read: {}", e)))?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut valid_len = 0u64;

        loop {
            let mut header = [0u8; 8];
            match reader.read_exact(&mut header) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    // A partial header is a torn record as well.
                    break;
                }
                Err(e) => return Err(Error::IoError(format!("read header failed: {}", e))),
            }
            let expected_checksum = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

            let mut data = vec![0u8; length];
            match reader.read_exact(&mut data) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    tracing::warn!(path = %path.display(), "discarding torn WAL record");
                    break;
                }
                Err(e) => return Err(Error::IoError(format!("read data failed: {}", e))),
            }

            let actual_checksum = crc32fast::hash(&data);
            if actual_checksum != expected_checksum {
                return Err(Error::WalCorrupted(format!(
                    "checksum mismatch: expected {}, got {}",
                    expected_checksum, actual_checksum
                )));
            }

            entries.push(WalEntry::from_bytes(&data)?);
            valid_len += 8 + length as u64;
        }

        Ok((entries, valid_len))
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
