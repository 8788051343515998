//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the UndertowKV storage engine.
//!
//! Every mutation is serialized into a binary entry and appended to the WAL
//! **before** the corresponding memtable update. On table open the WAL is
//! replayed to reconstruct the memtable, guaranteeing that no acknowledged
//! write is lost. After a successful segment flush the WAL is truncated back
//! to a bare version header.
//!
//! ## File format
//!
//! ```text
//! [version tag: 8 bytes]
//! [total_size: i32 LE][command: u8][key_size: u8][key][value]
//! ... repeated for each entry ...
//! ```
//!
//! `total_size` counts the whole entry, its own four bytes included.
//! Commands: `INSERT = 1` (key + value), `DELETE = 2` (key only),
//! `CREATE_TABLE = 3` (key only; the master WAL uses it to register a
//! user-table name with an empty value).
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::{WalWriter, WalReader, WalRecord};
//!
//! let mut w = WalWriter::open("t.wal", false).unwrap();
//! w.append(&WalRecord::Insert {
//!     key: b"hello".to_vec(),
//!     value: b"world".to_vec(),
//! }).unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("t.wal").unwrap();
//! r.replay(|entry| println!("{:?}", entry)).unwrap();
//! ```

use byteorder::{LittleEndian, WriteBytesExt};
use config::{FORMAT_VERSION, KEY_MAX_LEN, RECORD_LEN_SZ, VER_SZ, WAL_CMD_SZ};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// WAL command byte for an insert or update.
pub const CMD_INSERT: u8 = 1;
/// WAL command byte for a delete (tombstone).
pub const CMD_DELETE: u8 = 2;
/// WAL command byte registering a user-table name in the master WAL.
pub const CMD_CREATE_TABLE: u8 = 3;

/// A single logical WAL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// A key-value insertion or in-place update.
    Insert {
        /// The lookup key (1..=255 bytes).
        key: Vec<u8>,
        /// The payload value.
        value: Vec<u8>,
    },
    /// A key deletion; replays as a tombstone.
    Delete {
        /// The key to delete.
        key: Vec<u8>,
    },
    /// Registers a table name with an empty value (master WAL only).
    CreateTable {
        /// The user-table name.
        name: Vec<u8>,
    },
}

impl WalRecord {
    /// The key this entry mutates.
    pub fn key(&self) -> &[u8] {
        match self {
            WalRecord::Insert { key, .. } => key,
            WalRecord::Delete { key } => key,
            WalRecord::CreateTable { name } => name,
        }
    }

    fn command(&self) -> u8 {
        match self {
            WalRecord::Insert { .. } => CMD_INSERT,
            WalRecord::Delete { .. } => CMD_DELETE,
            WalRecord::CreateTable { .. } => CMD_CREATE_TABLE,
        }
    }

    fn value(&self) -> &[u8] {
        match self {
            WalRecord::Insert { value, .. } => value,
            _ => &[],
        }
    }
}

/// Errors that can occur during WAL operations.
///
/// `BadVersion` and `Corrupt` are unrecoverable: the file does not mean what
/// the engine expects, and silently skipping over it would replay a wrong
/// state. The engine treats both as fatal.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file does not begin with the expected 8-byte version tag.
    #[error("bad WAL version tag in {0}")]
    BadVersion(String),

    /// A malformed entry: truncated tail, impossible length, or unknown
    /// command.
    #[error("corrupt WAL entry: {0}")]
    Corrupt(String),
}

/// Append-only WAL writer.
///
/// Entries are serialized into a reusable scratch buffer and written to the
/// underlying file in a single `write_all` call, then flushed to the OS
/// buffer. When `sync` is `true` every append is additionally followed by
/// `sync_all()` (fsync).
pub struct WalWriter {
    path: PathBuf,
    file: File,
    sync: bool,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    ///
    /// A brand-new (empty) file gets the 8-byte version header; an existing
    /// file is appended to as-is — replay it first via [`WalReader`].
    ///
    /// # Arguments
    ///
    /// * `path` - file system path for the WAL (created if absent).
    /// * `sync` - if true, every `append` call is followed by `fsync`.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = Self {
            path,
            file,
            sync,
            buf: Vec::with_capacity(256),
        };
        if writer.file.metadata()?.len() == 0 {
            writer.file.write_all(&FORMAT_VERSION)?;
            writer.file.flush()?;
        }
        Ok(writer)
    }

    /// Serializes `record` and appends it to the WAL file.
    ///
    /// Layout: `[total_size: i32 LE][command: u8][key_size: u8][key][value]`.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        let key = record.key();
        let value = record.value();
        if key.is_empty() || key.len() > KEY_MAX_LEN {
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("WAL key length {} out of range 1..={}", key.len(), KEY_MAX_LEN),
            )));
        }

        let total_size = RECORD_LEN_SZ + WAL_CMD_SZ + config::KEY_LEN_SZ + key.len() + value.len();
        if total_size > i32::MAX as usize {
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "WAL entry too large (exceeds i32::MAX bytes)",
            )));
        }

        self.buf.clear();
        self.buf.write_i32::<LittleEndian>(total_size as i32)?;
        self.buf.write_u8(record.command())?;
        self.buf.write_u8(key.len() as u8)?;
        self.buf.extend_from_slice(key);
        self.buf.extend_from_slice(value);

        // Single write call for the entire entry
        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Truncates the WAL to zero bytes and writes a fresh version header.
    ///
    /// Callers must only do this *after* the state the WAL protects has been
    /// made durable elsewhere (segment fsync, master/root update).
    pub fn truncate(&mut self) -> Result<(), WalError> {
        {
            let mut truncated = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            truncated.write_all(&FORMAT_VERSION)?;
            truncated.flush()?;
            truncated.sync_all()?;
        }
        // swap in a fresh append-mode handle
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(())
    }

    /// Forces all buffered data to disk via `sync_all()`.
    ///
    /// Useful when `sync` is `false` and the caller wants durability at a
    /// specific point.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Path of the underlying WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sequential WAL reader.
///
/// The reader is generic over any `Read` implementor so unit tests can
/// replay from an in-memory buffer. The stream must begin with the 8-byte
/// version tag; it is validated on construction.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
    /// Description of the source, used in diagnostics.
    source: String,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let display = path.as_ref().display().to_string();
        let f = File::open(path.as_ref())?;
        WalReader::new(f, display)
    }
}

impl<R: Read> WalReader<R> {
    /// Constructs a reader from any `Read` implementor positioned at the
    /// start of the WAL image (version tag included).
    pub fn from_reader(reader: R) -> Result<Self, WalError> {
        WalReader::new(reader, "<reader>".to_string())
    }

    fn new(reader: R, source: String) -> Result<Self, WalError> {
        let mut rdr = BufReader::new(reader);
        let mut tag = [0u8; VER_SZ];
        rdr.read_exact(&mut tag)
            .map_err(|_| WalError::BadVersion(source.clone()))?;
        if tag != FORMAT_VERSION {
            return Err(WalError::BadVersion(source));
        }
        Ok(Self { rdr, source })
    }

    /// Replays every entry in the WAL, calling `apply` for each one in
    /// write order.
    ///
    /// # Termination
    ///
    /// - **Clean EOF** (stream ends on an entry boundary) -> `Ok(())`.
    /// - **Truncated tail** (stream ends mid-entry) -> `WalError::Corrupt`.
    /// - **Unknown command or impossible length** -> `WalError::Corrupt`.
    /// - **I/O error** -> `WalError::Io`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(WalRecord),
    {
        // Reusable buffer to avoid allocation per entry
        let mut body = Vec::with_capacity(256);

        loop {
            let mut len_buf = [0u8; RECORD_LEN_SZ];
            if !self.read_or_eof(&mut len_buf)? {
                return Ok(());
            }
            let total_size = i32::from_le_bytes(len_buf);

            // smallest possible entry: length + command + key_size + 1-byte key
            let min = (RECORD_LEN_SZ + WAL_CMD_SZ + config::KEY_LEN_SZ + 1) as i32;
            if total_size < min {
                return Err(WalError::Corrupt(format!(
                    "{}: entry length {} below minimum {}",
                    self.source, total_size, min
                )));
            }

            let body_len = total_size as usize - RECORD_LEN_SZ;
            body.clear();
            body.resize(body_len, 0);
            self.rdr.read_exact(&mut body).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    WalError::Corrupt(format!(
                        "{}: entry length {} overruns end of file",
                        self.source, total_size
                    ))
                } else {
                    WalError::Io(e)
                }
            })?;

            let command = body[0];
            let key_size = body[1] as usize;
            if key_size == 0 || 2 + key_size > body_len {
                return Err(WalError::Corrupt(format!(
                    "{}: key length {} does not fit entry of {} bytes",
                    self.source, key_size, total_size
                )));
            }
            let key = body[2..2 + key_size].to_vec();
            let value = &body[2 + key_size..];

            let record = match command {
                CMD_INSERT => WalRecord::Insert {
                    key,
                    value: value.to_vec(),
                },
                CMD_DELETE => {
                    if !value.is_empty() {
                        return Err(WalError::Corrupt(format!(
                            "{}: DELETE entry carries {} value bytes",
                            self.source,
                            value.len()
                        )));
                    }
                    WalRecord::Delete { key }
                }
                CMD_CREATE_TABLE => {
                    if !value.is_empty() {
                        return Err(WalError::Corrupt(format!(
                            "{}: CREATE_TABLE entry carries {} value bytes",
                            self.source,
                            value.len()
                        )));
                    }
                    WalRecord::CreateTable { name: key }
                }
                other => {
                    return Err(WalError::Corrupt(format!(
                        "{}: unknown WAL command {}",
                        self.source, other
                    )))
                }
            };

            apply(record);
        }
    }

    /// Fills `buf` completely, returning `false` on a clean EOF at the
    /// first byte and `Corrupt` if the stream ends partway through.
    fn read_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, WalError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.rdr.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(WalError::Corrupt(format!(
                    "{}: truncated entry header ({} of {} bytes)",
                    self.source,
                    filled,
                    buf.len()
                )));
            }
            filled += n;
        }
        Ok(true)
    }
}
