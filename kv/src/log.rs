//! Append-only, log-structured persistent engine.
//!
//! # Design
//! Every mutation appends one record to `todo.data`:
//!
//! ```text
//! header_crc: u32 | key_len: u32 | value_len: u32 | kind: u8 | data_crc: u32 | key | value
//! ```
//!
//! Integers are big-endian. `header_crc` covers the 13 header bytes after it,
//! `data_crc` covers key and value. `kind` is 0 for a put and 1 for a
//! tombstone (tombstones carry no value). An in-memory key directory points
//! each live key at its latest value, so a read is one seek plus one
//! `read_exact`.
//!
//! Opening the store replays the whole file. Only the final record may be
//! incomplete or fail its data checksum; it is the remnant of an
//! interrupted append and is truncated away. Anything else that does not
//! verify is `KvError::Corrupt`.
//!
//! Overwrites and tombstones leave stale bytes behind. Once they exceed
//! `LogOptions::compaction_threshold`, live entries are copied into a fresh
//! file which is then renamed over the old one. A failed automatic
//! compaction never fails the write that triggered it.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::engine::KvEngine;
use crate::error::KvError;

const DATA_FILE: &str = "todo.data";
const COMPACT_FILE: &str = "todo.data.compact";

const HEADER_LEN: u64 = 17;
const KIND_PUT: u8 = 0;
const KIND_TOMBSTONE: u8 = 1;

/// Tuning knobs for `LogStore`.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// fsync the data file after every put and delete.
    pub sync_writes: bool,
    /// Stale bytes tolerated before an automatic compaction.
    pub compaction_threshold: u64,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            sync_writes: true,
            compaction_threshold: 1024 * 1024,
        }
    }
}

/// Location of the latest value for one key.
#[derive(Debug, Clone, Copy)]
struct ValuePos {
    offset: u64,
    len: u32,
    record_len: u64,
}

struct Inner {
    file: File,
    keydir: HashMap<String, ValuePos>,
    end: u64,
    stale: u64,
    /// Stale byte count above which the next write attempts a compaction.
    compact_above: u64,
    /// Set when the file tail no longer matches `end`.
    failed: bool,
}

/// Persistent engine rooted in a directory.
pub struct LogStore {
    dir: PathBuf,
    options: LogOptions,
    inner: Mutex<Inner>,
}

impl LogStore {
    /// Open (or create) the store in `dir` and rebuild the key directory.
    pub fn open(dir: impl AsRef<Path>, options: LogOptions) -> Result<Self, KvError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let leftover = dir.join(COMPACT_FILE);
        if leftover.exists() {
            warn!(path = %leftover.display(), "removing unfinished compaction file");
            fs::remove_file(&leftover)?;
        }

        let file = open_data_file(&dir.join(DATA_FILE))?;
        let replayed = replay(&file)?;
        if replayed.end < replayed.file_len {
            warn!(
                valid = replayed.end,
                file_len = replayed.file_len,
                "truncating interrupted record at end of data file"
            );
            file.set_len(replayed.end)?;
        }

        info!(
            dir = %dir.display(),
            keys = replayed.keydir.len(),
            stale_bytes = replayed.stale,
            "opened log store"
        );

        Ok(Self {
            dir,
            inner: Mutex::new(Inner {
                file,
                keydir: replayed.keydir,
                end: replayed.end,
                stale: replayed.stale,
                compact_above: options.compaction_threshold,
                failed: false,
            }),
            options,
        })
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.inner.lock().keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().keydir.is_empty()
    }

    /// Bytes in the data file no longer reachable from any live key.
    pub fn stale_bytes(&self) -> u64 {
        self.inner.lock().stale
    }

    /// Rewrite the data file so it only holds live entries.
    pub fn compact(&self) -> Result<(), KvError> {
        let mut inner = self.inner.lock();
        if inner.failed {
            return Err(KvError::Failed);
        }
        self.compact_locked(&mut inner)
    }

    fn compact_locked(&self, inner: &mut Inner) -> Result<(), KvError> {
        let tmp_path = self.dir.join(COMPACT_FILE);
        let result = self.write_compacted(inner, &tmp_path);
        if result.is_err() && tmp_path.is_file() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn write_compacted(&self, inner: &mut Inner, tmp_path: &Path) -> Result<(), KvError> {
        let mut out = BufWriter::new(File::create(tmp_path)?);
        let mut keydir = HashMap::with_capacity(inner.keydir.len());
        let mut end = 0u64;

        for (key, pos) in &inner.keydir {
            let value = read_value(&inner.file, pos)?;
            let record = encode_record(KIND_PUT, key, &value)?;
            out.write_all(&record)?;
            keydir.insert(
                key.clone(),
                ValuePos {
                    offset: end + HEADER_LEN + key.len() as u64,
                    len: pos.len,
                    record_len: record.len() as u64,
                },
            );
            end += record.len() as u64;
        }

        let out = out.into_inner().map_err(|e| e.into_error())?;
        out.sync_all()?;
        drop(out);

        // Open the replacement before the rename so a failure here leaves
        // the current file in charge.
        let file = open_data_file(tmp_path)?;
        fs::rename(tmp_path, self.dir.join(DATA_FILE))?;

        let reclaimed = inner.end.saturating_sub(end);
        inner.file = file;
        inner.keydir = keydir;
        inner.end = end;
        inner.stale = 0;
        inner.compact_above = self.options.compaction_threshold;

        sync_dir(&self.dir)?;
        info!(live_bytes = end, reclaimed, "compacted data file");
        Ok(())
    }

    fn maybe_compact(&self, inner: &mut Inner) {
        if inner.stale <= inner.compact_above {
            return;
        }
        debug!(stale = inner.stale, "stale bytes over threshold");
        if let Err(e) = self.compact_locked(inner) {
            // The write itself is durable; retry once another threshold's
            // worth of stale bytes has accumulated.
            inner.compact_above = inner.stale.saturating_add(self.options.compaction_threshold);
            warn!(error = %e, "automatic compaction failed");
        }
    }

    fn append(&self, inner: &mut Inner, kind: u8, key: &str, value: &[u8]) -> Result<ValuePos, KvError> {
        if inner.failed {
            return Err(KvError::Failed);
        }

        let record = encode_record(kind, key, value)?;
        if let Err(e) = write_synced(&mut inner.file, &record, self.options.sync_writes) {
            // Drop whatever part of the record made it to disk. If that is
            // not possible the next append would land behind garbage.
            if let Err(rollback) = inner.file.set_len(inner.end) {
                error!(error = %rollback, "cannot roll back partial record, refusing further writes");
                inner.failed = true;
            }
            return Err(e.into());
        }

        let pos = ValuePos {
            offset: inner.end + HEADER_LEN + key.len() as u64,
            len: value.len() as u32,
            record_len: record.len() as u64,
        };
        inner.end += pos.record_len;
        Ok(pos)
    }
}

impl KvEngine for LogStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        let inner = self.inner.lock();
        let pos = inner.keydir.get(key).ok_or(KvError::NotFound)?;
        read_value(&inner.file, pos)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let mut inner = self.inner.lock();
        let pos = self.append(&mut inner, KIND_PUT, key, value)?;
        if let Some(old) = inner.keydir.insert(key.to_string(), pos) {
            inner.stale += old.record_len;
        }
        self.maybe_compact(&mut inner);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut inner = self.inner.lock();
        if !inner.keydir.contains_key(key) {
            return Err(KvError::NotFound);
        }
        let tombstone = self.append(&mut inner, KIND_TOMBSTONE, key, &[])?;
        if let Some(old) = inner.keydir.remove(key) {
            inner.stale += old.record_len;
        }
        inner.stale += tombstone.record_len;
        self.maybe_compact(&mut inner);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.inner.lock().keydir.keys().cloned().collect())
    }
}

fn open_data_file(path: &Path) -> Result<File, KvError> {
    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_synced(file: &mut File, record: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(record)?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

fn encode_record(kind: u8, key: &str, value: &[u8]) -> Result<Vec<u8>, KvError> {
    let key_len = u32::try_from(key.len()).map_err(|_| KvError::KeyTooLarge(key.len()))?;
    let value_len = u32::try_from(value.len()).map_err(|_| KvError::ValueTooLarge(value.len()))?;

    let mut data_crc = crc32fast::Hasher::new();
    data_crc.update(key.as_bytes());
    data_crc.update(value);

    let mut record = Vec::with_capacity(HEADER_LEN as usize + key.len() + value.len());
    record.extend_from_slice(&[0; 4]);
    record.extend_from_slice(&key_len.to_be_bytes());
    record.extend_from_slice(&value_len.to_be_bytes());
    record.push(kind);
    record.extend_from_slice(&data_crc.finalize().to_be_bytes());
    let header_crc = crc32fast::hash(&record[4..HEADER_LEN as usize]);
    record[..4].copy_from_slice(&header_crc.to_be_bytes());
    record.extend_from_slice(key.as_bytes());
    record.extend_from_slice(value);
    Ok(record)
}

fn read_value(mut file: &File, pos: &ValuePos) -> Result<Vec<u8>, KvError> {
    let mut value = vec![0u8; pos.len as usize];
    file.seek(SeekFrom::Start(pos.offset))?;
    file.read_exact(&mut value)?;
    Ok(value)
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

struct Replayed {
    keydir: HashMap<String, ValuePos>,
    end: u64,
    file_len: u64,
    stale: u64,
}

fn replay(file: &File) -> Result<Replayed, KvError> {
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0))?;

    let mut keydir: HashMap<String, ValuePos> = HashMap::new();
    let mut stale = 0u64;
    let mut offset = 0u64;

    while offset < file_len {
        let remaining = file_len - offset;
        if remaining < HEADER_LEN {
            break;
        }
        let mut header = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header)?;
        if crc32fast::hash(&header[4..]) != be_u32(&header, 0) {
            return Err(KvError::Corrupt {
                offset,
                reason: "header checksum mismatch".to_string(),
            });
        }
        let key_len = be_u32(&header, 4);
        let value_len = be_u32(&header, 8);
        let kind = header[12];
        let data_crc = be_u32(&header, 13);

        let body_len = u64::from(key_len) + u64::from(value_len);
        if remaining - HEADER_LEN < body_len {
            // A verified header whose body runs past EOF: interrupted append.
            break;
        }

        let mut body = vec![0u8; body_len as usize];
        reader.read_exact(&mut body)?;
        let record_len = HEADER_LEN + body_len;
        if crc32fast::hash(&body) != data_crc {
            if offset + record_len == file_len {
                break;
            }
            return Err(KvError::Corrupt {
                offset,
                reason: "data checksum mismatch".to_string(),
            });
        }

        body.truncate(key_len as usize);
        let key = String::from_utf8(body).map_err(|_| KvError::Corrupt {
            offset,
            reason: "key is not valid UTF-8".to_string(),
        })?;

        match kind {
            KIND_PUT => {
                let pos = ValuePos {
                    offset: offset + HEADER_LEN + u64::from(key_len),
                    len: value_len,
                    record_len,
                };
                if let Some(old) = keydir.insert(key, pos) {
                    stale += old.record_len;
                }
            }
            KIND_TOMBSTONE => {
                if let Some(old) = keydir.remove(&key) {
                    stale += old.record_len;
                }
                stale += record_len;
            }
            other => {
                return Err(KvError::Corrupt {
                    offset,
                    reason: format!("unknown record kind {other}"),
                });
            }
        }
        offset += record_len;
    }

    Ok(Replayed {
        keydir,
        end: offset,
        file_len,
        stale,
    })
}
