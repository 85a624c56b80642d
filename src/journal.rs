//! Append-only journal of checksummed entries.
//!
//! Every durable structure in the blog (the content log and the per-topic
//! subscriber registries) is a journal: a small header followed by frames of
//! `u32 length | rmp-serde body | u32 crc32`. Opening a journal replays every
//! frame. A frame cut short by a crash is truncated away on open; a checksum
//! mismatch on a complete frame is reported as corruption.

use crate::error::{BlogError, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Magic bytes for journal files.
const JOURNAL_MAGIC: &[u8; 4] = b"JNL\0";

/// Current journal format version.
const JOURNAL_VERSION: u8 = 1;

/// Header size (magic + version).
const HEADER_SIZE: u64 = 5;

/// Full header, written with a single call.
const JOURNAL_HEADER: [u8; HEADER_SIZE as usize] = [b'J', b'N', b'L', 0, JOURNAL_VERSION];

/// Frame overhead (length prefix + checksum).
const FRAME_OVERHEAD: u64 = 8;

/// Frames larger than this are treated as corruption.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

struct JournalFile {
    file: File,
    /// Offset where the next frame is written.
    end: u64,
    /// Number of writes since last sync.
    writes_since_sync: u64,
}

/// A typed append-only journal.
pub struct Journal<E> {
    path: PathBuf,
    inner: Mutex<JournalFile>,
    /// Sync every N writes (1 = every write).
    sync_interval: u64,
    _entry: PhantomData<fn() -> E>,
}

impl<E: Serialize + DeserializeOwned> Journal<E> {
    /// Open or create a journal, returning it with every entry replayed in
    /// write order alongside its frame offset.
    ///
    /// `sync_interval` of 0 or 1 syncs every write.
    pub fn open(path: impl AsRef<Path>, sync_interval: u64) -> Result<(Self, Vec<(u64, E)>)> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut entries = Vec::new();
        let len = file.metadata()?.len();
        let end = if len < HEADER_SIZE {
            // Empty, or a header cut short by a crash during creation
            let mut existing = Vec::new();
            file.read_to_end(&mut existing)?;
            if !JOURNAL_HEADER.starts_with(&existing) {
                return Err(BlogError::InvalidFormat("Invalid journal magic".into()));
            }
            if len > 0 {
                warn!(
                    path = %path.display(),
                    header_bytes = len,
                    "rewriting incomplete journal header"
                );
            }
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&JOURNAL_HEADER)?;
            file.sync_all()?;
            HEADER_SIZE
        } else {
            let end = Self::replay(&file, &mut entries)?;
            if end < len {
                warn!(
                    path = %path.display(),
                    dropped_bytes = len - end,
                    "truncating incomplete journal tail"
                );
                file.set_len(end)?;
                file.sync_all()?;
            }
            end
        };

        let journal = Self {
            path,
            inner: Mutex::new(JournalFile {
                file,
                end,
                writes_since_sync: 0,
            }),
            sync_interval: sync_interval.max(1),
            _entry: PhantomData,
        };

        Ok((journal, entries))
    }

    /// Append an entry, returning the offset of its frame.
    pub fn append(&self, entry: &E) -> Result<u64> {
        let frame = Self::encode_frame(entry)?;

        let mut inner = self.inner.lock();
        let offset = inner.end;
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&frame)?;
        inner.end += frame.len() as u64;

        inner.writes_since_sync += 1;
        if inner.writes_since_sync >= self.sync_interval {
            inner.file.sync_data()?;
            inner.writes_since_sync = 0;
        }

        Ok(offset)
    }

    /// Read the entry whose frame starts at `offset`.
    pub fn read_at(&self, offset: u64) -> Result<E> {
        let mut inner = self.inner.lock();
        if offset < HEADER_SIZE || offset >= inner.end {
            return Err(BlogError::Corruption(format!(
                "journal offset {} out of range",
                offset
            )));
        }
        inner.file.seek(SeekFrom::Start(offset))?;
        let (entry, _) = Self::read_frame(&mut inner.file)?;
        Ok(entry)
    }

    /// Replace the whole journal with `entries`, returning their new offsets.
    ///
    /// The new journal is written beside the old one and renamed over it, so a
    /// crash leaves either the old or the new file intact.
    pub fn rewrite(&self, entries: &[E]) -> Result<Vec<u64>> {
        let mut inner = self.inner.lock();

        let tmp_path = self.path.with_extension("compact");
        let mut tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;

        tmp.write_all(&JOURNAL_HEADER)?;

        let mut offsets = Vec::with_capacity(entries.len());
        let mut end = HEADER_SIZE;
        for entry in entries {
            let frame = Self::encode_frame(entry)?;
            tmp.write_all(&frame)?;
            offsets.push(end);
            end += frame.len() as u64;
        }
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;

        inner.file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        inner.end = end;
        inner.writes_since_sync = 0;

        Ok(offsets)
    }

    /// Force pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.sync_all()?;
        inner.writes_since_sync = 0;
        Ok(())
    }

    /// Current journal size in bytes.
    pub fn size(&self) -> u64 {
        self.inner.lock().end
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode_frame(entry: &E) -> Result<Vec<u8>> {
        let body = rmp_serde::to_vec(entry)?;
        if body.len() > MAX_FRAME_LEN {
            return Err(BlogError::InvalidInput(format!(
                "entry of {} bytes exceeds the {} byte limit",
                body.len(),
                MAX_FRAME_LEN
            )));
        }

        let mut frame = Vec::with_capacity(body.len() + FRAME_OVERHEAD as usize);
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        Ok(frame)
    }

    /// Read one frame, returning the entry and the frame's length.
    fn read_frame(reader: &mut impl Read) -> Result<(E, u64)> {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > MAX_FRAME_LEN {
            return Err(BlogError::Corruption("journal frame too large".into()));
        }

        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&body);
        if stored != computed {
            return Err(BlogError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        let entry = rmp_serde::from_slice(&body)?;
        Ok((entry, len as u64 + FRAME_OVERHEAD))
    }

    /// Replay all complete frames. Returns the offset just past the last one.
    fn replay(file: &File, entries: &mut Vec<(u64, E)>) -> Result<u64> {
        let mut file = file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        let len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        let mut version = [0u8; 1];
        reader.read_exact(&mut magic)?;
        reader.read_exact(&mut version)?;
        if &magic != JOURNAL_MAGIC {
            return Err(BlogError::InvalidFormat("Invalid journal magic".into()));
        }
        if version[0] != JOURNAL_VERSION {
            return Err(BlogError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                version[0]
            )));
        }

        let mut offset = HEADER_SIZE;
        while offset < len {
            match Self::read_frame(&mut reader) {
                Ok((entry, frame_len)) => {
                    entries.push((offset, entry));
                    offset += frame_len;
                }
                Err(BlogError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }

        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum TestEntry {
        Put { key: String, value: u64 },
        Remove { key: String },
    }

    fn put(key: &str, value: u64) -> TestEntry {
        TestEntry::Put {
            key: key.into(),
            value,
        }
    }

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let (journal, replayed) =
            Journal::<TestEntry>::open(dir.path().join("j.log"), 1).unwrap();
        assert!(replayed.is_empty());

        let first = journal.append(&put("a", 1)).unwrap();
        let second = journal.append(&TestEntry::Remove { key: "a".into() }).unwrap();

        assert_eq!(first, HEADER_SIZE);
        assert!(second > first);
        assert_eq!(journal.read_at(first).unwrap(), put("a", 1));
        assert_eq!(
            journal.read_at(second).unwrap(),
            TestEntry::Remove { key: "a".into() }
        );
    }

    #[test]
    fn test_replay_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");

        {
            let (journal, _) = Journal::<TestEntry>::open(&path, 100).unwrap();
            for i in 0..5 {
                journal.append(&put("k", i)).unwrap();
            }
            journal.sync().unwrap();
        }

        let (journal, replayed) = Journal::<TestEntry>::open(&path, 100).unwrap();
        assert_eq!(replayed.len(), 5);
        assert_eq!(replayed[4].1, put("k", 4));

        // Offsets from replay are readable
        assert_eq!(journal.read_at(replayed[2].0).unwrap(), put("k", 2));
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");

        let size_after_two = {
            let (journal, _) = Journal::<TestEntry>::open(&path, 1).unwrap();
            journal.append(&put("a", 1)).unwrap();
            journal.append(&put("b", 2)).unwrap();
            journal.size()
        };

        // Simulate a crash halfway through a third frame
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[42, 0, 0, 0, 1, 2, 3]).unwrap();
        }

        let (journal, replayed) = Journal::<TestEntry>::open(&path, 1).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(journal.size(), size_after_two);

        // Appends continue cleanly after the truncated tail
        journal.append(&put("c", 3)).unwrap();
        drop(journal);
        let (_, replayed) = Journal::<TestEntry>::open(&path, 1).unwrap();
        assert_eq!(replayed.len(), 3);
    }

    #[test]
    fn test_checksum_mismatch_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");

        {
            let (journal, _) = Journal::<TestEntry>::open(&path, 1).unwrap();
            journal.append(&put("a", 1)).unwrap();
            journal.append(&put("b", 2)).unwrap();
        }

        // Flip a byte inside the first frame's body
        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE + 5)).unwrap();
            let mut byte = [0u8; 1];
            file.read_exact(&mut byte).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE + 5)).unwrap();
            file.write_all(&[byte[0] ^ 0xff]).unwrap();
        }

        let result = Journal::<TestEntry>::open(&path, 1);
        assert!(matches!(result, Err(BlogError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_rewrite_compacts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");

        let (journal, _) = Journal::<TestEntry>::open(&path, 1).unwrap();
        for i in 0..10 {
            journal.append(&put("k", i)).unwrap();
        }
        let before = journal.size();

        let offsets = journal.rewrite(&[put("k", 9)]).unwrap();
        assert_eq!(offsets, vec![HEADER_SIZE]);
        assert!(journal.size() < before);
        assert_eq!(journal.read_at(offsets[0]).unwrap(), put("k", 9));

        // Appends land after the compacted content
        journal.append(&put("z", 0)).unwrap();
        drop(journal);
        let (_, replayed) = Journal::<TestEntry>::open(&path, 1).unwrap();
        assert_eq!(replayed.len(), 2);
    }

    #[test]
    fn test_invalid_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");
        fs::write(&path, b"NOPE\x01").unwrap();

        let result = Journal::<TestEntry>::open(&path, 1);
        assert!(matches!(result, Err(BlogError::InvalidFormat(_))));
    }

    #[test]
    fn test_torn_header_is_rewritten() {
        let dir = TempDir::new().unwrap();

        let torn_headers: [&[u8]; 4] = [b"", b"J", b"JNL", b"JNL\0"];
        for torn in torn_headers {
            let path = dir.path().join(format!("torn-{}.log", torn.len()));
            fs::write(&path, torn).unwrap();

            let (journal, replayed) = Journal::<TestEntry>::open(&path, 1).unwrap();
            assert!(replayed.is_empty());
            assert_eq!(journal.size(), HEADER_SIZE);
            assert_eq!(journal.append(&put("a", 1)).unwrap(), HEADER_SIZE);
            drop(journal);

            let (_, replayed) = Journal::<TestEntry>::open(&path, 1).unwrap();
            assert_eq!(replayed, vec![(HEADER_SIZE, put("a", 1))]);
        }
    }

    #[test]
    fn test_short_foreign_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");
        fs::write(&path, b"NO").unwrap();

        let result = Journal::<TestEntry>::open(&path, 1);
        assert!(matches!(result, Err(BlogError::InvalidFormat(_))));
        assert_eq!(fs::read(&path).unwrap(), b"NO");
    }
}
