// Byte stores that grow at the front.
//
// The revision log only ever inserts at offset 0 and reads forward from an
// arbitrary offset, so that is the whole contract. Offsets are relative to
// the current front; callers that need stable handles count from the back.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// A byte sequence supporting front insertion and positioned reads.
pub trait ByteStore {
    /// Current length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `data` before the first byte.
    fn insert_front(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read bytes starting at `offset` into `buf`.
    /// Returns the number of bytes read, 0 at or past the end.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Sequential reader starting at `offset`.
    fn reader(&self, offset: u64) -> StoreReader<'_, Self>
    where
        Self: Sized,
    {
        StoreReader {
            store: self,
            offset,
        }
    }
}

/// `io::Read` adapter over a [`ByteStore`].
pub struct StoreReader<'a, S: ByteStore> {
    store: &'a S,
    offset: u64,
}

impl<S: ByteStore> StoreReader<'_, S> {
    /// Offset of the next byte to read.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<S: ByteStore> Read for StoreReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.store.read_at(self.offset, buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    data: Vec<u8>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteStore for MemoryStore {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn insert_front(&mut self, data: &[u8]) -> io::Result<()> {
        self.data.splice(0..0, data.iter().copied());
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Some(available) = usize::try_from(offset)
            .ok()
            .and_then(|offset| self.data.get(offset..))
        else {
            return Ok(0);
        };
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// A store kept in a single file.
///
/// Front insertion rewrites the file: the new bytes and the old content go
/// to a temporary file in the same directory, which then replaces the
/// original by rename. A crash leaves either the old or the new file.
///
/// Reads are positional and never move a shared cursor, so `&FileStore`
/// can be read from several threads at once.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: Option<File>,
    len: u64,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; it is
    /// created on the first insert.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        match File::open(&path) {
            Ok(file) => {
                let len = file.metadata()?.len();
                Ok(Self {
                    path,
                    file: Some(file),
                    len,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self {
                path,
                file: None,
                len: 0,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl ByteStore for FileStore {
    fn len(&self) -> u64 {
        self.len
    }

    fn insert_front(&mut self, data: &[u8]) -> io::Result<()> {
        let tmp = NamedTempFile::new_in(self.dir())?;
        let mut writer = BufWriter::new(tmp);
        writer.write_all(data)?;
        if let Some(file) = &self.file {
            let mut old = file;
            old.seek(SeekFrom::Start(0))?;
            let copied = io::copy(&mut old, &mut writer)?;
            if copied != self.len {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("store file changed size: expected {} bytes, read {copied}", self.len),
                ));
            }
        }
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        // The handle returned by persist already points at the new content.
        self.file = Some(tmp.persist(&self.path).map_err(|e| e.error)?);
        self.len += data.len() as u64;
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Some(file) = self.file.as_ref() else {
            return Ok(0);
        };
        if offset >= self.len {
            return Ok(0);
        }
        let remaining = usize::try_from(self.len - offset).unwrap_or(usize::MAX);
        let n = buf.len().min(remaining);
        read_file_at(file, offset, &mut buf[..n])
    }
}

#[cfg(unix)]
fn read_file_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_file_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all<S: ByteStore>(store: &S, offset: u64) -> Vec<u8> {
        let mut out = Vec::new();
        store.reader(offset).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn memory_store_front_insert() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        store.insert_front(b"world").unwrap();
        store.insert_front(b"hello ").unwrap();
        assert_eq!(store.as_bytes(), b"hello world");
        assert_eq!(store.len(), 11);
        assert_eq!(read_all(&store, 6), b"world");
        assert!(read_all(&store, 100).is_empty());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let mut store = FileStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(read_all(&store, 0).is_empty());
        store.insert_front(b"tail").unwrap();
        store.insert_front(b"head-").unwrap();
        assert_eq!(read_all(&store, 0), b"head-tail");
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.len(), 9);
        assert_eq!(read_all(&store, 5), b"tail");
        assert_eq!(std::fs::read(&path).unwrap(), b"head-tail");
    }

    #[test]
    fn reader_tracks_offset() {
        let store = MemoryStore::from_bytes(b"abcdef".to_vec());
        let mut reader = store.reader(2);
        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cde");
        assert_eq!(reader.offset(), 5);
    }

    #[test]
    fn file_store_parallel_reads_see_their_own_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("store.bin")).unwrap();
        // 64 blocks of 256 bytes; block i is filled with byte i.
        for i in (0..64u8).rev() {
            store.insert_front(&[i; 256]).unwrap();
        }

        let store = &store;
        std::thread::scope(|scope| {
            for t in 0..8u64 {
                scope.spawn(move || {
                    let mut buf = [0u8; 256];
                    for round in 0..500u64 {
                        let block = (t * 7 + round) % 64;
                        let mut reader = store.reader(block * 256);
                        reader.read_exact(&mut buf).unwrap();
                        assert!(buf.iter().all(|&b| u64::from(b) == block), "block {block}");
                    }
                });
            }
        });
    }

    #[cfg(unix)]
    #[test]
    fn file_store_keeps_persisted_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let mut store = FileStore::open(&path).unwrap();
        store.insert_front(b"tail").unwrap();
        store.insert_front(b"head-").unwrap();

        // Reads go through the handle obtained from the last insert.
        std::fs::remove_file(&path).unwrap();
        assert_eq!(store.len(), 9);
        assert_eq!(read_all(&store, 0), b"head-tail");
    }
}
