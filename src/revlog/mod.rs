// Revision log: versions of one object stored as base snapshots and deltas
// in a byte store that grows at the front.
//
// Each write inserts a whole entry at offset 0. An entry is addressed by its
// position, `store_len_after_write - 1`, which does not change as newer
// entries are inserted in front of it; its current offset is
// `store_len - 1 - position`. A delta names its base by position, and a
// base is always older, so chains only point towards the back.
//
// Write policy:
//   - no base (empty store or caller opted out): base entry
//   - base chain already `max_delta_depth` deltas deep: base entry
//   - packed diff not at least `min_diff_saving` smaller than the data:
//     base entry
//   - otherwise a delta entry

pub mod entry;
pub mod store;

use std::fmt;
use std::io;

use log::debug;

use crate::diff::{DiffScript, ScriptError, TichyDiff, apply};
use crate::varint::VarIntError;

pub use entry::{Entry, EntryHeader, EntryKind};
pub use store::{ByteStore, FileStore, MemoryStore, StoreReader};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RevlogError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[source] io::Error),
    /// The position does not address an entry.
    #[error("invalid position {position} for a store of {store_len} bytes")]
    InvalidPosition { position: Position, store_len: u64 },
    /// An entry ended before its declared size.
    #[error("revlog entry truncated: unexpected end of stream")]
    EndOfStream,
    /// Entry framing or chain structure is broken.
    #[error("corrupt revlog: {0}")]
    Corrupt(String),
    /// A stored diff could not be decoded or applied.
    #[error("stored diff: {0}")]
    Script(#[from] ScriptError),
}

impl From<io::Error> for RevlogError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            RevlogError::EndOfStream
        } else {
            RevlogError::Store(e)
        }
    }
}

impl From<VarIntError> for RevlogError {
    fn from(e: VarIntError) -> Self {
        match e {
            VarIntError::EndOfStream => RevlogError::EndOfStream,
            VarIntError::Io(e) => RevlogError::from(e),
            other => RevlogError::Corrupt(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Position and policy
// ---------------------------------------------------------------------------

/// Stable handle to a stored version, counted from the back of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(pub u64);

impl Position {
    /// Offset of the entry in a store of `store_len` bytes.
    pub fn offset(self, store_len: u64) -> Option<u64> {
        (self.0 < store_len).then(|| store_len - 1 - self.0)
    }

    /// Position of the entry at `offset` in a store of `store_len` bytes.
    pub fn at_offset(offset: u64, store_len: u64) -> Self {
        Position(store_len - 1 - offset)
    }
}

impl From<u64> for Position {
    fn from(p: u64) -> Self {
        Position(p)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Limits on how versions are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Deltas allowed between any version and its base snapshot.
    pub max_delta_depth: usize,
    /// Bytes a delta must save over a snapshot to be worth storing.
    pub min_diff_saving: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_delta_depth: 10,
            min_diff_saving: 4,
        }
    }
}

/// One line of [`Revlog::inventory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryEntry {
    pub kind: EntryKind,
    pub body_size: u64,
    pub position: Position,
    pub header_len: usize,
}

// ---------------------------------------------------------------------------
// Revlog
// ---------------------------------------------------------------------------

pub struct Revlog<S: ByteStore = MemoryStore> {
    store: S,
    policy: Policy,
    differ: TichyDiff,
}

impl Revlog<MemoryStore> {
    /// An empty in-memory revlog.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: ByteStore> Revlog<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, Policy::default())
    }

    pub fn with_policy(store: S, policy: Policy) -> Self {
        Self {
            store,
            policy,
            differ: TichyDiff::default(),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Position of the newest entry, if any.
    pub fn head(&self) -> Option<Position> {
        let len = self.store.len();
        (len > 0).then(|| Position(len - 1))
    }

    /// Store `data`, diffed against the newest entry when there is one.
    pub fn add(&mut self, data: &[u8]) -> Result<Position, RevlogError> {
        let base = self.head();
        self.add_with_base(data, base)
    }

    /// Store `data` diffed against the entry at `base`, or as a snapshot
    /// when `base` is `None`. Returns the new entry's position.
    pub fn add_with_base(
        &mut self,
        data: &[u8],
        base: Option<Position>,
    ) -> Result<Position, RevlogError> {
        let base_position = match base {
            Some(p) if !self.store.is_empty() => p,
            _ => {
                debug!("revlog: base entry of {} bytes (no base)", data.len());
                return self.write(&Entry::Base { data: data.to_vec() });
            }
        };

        let (content, depth) = self.resolve(base_position)?;
        if depth >= self.policy.max_delta_depth {
            debug!(
                "revlog: base entry of {} bytes (chain at {base_position} is {depth} deep)",
                data.len()
            );
            return self.write(&Entry::Base { data: data.to_vec() });
        }

        let packed = self.differ.diff(&content, data).pack_to_vec();
        if packed.len().saturating_add(self.policy.min_diff_saving) >= data.len() {
            debug!(
                "revlog: base entry of {} bytes (diff of {} bytes saves too little)",
                data.len(),
                packed.len()
            );
            return self.write(&Entry::Base { data: data.to_vec() });
        }

        debug!(
            "revlog: delta entry of {} bytes against {base_position} (depth {})",
            packed.len(),
            depth + 1
        );
        self.write(&Entry::Delta {
            base_position,
            diff: packed,
        })
    }

    fn write(&mut self, entry: &Entry) -> Result<Position, RevlogError> {
        self.store.insert_front(&entry.encode()).map_err(RevlogError::Store)?;
        // The entry is at offset 0 of a non-empty store.
        Ok(Position(self.store.len() - 1))
    }

    /// Reconstruct the version stored at `position`.
    ///
    /// Position 0 is never returned by a write of a non-empty entry and is
    /// rejected.
    pub fn get(&self, position: Position) -> Result<Vec<u8>, RevlogError> {
        if position.0 == 0 {
            return Err(RevlogError::InvalidPosition {
                position,
                store_len: self.store.len(),
            });
        }
        self.resolve(position).map(|(content, _)| content)
    }

    /// Number of deltas applied when reconstructing `position`.
    pub fn delta_depth(&self, position: Position) -> Result<usize, RevlogError> {
        let mut depth = 0;
        let mut current = position;
        loop {
            match self.read_entry(current)? {
                Entry::Base { .. } => return Ok(depth),
                Entry::Delta { base_position, .. } => {
                    check_link(current, base_position)?;
                    depth += 1;
                    current = base_position;
                }
            }
        }
    }

    /// Content of `position` and its delta depth. Walks the chain down to
    /// its snapshot, then applies the diffs oldest first.
    fn resolve(&self, position: Position) -> Result<(Vec<u8>, usize), RevlogError> {
        let mut diffs = Vec::new();
        let mut current = position;
        let mut content = loop {
            match self.read_entry(current)? {
                Entry::Base { data } => break data,
                Entry::Delta { base_position, diff } => {
                    check_link(current, base_position)?;
                    diffs.push(diff);
                    current = base_position;
                }
            }
        };

        for diff in diffs.iter().rev() {
            let script = DiffScript::unpack(diff)?;
            content = apply(&content, &script)?;
        }
        Ok((content, diffs.len()))
    }

    fn read_entry(&self, position: Position) -> Result<Entry, RevlogError> {
        let len = self.store.len();
        let offset = position
            .offset(len)
            .ok_or(RevlogError::InvalidPosition { position, store_len: len })?;
        Entry::read_from(&mut self.store.reader(offset), len - offset)
    }

    /// Headers of all entries, newest first.
    pub fn inventory(&self) -> Result<Vec<InventoryEntry>, RevlogError> {
        let len = self.store.len();
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < len {
            let header = Entry::read_header(&mut self.store.reader(offset), len - offset)?;
            out.push(InventoryEntry {
                kind: header.kind,
                body_size: header.body_size,
                position: Position::at_offset(offset, len),
                header_len: header.header_len,
            });
            offset += header.entry_len();
        }
        Ok(out)
    }
}

impl<S: ByteStore + fmt::Debug> fmt::Debug for Revlog<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revlog")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish()
    }
}

/// A delta may only reference an older entry.
fn check_link(position: Position, base_position: Position) -> Result<(), RevlogError> {
    if base_position >= position {
        return Err(RevlogError::Corrupt(format!(
            "delta at {position} references base {base_position}, which is not older"
        )));
    }
    Ok(())
}
