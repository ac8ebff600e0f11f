// Edit scripts and their wire format.
//
// A script is a list of operations that rebuild a target from a base:
//   Insert(bytes)        literal bytes
//   Copy { start, end }  base[start..=end]
//
// Wire format, all integers are varints:
//
//   count
//   repeat count times:
//     header = varint(field, opcode, extra_bits = 1)
//     opcode 0 (insert): field = literal length, then the literal bytes
//     opcode 1 (copy):   field = start, then varint(end - start + 1)
//
// The decoder reads exactly `count` operations and leaves trailing bytes
// alone, so a script can be embedded in a larger record.

use std::fmt;
use std::io::{self, Write};

use crate::varint::{self, VarIntError};

/// Opcode of an insert operation.
pub const OP_INSERT: u8 = 0;
/// Opcode of a copy operation.
pub const OP_COPY: u8 = 1;

const OPCODE_BITS: u8 = 1;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("diff script truncated: unexpected end of stream")]
    EndOfStream,
    #[error("invalid diff opcode {0}")]
    InvalidOpcode(u8),
    #[error("insert of {len} bytes exceeds the {remaining} bytes left")]
    LengthExceedsInput { len: u64, remaining: usize },
    #[error("copy at {start} has an empty or reversed range")]
    InvalidRange { start: usize },
    #[error("copy {start}..={end} is outside a base of {base_len} bytes")]
    CopyOutOfBounds {
        start: usize,
        end: usize,
        base_len: usize,
    },
    #[error("diff script value overflow")]
    Overflow,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<VarIntError> for ScriptError {
    fn from(e: VarIntError) -> Self {
        match e {
            VarIntError::EndOfStream => ScriptError::EndOfStream,
            VarIntError::Overflow => ScriptError::Overflow,
            VarIntError::Io(e) => ScriptError::Io(e),
            other @ VarIntError::InvalidExtraSize(_) => {
                ScriptError::Io(io::Error::new(io::ErrorKind::InvalidInput, other))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// One step of an edit script.
#[derive(Clone, PartialEq, Eq)]
pub enum Operation {
    /// Literal bytes.
    Insert(Vec<u8>),
    /// Base bytes `start..=end`.
    Copy { start: usize, end: usize },
}

impl Operation {
    pub fn opcode(&self) -> u8 {
        match self {
            Operation::Insert(_) => OP_INSERT,
            Operation::Copy { .. } => OP_COPY,
        }
    }

    /// Number of target bytes this operation produces. A reversed copy
    /// range produces nothing.
    pub fn target_len(&self) -> usize {
        match self {
            Operation::Insert(data) => data.len(),
            Operation::Copy { start, end } => end
                .checked_sub(*start)
                .map_or(0, |span| span.saturating_add(1)),
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Operation::Insert(data) => {
                varint::encoded_len(data.len() as u64, OPCODE_BITS) + data.len()
            }
            Operation::Copy { start, end } => {
                varint::encoded_len(*start as u64, OPCODE_BITS)
                    + varint::encoded_len(copy_run(*start, *end), 0)
            }
        }
    }

    fn pack<W: Write>(&self, w: &mut W) -> Result<usize, ScriptError> {
        match self {
            Operation::Insert(data) => {
                let n = varint::write_with_extra(w, data.len() as u64, OP_INSERT, OPCODE_BITS)?;
                w.write_all(data)?;
                Ok(n + data.len())
            }
            Operation::Copy { start, end } => {
                let n = varint::write_with_extra(w, *start as u64, OP_COPY, OPCODE_BITS)?;
                Ok(n + varint::write(w, copy_run(*start, *end))?)
            }
        }
    }
}

// Run length as stored on the wire; scripts only hold `start <= end`.
fn copy_run(start: usize, end: usize) -> u64 {
    end.saturating_sub(start) as u64 + 1
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert(data) => match std::str::from_utf8(data) {
                Ok(s) if data.len() <= 64 => write!(f, "Insert({s:?})"),
                _ => write!(f, "Insert({} bytes)", data.len()),
            },
            Operation::Copy { start, end } => write!(f, "Copy({start}..={end})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// An ordered list of operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffScript {
    operations: Vec<Operation>,
}

impl DiffScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Operation> {
        self.operations.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Append an insert of `data`.
    pub fn insert(&mut self, data: impl Into<Vec<u8>>) {
        self.operations.push(Operation::Insert(data.into()));
    }

    /// Append a copy of base bytes `start..=end`.
    ///
    /// # Panics
    ///
    /// Panics if `end < start`.
    pub fn copy(&mut self, start: usize, end: usize) {
        assert!(start <= end, "copy range {start}..={end} is reversed");
        self.operations.push(Operation::Copy { start, end });
    }

    /// Append an operation.
    ///
    /// # Panics
    ///
    /// Panics on a copy with `end < start`.
    pub fn push(&mut self, op: Operation) {
        if let Operation::Copy { start, end } = op {
            assert!(start <= end, "copy range {start}..={end} is reversed");
        }
        self.operations.push(op);
    }

    /// Total number of bytes the script produces.
    pub fn target_len(&self) -> usize {
        self.operations.iter().map(Operation::target_len).sum()
    }

    /// Exact size of the packed form.
    pub fn packed_len(&self) -> usize {
        varint::encoded_len(self.operations.len() as u64, 0)
            + self.operations.iter().map(Operation::encoded_len).sum::<usize>()
    }

    /// Write the packed form to `w`. Returns the number of bytes written.
    pub fn pack<W: Write>(&self, w: &mut W) -> Result<usize, ScriptError> {
        let mut n = varint::write(w, self.operations.len() as u64)?;
        for op in &self.operations {
            n += op.pack(w)?;
        }
        Ok(n)
    }

    pub fn pack_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.packed_len());
        // Writing into a Vec cannot fail.
        let _ = self.pack(&mut out);
        out
    }

    /// Decode a packed script from the front of `data`, ignoring trailing
    /// bytes.
    pub fn unpack(data: &[u8]) -> Result<Self, ScriptError> {
        Self::unpack_prefix(data).map(|(script, _)| script)
    }

    /// Decode a packed script from the front of `data`.
    /// Returns the script and the number of bytes consumed.
    pub fn unpack_prefix(data: &[u8]) -> Result<(Self, usize), ScriptError> {
        let (count, mut pos) = varint::read(data)?;
        // Every operation takes at least one byte.
        let mut operations = Vec::with_capacity((count as usize).min(data.len() - pos));

        for _ in 0..count {
            let header = varint::read_with_extra(&data[pos..], OPCODE_BITS)?;
            pos += header.len;
            match header.extra {
                OP_INSERT => {
                    let remaining = data.len() - pos;
                    let len = usize::try_from(header.value)
                        .ok()
                        .filter(|&len| len <= remaining)
                        .ok_or(ScriptError::LengthExceedsInput {
                            len: header.value,
                            remaining,
                        })?;
                    operations.push(Operation::Insert(data[pos..pos + len].to_vec()));
                    pos += len;
                }
                OP_COPY => {
                    let start = usize::try_from(header.value).map_err(|_| ScriptError::Overflow)?;
                    let (run, n) = varint::read_usize(&data[pos..])?;
                    pos += n;
                    if run == 0 {
                        return Err(ScriptError::InvalidRange { start });
                    }
                    let end = start.checked_add(run - 1).ok_or(ScriptError::Overflow)?;
                    operations.push(Operation::Copy { start, end });
                }
                other => return Err(ScriptError::InvalidOpcode(other)),
            }
        }

        Ok((Self { operations }, pos))
    }
}

impl<'a> IntoIterator for &'a DiffScript {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl IntoIterator for DiffScript {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl FromIterator<Operation> for DiffScript {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut script = DiffScript::new();
        for op in iter {
            script.push(op);
        }
        script
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
