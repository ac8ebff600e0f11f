// Revlog entry codec.
//
//   header = varint(body_size, kind, extra_bits = 1)
//   body   = data                           (kind 0, base)
//          | varint(base_position) ++ diff  (kind 1, delta)

use std::fmt;
use std::io::{Read, Write};

use super::{Position, RevlogError};
use crate::varint;

const KIND_BITS: u8 = 1;

/// Entry discriminant as stored in the header's extra bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Base,
    Delta,
}

impl EntryKind {
    pub fn opcode(self) -> u8 {
        match self {
            EntryKind::Base => 0,
            EntryKind::Delta => 1,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0 => Some(EntryKind::Base),
            1 => Some(EntryKind::Delta),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Base => "base",
            EntryKind::Delta => "delta",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded entry header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: EntryKind,
    pub body_size: u64,
    /// Encoded length of the header itself.
    pub header_len: usize,
}

impl EntryHeader {
    pub fn entry_len(&self) -> u64 {
        (self.header_len as u64).saturating_add(self.body_size)
    }
}

/// A stored version: a full snapshot or a packed diff against an older one.
#[derive(Clone, PartialEq, Eq)]
pub enum Entry {
    Base { data: Vec<u8> },
    Delta { base_position: Position, diff: Vec<u8> },
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Base { .. } => EntryKind::Base,
            Entry::Delta { .. } => EntryKind::Delta,
        }
    }

    fn body_size(&self) -> usize {
        match self {
            Entry::Base { data } => data.len(),
            Entry::Delta { base_position, diff } => {
                varint::encoded_len(base_position.0, 0) + diff.len()
            }
        }
    }

    /// Serialized form, header included.
    pub fn encode(&self) -> Vec<u8> {
        let body_size = self.body_size();
        let mut out = Vec::with_capacity(varint::encoded_len(body_size as u64, KIND_BITS) + body_size);
        // Writing into a Vec cannot fail and the extra bit count is valid.
        let _ = self.write_to(&mut out);
        out
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<usize, RevlogError> {
        let body_size = self.body_size();
        let mut n = varint::write_with_extra(w, body_size as u64, self.kind().opcode(), KIND_BITS)?;
        match self {
            Entry::Base { data } => w.write_all(data)?,
            Entry::Delta { base_position, diff } => {
                varint::write(w, base_position.0)?;
                w.write_all(diff)?;
            }
        }
        n += body_size;
        Ok(n)
    }

    /// Read a header. `available` is the number of bytes left in the store
    /// from the header's first byte; a body running past it is corrupt.
    pub fn read_header<R: Read>(r: &mut R, available: u64) -> Result<EntryHeader, RevlogError> {
        let decoded = varint::stream_read_with_extra(r, KIND_BITS)?;
        let kind = EntryKind::from_opcode(decoded.extra)
            .ok_or_else(|| RevlogError::Corrupt(format!("invalid entry opcode {}", decoded.extra)))?;
        let header = EntryHeader {
            kind,
            body_size: decoded.value,
            header_len: decoded.len,
        };
        if header.entry_len() > available {
            return Err(RevlogError::Corrupt(format!(
                "{} entry of {} bytes overruns the {available} bytes left in the store",
                kind,
                header.entry_len()
            )));
        }
        Ok(header)
    }

    /// Read a full entry starting at its header.
    pub fn read_from<R: Read>(r: &mut R, available: u64) -> Result<Self, RevlogError> {
        let header = Self::read_header(r, available)?;
        // Bounded by `available`, which is at most the store length.
        let body_size = usize::try_from(header.body_size)
            .map_err(|_| RevlogError::Corrupt("entry body exceeds address space".into()))?;

        match header.kind {
            EntryKind::Base => {
                let mut data = vec![0u8; body_size];
                r.read_exact(&mut data)?;
                Ok(Entry::Base { data })
            }
            EntryKind::Delta => {
                let (base_position, n) = varint::stream_read(r)?;
                let diff_len = body_size.checked_sub(n).ok_or_else(|| {
                    RevlogError::Corrupt("delta base position overruns entry body".into())
                })?;
                let mut diff = vec![0u8; diff_len];
                r.read_exact(&mut diff)?;
                Ok(Entry::Delta {
                    base_position: Position(base_position),
                    diff,
                })
            }
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Base { data } => write!(f, "Base({} bytes)", data.len()),
            Entry::Delta { base_position, diff } => {
                write!(f, "Delta(base {base_position}, {} bytes)", diff.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_layout() {
        let entry = Entry::Base { data: b"abc".to_vec() };
        assert_eq!(entry.encode(), vec![0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn delta_layout() {
        let entry = Entry::Delta {
            base_position: Position(200),
            diff: vec![0xAA, 0xBB],
        };
        // body = varint(200) = [0xC8, 0x01] ++ diff, so 4 bytes; kind bit 1.
        assert_eq!(entry.encode(), vec![0x44, 0xC8, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn read_back() {
        for entry in [
            Entry::Base { data: vec![7; 300] },
            Entry::Delta {
                base_position: Position(12345),
                diff: b"packed".to_vec(),
            },
        ] {
            let bytes = entry.encode();
            let decoded = Entry::read_from(&mut &bytes[..], bytes.len() as u64).unwrap();
            assert_eq!(decoded, entry);
        }
    }

    #[test]
    fn body_past_available_is_corrupt() {
        let bytes = Entry::Base { data: vec![1; 10] }.encode();
        let err = Entry::read_from(&mut &bytes[..], 5).unwrap_err();
        assert!(matches!(err, RevlogError::Corrupt(_)));
    }

    #[test]
    fn truncated_header() {
        let err = Entry::read_header(&mut &[0x80u8][..], 1).unwrap_err();
        assert!(matches!(err, RevlogError::EndOfStream));
    }
}
