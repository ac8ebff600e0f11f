// Variable-length integers with a side channel of "extra" bits.
//
// Base-128, least-significant group first. Bit 7 of every byte is the
// continuation flag. The first byte can carry up to 7 extra bits right
// below the flag, leaving `7 - extra_bits` value bits:
//
//   |1|extra|num_0|
//   |1|   num_1   |
//   |0|   num_2   |
//
// The stored number is |num_2|num_1|num_0|. With zero extra bits this is
// the MSB encoding git uses for pack object headers. Extra bits carry
// opcodes next to a length, e.g. diff operations and revlog entries.

use std::io::{self, Read, Write};

/// Largest number of extra bits the first byte can hold.
pub const MAX_EXTRA_BITS: u8 = 7;

/// Maximum encoded length for a 64-bit value.
///
/// With 7 extra bits the first byte holds no value bits, then
/// ceil(64/7) = 10 continuation bytes follow.
pub const MAX_VARINT_LEN: usize = 11;

const CONTINUATION: u8 = 0x80;
const GROUP_MASK: u8 = 0x7F;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VarIntError {
    /// More than [`MAX_EXTRA_BITS`] extra bits were requested.
    #[error("extra bit count {0} exceeds 7")]
    InvalidExtraSize(u8),
    /// Not enough input bytes to complete the integer.
    #[error("varint truncated: unexpected end of stream")]
    EndOfStream,
    /// Value does not fit in 64 bits.
    #[error("varint overflow")]
    Overflow,
    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for VarIntError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            VarIntError::EndOfStream
        } else {
            VarIntError::Io(e)
        }
    }
}

impl From<VarIntError> for io::Error {
    fn from(e: VarIntError) -> io::Error {
        match e {
            VarIntError::Io(e) => e,
            VarIntError::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A decoded integer together with its side-channel bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub value: u64,
    pub extra: u8,
    /// Number of bytes consumed.
    pub len: usize,
}

#[inline]
fn check_extra_bits(extra_bits: u8) -> Result<(), VarIntError> {
    if extra_bits > MAX_EXTRA_BITS {
        return Err(VarIntError::InvalidExtraSize(extra_bits));
    }
    Ok(())
}

#[inline]
fn low_mask(bits: u8) -> u64 {
    (1u64 << bits) - 1
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `num` with `extra_bits` bits of `extra` into `buf`, starting at
/// index 0. Returns the number of bytes written (1..=11).
///
/// Bits of `extra` above `extra_bits` are discarded.
pub fn encode(
    num: u64,
    extra: u8,
    extra_bits: u8,
    buf: &mut [u8; MAX_VARINT_LEN],
) -> Result<usize, VarIntError> {
    check_extra_bits(extra_bits)?;
    Ok(encode_checked(num, extra, extra_bits, buf))
}

fn encode_checked(num: u64, extra: u8, extra_bits: u8, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let first_bits = 7 - extra_bits;
    let extra = u64::from(extra) & low_mask(extra_bits);

    let mut first = ((extra << first_bits) | (num & low_mask(first_bits))) as u8;
    let mut remaining = num >> first_bits;
    if remaining != 0 {
        first |= CONTINUATION;
    }
    buf[0] = first;

    let mut len = 1;
    while remaining != 0 {
        let mut byte = remaining as u8 & GROUP_MASK;
        remaining >>= 7;
        if remaining != 0 {
            byte |= CONTINUATION;
        }
        buf[len] = byte;
        len += 1;
    }
    len
}

/// Encode a plain `u64` (no extra bits) and write it to a sink.
/// Returns the number of bytes written.
pub fn write<W: Write>(w: &mut W, num: u64) -> io::Result<usize> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_checked(num, 0, 0, &mut buf);
    w.write_all(&buf[..len])?;
    Ok(len)
}

/// Encode `num` plus extra bits and write it to a sink.
/// Returns the number of bytes written.
pub fn write_with_extra<W: Write>(
    w: &mut W,
    num: u64,
    extra: u8,
    extra_bits: u8,
) -> Result<usize, VarIntError> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode(num, extra, extra_bits, &mut buf)?;
    w.write_all(&buf[..len]).map_err(VarIntError::Io)?;
    Ok(len)
}

/// Return the encoded byte length of `num` with `extra_bits` extra bits.
///
/// `extra_bits` above [`MAX_EXTRA_BITS`] is clamped.
#[inline]
pub fn encoded_len(num: u64, extra_bits: u8) -> usize {
    let first_bits = u32::from(7 - extra_bits.min(MAX_EXTRA_BITS));
    let bits = 64 - num.leading_zeros();
    if bits <= first_bits {
        1
    } else {
        1 + (bits - first_bits).div_ceil(7) as usize
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_with<F>(extra_bits: u8, mut next_byte: F) -> Result<Decoded, VarIntError>
where
    F: FnMut() -> Result<u8, VarIntError>,
{
    check_extra_bits(extra_bits)?;

    let first = next_byte()?;
    let first_bits = 7 - extra_bits;
    let extra = if extra_bits > 0 {
        (first & GROUP_MASK) >> first_bits
    } else {
        0
    };
    let mut value = u64::from(first) & low_mask(first_bits);
    let mut more = first & CONTINUATION != 0;
    let mut shift = u32::from(first_bits);
    let mut len = 1;

    while more {
        if len == MAX_VARINT_LEN {
            return Err(VarIntError::Overflow);
        }
        let byte = next_byte()?;
        let group = u64::from(byte & GROUP_MASK);
        if group != 0 {
            if shift >= 64 || (group << shift) >> shift != group {
                return Err(VarIntError::Overflow);
            }
            value |= group << shift;
        }
        more = byte & CONTINUATION != 0;
        shift += 7;
        len += 1;
    }

    Ok(Decoded { value, extra, len })
}

/// Decode a varint with `extra_bits` extra bits from the front of `data`.
pub fn read_with_extra(data: &[u8], extra_bits: u8) -> Result<Decoded, VarIntError> {
    let mut bytes = data.iter();
    decode_with(extra_bits, || {
        bytes.next().copied().ok_or(VarIntError::EndOfStream)
    })
}

/// Decode a plain varint from the front of `data`.
/// Returns `(value, bytes_consumed)`.
pub fn read(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let d = read_with_extra(data, 0)?;
    Ok((d.value, d.len))
}

/// Decode a plain varint into a `usize`.
pub fn read_usize(data: &[u8]) -> Result<(usize, usize), VarIntError> {
    let (val, len) = read(data)?;
    let val = usize::try_from(val).map_err(|_| VarIntError::Overflow)?;
    Ok((val, len))
}

/// Read a varint with `extra_bits` extra bits from a streaming source.
///
/// Reads exactly the bytes of the integer, nothing more.
pub fn stream_read_with_extra<R: Read>(r: &mut R, extra_bits: u8) -> Result<Decoded, VarIntError> {
    let mut buf = [0u8; 1];
    decode_with(extra_bits, || {
        r.read_exact(&mut buf)?;
        Ok(buf[0])
    })
}

/// Read a plain varint from a streaming source.
/// Returns `(value, bytes_consumed)`.
pub fn stream_read<R: Read>(r: &mut R) -> Result<(u64, usize), VarIntError> {
    let d = stream_read_with_extra(r, 0)?;
    Ok((d.value, d.len))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
