//! Revdelta: Rabin-anchored binary diffs and a prepend-only revision log.
//!
//! The crate provides:
//! - A varint codec with side-channel bits (`varint`)
//! - Rabin fingerprints over GF(2), table-driven and exact (`fingerprint`)
//! - Edit scripts and the anchored diff algorithm (`diff`)
//! - A revision log over front-insertable byte stores (`revlog`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use revdelta::diff;
//!
//! let base = b"The quick brown fox jumps over the lazy dog";
//! let new = b"The quick brown fox leaps over the lazy dog";
//!
//! let script = diff::diff(base, new);
//! let packed = script.pack_to_vec();
//! let loaded = diff::DiffScript::unpack(&packed).unwrap();
//! assert_eq!(diff::apply(base, &loaded).unwrap(), new);
//! ```
//!
//! Storing versions:
//!
//! ```
//! use revdelta::revlog::Revlog;
//!
//! let mut log = Revlog::in_memory();
//! let v1 = log.add(b"Some initial data").unwrap();
//! let v2 = log.add(b"Some initial data and some changes").unwrap();
//! assert_eq!(log.get(v1).unwrap(), b"Some initial data");
//! assert_eq!(log.get(v2).unwrap(), b"Some initial data and some changes");
//! ```

pub mod diff;
pub mod fingerprint;
pub mod io;
pub mod revlog;
pub mod varint;

#[cfg(feature = "cli")]
pub mod cli;
