// Binary diffs: edit scripts, their wire format, and the anchored diff
// algorithm that produces them.
//
// - `script`: `Operation`, `DiffScript`, pack/unpack
// - `index`:  fingerprint index of base windows
// - `tichy`:  the greedy rolling-hash diff and `apply`

pub mod index;
pub mod script;
pub mod tichy;

pub use script::{DiffScript, Operation, ScriptError};
pub use tichy::{TichyDiff, apply, diff};

/// Anchor window width in bytes.
pub const RABIN_WINDOW: usize = 16;

/// Irreducible degree-53 modulus used for anchor fingerprints.
pub const RABIN_POLYNOMIAL: u64 = 9_256_118_209_264_353;
