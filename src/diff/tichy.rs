// Greedy block-move diff anchored on Rabin fingerprints.
//
// The base is indexed by fingerprints of its non-overlapping W-byte
// windows. A W-byte rolling fingerprint then slides over the new data; each
// window whose fingerprint hits the index is verified byte for byte and
// grown backward (never past the last emitted byte) and forward. The
// longest candidate becomes a copy, anything skipped over becomes an
// insert, and the scan resumes right after the copied span.
//
// After a match the rolling fingerprint is reset instead of re-primed.
// Windows starting before the end of the last copy are skipped, and by the
// time the scan reaches the first window that starts at or after it, the
// fingerprint has seen exactly that window's W bytes.

use log::trace;

use super::index::AnchorIndex;
use super::script::{DiffScript, Operation, ScriptError};
use super::{RABIN_POLYNOMIAL, RABIN_WINDOW};
use crate::fingerprint::{Fingerprint, Polynomial, WindowedRabinFingerprint};

/// A verified match, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    base_start: usize,
    base_end: usize,
    new_start: usize,
    new_end: usize,
}

impl Match {
    #[inline]
    fn span(&self) -> usize {
        self.base_end - self.base_start
    }
}

/// Reusable diff engine. Owns its rolling fingerprint and tables.
#[derive(Debug, Clone)]
pub struct TichyDiff {
    rabin: WindowedRabinFingerprint,
}

impl Default for TichyDiff {
    fn default() -> Self {
        Self::with_params(Polynomial::from_u64(RABIN_POLYNOMIAL), RABIN_WINDOW)
    }
}

impl TichyDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a custom anchor modulus and window width.
    ///
    /// Scripts produced with different parameters are still valid scripts;
    /// only match quality changes.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero or the degree of `polynomial` is outside
    /// `8..=54`.
    pub fn with_params(polynomial: Polynomial, window: usize) -> Self {
        Self {
            rabin: WindowedRabinFingerprint::new(polynomial, window),
        }
    }

    pub fn window(&self) -> usize {
        self.rabin.window_size()
    }

    /// Compute an edit script turning `base` into `new`.
    pub fn diff(&mut self, base: &[u8], new: &[u8]) -> DiffScript {
        let w = self.window();
        let mut script = DiffScript::new();
        if new.len() < w {
            script.insert(new);
            return script;
        }

        let index = AnchorIndex::build(base, &mut self.rabin);
        let mut collisions = 0usize;

        // new[..committed] is already covered by the script.
        let mut committed = 0;
        self.rabin.push_bytes(&new[..w - 1]);
        let mut i = w - 1;
        while i < new.len() {
            let pos = i;
            i += 1;
            self.rabin.push_byte(new[pos]);
            let window_start = pos + 1 - w;
            if window_start < committed {
                continue;
            }

            let candidates = index.find(self.rabin.value());
            if candidates.is_empty() {
                continue;
            }

            let mut best: Option<Match> = None;
            for &base_start in candidates {
                if base[base_start..base_start + w] != new[window_start..=pos] {
                    collisions += 1;
                    continue;
                }
                let m = expand_match(base, base_start, new, window_start, committed, w);
                if best.is_none_or(|b| m.span() > b.span()) {
                    best = Some(m);
                }
            }
            let Some(m) = best else {
                continue;
            };

            if committed < m.new_start {
                script.insert(&new[committed..m.new_start]);
            }
            script.copy(m.base_start, m.base_end);

            committed = pos.max(m.new_end) + 1;
            self.rabin.reset();
            i = committed;
        }
        self.rabin.reset();

        if committed < new.len() {
            script.insert(&new[committed..]);
        }

        trace!(
            "diff: base {} bytes ({} anchors), new {} bytes -> {} ops, {} fingerprint collisions",
            base.len(),
            index.anchors(),
            new.len(),
            script.len(),
            collisions
        );
        script
    }
}

/// Grow a verified `w`-byte match at (`base_pos`, `new_pos`) in both
/// directions. Backward growth stops at `committed` in the new data.
fn expand_match(
    base: &[u8],
    base_pos: usize,
    new: &[u8],
    new_pos: usize,
    committed: usize,
    w: usize,
) -> Match {
    let backward = base[..base_pos]
        .iter()
        .rev()
        .zip(new[committed..new_pos].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let forward = base[base_pos + w..]
        .iter()
        .zip(&new[new_pos + w..])
        .take_while(|(a, b)| a == b)
        .count();

    Match {
        base_start: base_pos - backward,
        base_end: base_pos + w - 1 + forward,
        new_start: new_pos - backward,
        new_end: new_pos + w - 1 + forward,
    }
}

/// Diff with the default 16-byte anchor window.
pub fn diff(base: &[u8], new: &[u8]) -> DiffScript {
    TichyDiff::default().diff(base, new)
}

/// Replay `script` against `base`.
///
/// A copy that reaches outside `base` is an error rather than a panic, so
/// scripts read back from storage can be applied safely.
pub fn apply(base: &[u8], script: &DiffScript) -> Result<Vec<u8>, ScriptError> {
    let capacity = script
        .iter()
        .fold(0usize, |acc, op| acc.saturating_add(op.target_len()));
    let mut out = Vec::with_capacity(capacity.min(base.len().saturating_mul(4).max(1 << 16)));

    for op in script {
        match op {
            Operation::Insert(data) => out.extend_from_slice(data),
            &Operation::Copy { start, end } => {
                if start > end {
                    return Err(ScriptError::InvalidRange { start });
                }
                let run = base.get(start..=end).ok_or(ScriptError::CopyOutOfBounds {
                    start,
                    end,
                    base_len: base.len(),
                })?;
                out.extend_from_slice(run);
            }
        }
    }
    Ok(out)
}
