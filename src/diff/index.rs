// Anchor index over a base buffer.
//
// The base is cut into non-overlapping windows starting at offset 0; a
// trailing partial window is not indexed. Each window's fingerprint maps
// to every offset that produced it, in base order.

use std::collections::HashMap;

use crate::fingerprint::{Fingerprint, WindowedRabinFingerprint};

#[derive(Debug, Default)]
pub struct AnchorIndex {
    map: HashMap<u64, Vec<usize>>,
    window: usize,
}

impl AnchorIndex {
    /// Index `base` using `rabin`'s window size. Leaves `rabin` reset.
    pub fn build(base: &[u8], rabin: &mut WindowedRabinFingerprint) -> Self {
        let window = rabin.window_size();
        let mut map: HashMap<u64, Vec<usize>> = HashMap::new();

        for (i, chunk) in base.chunks_exact(window).enumerate() {
            rabin.reset();
            rabin.push_bytes(chunk);
            map.entry(rabin.value()).or_default().push(i * window);
        }
        rabin.reset();

        Self { map, window }
    }

    /// Base offsets whose window has this fingerprint.
    pub fn find(&self, fingerprint: u64) -> &[usize] {
        self.map.get(&fingerprint).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of indexed windows.
    pub fn anchors(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
