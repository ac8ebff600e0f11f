#![no_main]
use libfuzzer_sys::fuzz_target;
use revdelta::revlog::{MemoryStore, Position, Revlog};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a store image: reads must fail cleanly, never panic.
    let log = Revlog::new(MemoryStore::from_bytes(data.to_vec()));
    let _ = log.inventory();
    for p in (0..data.len() as u64).take(64) {
        let _ = log.get(Position(p));
    }

    // Splitting the input into versions must always round-trip.
    let mut log = Revlog::in_memory();
    let mut added = Vec::new();
    for chunk in data.split(|&b| b == 0xFF).take(16) {
        let position = log.add(chunk).unwrap();
        added.push((position, chunk));
    }
    for (position, chunk) in added {
        assert_eq!(log.get(position).unwrap(), chunk);
    }
});
