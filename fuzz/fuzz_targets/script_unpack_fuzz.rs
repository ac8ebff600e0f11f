#![no_main]
use libfuzzer_sys::fuzz_target;
use revdelta::diff::{self, DiffScript};

fuzz_target!(|data: &[u8]| {
    // First byte picks how much of the input is used as the base.
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(rest.len());
    let (base, packed) = rest.split_at(split);
    if let Ok(script) = DiffScript::unpack(packed) {
        if let Ok(out) = diff::apply(base, &script) {
            assert_eq!(out.len(), script.target_len());
        }
    }
});
