#![no_main]
use libfuzzer_sys::fuzz_target;
use revdelta::diff::{self, DiffScript};

fuzz_target!(|data: &[u8]| {
    let mid = data.len() / 2;
    let (base, new) = data.split_at(mid);

    let script = diff::diff(base, new);
    let packed = script.pack_to_vec();
    let decoded = DiffScript::unpack(&packed).unwrap();
    assert_eq!(decoded, script);
    assert_eq!(diff::apply(base, &decoded).unwrap(), new);
});
