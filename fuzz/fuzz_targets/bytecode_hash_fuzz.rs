#![no_main]
use libfuzzer_sys::fuzz_target;
use zk_aa_core::{
    constants::{
        BYTECODE_WORD_SIZE,
        MAX_BYTECODE_WORDS,
    },
    hash_bytecode,
    pad_bytecode,
    primitives::CodeHash,
};

fuzz_target!(|code: &[u8]| {
    if code.len() > (MAX_BYTECODE_WORDS - 1) * BYTECODE_WORD_SIZE {
        return;
    }
    let padded = pad_bytecode(code);
    let hash = hash_bytecode(&padded).expect("padded code is always hashable");

    assert_eq!(hash.code_len(), padded.len());
    assert_eq!(CodeHash::from_packed(hash.into_inner()), Ok(hash));

    if hash_bytecode(code).is_ok() {
        assert_eq!(padded, code);
    }
});
