#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let once = kiln_core::path::normalize_absolute_path(text);

    // Fingerprints depend on normalized paths being a fixed point, so a
    // second pass must never change the result.
    let twice = kiln_core::path::normalize_absolute_path(&once);
    assert_eq!(twice, once, "lexical path normalization is not idempotent");

    if kiln_core::path::is_absolute_path(text) && !text.contains('\\') {
        assert!(
            kiln_core::path::is_absolute_path(&once),
            "normalization dropped absoluteness: {text:?} -> {once:?}"
        );
    }
});
