#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let once = kiln_core::strip_ansi_csi_seqs(text);
    assert!(
        once.len() <= text.len(),
        "stripping lengthened the input: {text:?} -> {once:?}"
    );

    let twice = kiln_core::strip_ansi_csi_seqs(&once);
    assert_eq!(twice, once, "CSI stripping is not idempotent");
});
