#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let cleaned = nota::pdf::sanitize_response(s);
        // Sanitized output is always a brace-wrapped candidate object.
        assert!(cleaned.starts_with('{') && cleaned.ends_with('}'));
    }
});
