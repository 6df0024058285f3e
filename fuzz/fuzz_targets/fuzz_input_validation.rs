//! Fuzz target for HTTP input validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_node::validation::{
    validate_content, validate_email, validate_identifier, MAX_IDENTIFIER_LENGTH,
};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    if validate_identifier(&input).is_ok() {
        assert!(!input.is_empty());
        assert!(input.len() <= MAX_IDENTIFIER_LENGTH);
    }

    if validate_content(&input).is_ok() {
        assert!(!input.trim().is_empty());
    }

    let _ = validate_email(&input);
});
