//! Fuzz target for capability grant matching.
//!
//! A grant must never allow a topic its patterns do not cover.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_realtime::{Capability, CapabilityGrant, Operation, Topic};

#[derive(Debug, Arbitrary)]
struct Input {
    pattern: String,
    topic: String,
    publish: bool,
}

fuzz_target!(|input: Input| {
    let Ok(topic) = Topic::parse(&input.topic) else {
        return;
    };

    let mut capability = Capability::new();
    capability.insert(input.pattern.clone(), vec![Operation::Subscribe]);
    let grant = CapabilityGrant {
        token: "fuzz".into(),
        client_id: "fuzz".into(),
        capability,
        issued_at: 0,
        expires_at: u64::MAX,
    };

    let operation = if input.publish {
        Operation::Publish
    } else {
        Operation::Subscribe
    };

    if grant.allows(&topic, operation) {
        assert_eq!(operation, Operation::Subscribe);
        let name = topic.to_string();
        let covered = match input.pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == input.pattern,
        };
        assert!(covered, "{} allowed {}", input.pattern, name);
    }
});
