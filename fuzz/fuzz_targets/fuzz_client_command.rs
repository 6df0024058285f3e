//! Fuzz target for WebSocket command frames.
//!
//! Frames come straight off the socket, so decoding a command and parsing
//! its channel must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_realtime::{ClientCommand, Topic};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(command) = serde_json::from_str::<ClientCommand>(s) {
        let channel = match &command {
            ClientCommand::Subscribe { channel }
            | ClientCommand::Unsubscribe { channel }
            | ClientCommand::Publish { channel, .. } => Some(channel.as_str()),
            ClientCommand::Ping => None,
        };
        if let Some(channel) = channel {
            if let Ok(topic) = Topic::parse(channel) {
                // Display must round-trip through parse.
                assert_eq!(Topic::parse(&topic.to_string()).ok(), Some(topic));
            }
        }
    }

    let _ = Topic::parse(s);
});
