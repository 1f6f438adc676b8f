#![no_main]

use chatops_ssh_bridge::domain::SourceRole;
use chatops_ssh_bridge::http::{SlackAction, SlackEnvelope, classify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing untrusted webhook bodies must never panic
    if let Ok(envelope) = serde_json::from_slice::<SlackEnvelope>(data) {
        if let SlackAction::Dispatch { request, .. } = classify(envelope) {
            assert_eq!(request.source_role, SourceRole::User);
            assert!(request.raw_text.starts_with('/'));
        }
    }
});
