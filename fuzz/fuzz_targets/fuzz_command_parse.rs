#![no_main]

use chatops_ssh_bridge::domain::{AllowList, Command, CommandRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let allow_list: AllowList = [("df", "df -h"), ("uptime", "uptime")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let command = Command::parse(&CommandRequest::from_user(data), &allow_list);

    // Invariants that must always hold:
    // 1. Only configured command strings are ever executed
    if let Command::AllowListed { command, .. } = &command {
        assert!(command == "df -h" || command == "uptime");
    }

    // 2. Text without the trigger never touches the remote host
    if !data.trim().starts_with('/') {
        assert!(!command.needs_remote());
    }
});
