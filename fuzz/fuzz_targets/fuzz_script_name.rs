#![no_main]

use chatops_ssh_bridge::domain::validate_script_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Accepted names must be usable as a single path component
    if validate_script_name(data).is_ok() {
        assert!(!data.contains('/'), "separator accepted: {data}");
        assert!(!data.starts_with('.'), "dot name accepted: {data}");
        assert!(!data.chars().any(char::is_whitespace));
    }
});
