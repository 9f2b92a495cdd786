#![no_main]

use benchcmp::comparison::{pair, parse_run, render};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic; whatever parses must also pair and render.
        if let Ok(run) = parse_run(input) {
            let paired = pair(run.clone(), run);
            let _ = render(&paired, "main", "0000000");
        }
    }
});
