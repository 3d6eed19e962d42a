#![no_main]

use libfuzzer_sys::fuzz_target;
use modsig::frontend::load;
use modsig::{CheckOptions, Session};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        // Fuzz the loader
        if let Ok(unit) = load::from_json_str("fuzz.json", s) {
            // If loading succeeds, fuzz every phase
            let _ = Session::new(&unit).run(&CheckOptions::default());
        }
    }
});
