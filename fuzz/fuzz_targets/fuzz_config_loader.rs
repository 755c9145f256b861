#![no_main]

use std::path::Path;

use cuecaller::config::loader::{ConfigLoader, LoaderOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        let loader = ConfigLoader::new(LoaderOptions {
            env_overrides: false,
            ..LoaderOptions::default()
        });
        let _ = loader.load_str(yaml, Path::new("fuzz.yaml"));
    }
});
