//! Fuzz target: persisted settings blob
//!
//! Stores arbitrary bytes as the NVS settings blob and loads them back.
//! Whatever the blob holds, the loaded config must pass validation:
//! corrupt or out-of-range blobs fall back to defaults.
//!
//! cargo fuzz run fuzz_settings_blob

#![no_main]

use climate_gateway::adapters::nvs::NvsAdapter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    nvs.put_raw(data.to_vec());
    let config = nvs.load_or_default();
    assert!(config.validate().is_ok(), "loaded config must be valid");
});
