#![no_main]

use graft_core::snapshot::SessionSnapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Import must reject malformed blobs without panicking, and anything it
    // accepts must survive a second export/import unchanged.
    if let Ok(snapshot) = SessionSnapshot::import(data) {
        let again = SessionSnapshot::import(&snapshot.export());
        assert_eq!(again.ok(), Some(snapshot));
    }
});
