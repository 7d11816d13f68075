//! Shared helpers for cluster integration tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes test logging once per process.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}
