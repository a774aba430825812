//! Unified test logging initialization.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

fn level_filter() -> EnvFilter {
    // TEST_LOG wins over RUST_LOG; quiet by default.
    std::env::var("TEST_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize structured logging for tests.
///
/// Idempotent and race-safe: callable from every test binary without
/// panicking when a subscriber is already installed. Output goes through the
/// test writer so cargo and nextest can capture it per test.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        fmt()
            .with_env_filter(level_filter())
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}
