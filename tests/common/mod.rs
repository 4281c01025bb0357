use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber for the test binary. Safe to call from every test.
///
/// Honors `RUST_LOG`; defaults to `info`, so split/merge events only show up with
/// `RUST_LOG=bplus_index=trace`.
pub fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_target(false).with_test_writer().init();
    });
}
