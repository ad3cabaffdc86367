use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `MIXER_LOG=debug`.
pub const LOG_ENV: &str = "MIXER_LOG";

/// Diagnostics go to stderr so stdout carries only the experiment report.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
