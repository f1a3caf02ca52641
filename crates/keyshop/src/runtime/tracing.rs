/// Installs the global `tracing` subscriber.
///
/// Verbosity comes from `RUST_LOG`:
/// - `RUST_LOG=info` - committed decisions, sessions opening and closing
/// - `RUST_LOG=debug` - request payloads and claimed credential ids
/// - `RUST_LOG=keyshop=debug,sqlx=warn` - per-crate filtering
///
/// Call once, at the top of `main`. Tests leave the subscriber unset.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
