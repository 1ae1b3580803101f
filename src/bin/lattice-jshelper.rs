//! Out-of-process JS/TS parse helper
//!
//! Speaks newline-delimited JSON on stdin/stdout: a hello frame on start,
//! then one response per request. Launched and pooled by the analyzer; it
//! never touches the filesystem, the source text arrives in the frame.

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    lattice_analyzer::languages::js_extract::serve();
}
