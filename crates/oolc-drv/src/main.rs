//! The `oolc` binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Internal tracing goes to stderr, controlled by OOLC_LOG;
    // diagnostics for the user are printed by the driver itself.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("OOLC_LOG"))
        .init();

    let code = oolc_drv::run(std::env::args().skip(1));
    std::process::exit(code);
}
