//! Binary entrypoint: capture stdio exactly once, install the CPU-time
//! limit, and run the dispatcher loop to completion or EOF.

use std::io::{self, BufReader};

use recurse_worker::dispatcher::Worker;
use recurse_worker::resource;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    resource::install_cpu_limit();

    let stdin = BufReader::new(io::stdin());
    let stdout = io::stdout();

    let mut worker = Worker::new(stdin, stdout);

    if let Err(e) = worker.run() {
        tracing::error!(error = %e, "fatal I/O error, exiting");
        std::process::exit(1);
    }

    Ok(())
}
