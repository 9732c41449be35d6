use clap::Parser;

use registrator_cli::cli::Cli;
use registrator_cli::{daemon, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("error: failed to initialise logging: {e}");
    }

    if let Err(e) = daemon::run(cli.into_options()).await {
        tracing::error!(error = %e, "registrator stopped");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
