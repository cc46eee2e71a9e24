use pdfcache_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    let target = logging::init_logging();
    tracing::debug!(?target, "logging ready");

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("pdfcache error: {:#}", err);
        std::process::exit(1);
    }
}
