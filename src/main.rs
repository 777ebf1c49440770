use std::process::ExitCode;

use clap::Parser;
use console::style;

use lineage_impact::cli::{self, Cli};
use lineage_impact::observability::{init_logging, redact_secrets};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), redact_secrets(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}
