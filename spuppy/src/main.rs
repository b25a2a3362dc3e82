use clap::Parser;
use spuppy::cli::{run, Cli};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        // Already reported to the console and the log file.
        Err(_) => ExitCode::FAILURE,
    }
}
