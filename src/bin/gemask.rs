use std::process;

use clap::Parser;
use gempipe::VERSION_INFO;
use gempipe::commands::generate::{self, GenerateArgs};
use gempipe::commands::report_error;
use gempipe::logging;

#[derive(Debug, Parser)]
#[command(
    name = "gemask",
    about = "Send one prompt to the Gemma generation endpoint",
    version = VERSION_INFO
)]
struct Cli {
    #[command(flatten)]
    generate: GenerateArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.generate.connection.verbosity());

    if let Err(err) = generate::run(cli.generate).await {
        report_error(&err);
        process::exit(1);
    }
}
