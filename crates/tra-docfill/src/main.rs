use anyhow::Result;
use clap::Parser;
use tra_docfill::cli::{self, Cli};
use tra_docfill::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);
    cli::run(cli).await
}
