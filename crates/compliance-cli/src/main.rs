//! Binary entrypoint for compliance-checker.
use clap::Parser;
use compliance_cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry LOG_LEVEL, so it is read before logging starts
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = run(cli).await?;
    println!("{}", output.trim_end());
    Ok(())
}
