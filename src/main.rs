use anyhow::Result;
use clap::Parser;
use schedulify::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    schedulify::init_logger();

    let cli = Cli::parse();
    schedulify::run(cli).await
}
