use clap::Parser;

mod cli;
mod logging;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    match cli.command {
        Commands::Fetch(fetch) => fetch.run(&cli.profiles).await,
        Commands::Profiles(profiles) => profiles.run(&cli.profiles),
    }
}
