use initcheck::cli::commands;
use initcheck::cli::{parse_cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_cli();

    match cli.command {
        Commands::Check => {
            commands::check(cli.config).await?;
        }
        Commands::Status { output } => {
            commands::status(cli.config, output).await?;
        }
    }

    Ok(())
}
