use anyhow::Result;
use balanced_pipeline::cli::{execute_compare, execute_run, Cli, Commands, RunOptions};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            topology,
            fail_at,
            quiet,
            json,
            overrides,
        } => {
            execute_run(RunOptions {
                topology,
                fail_at,
                quiet,
                json,
                overrides,
            })
            .await
        }
        Commands::Compare { overrides } => execute_compare(overrides).await,
    };

    if let Err(error) = result {
        eprintln!("❌ エラー: {error:#}");
        std::process::exit(1);
    }
    Ok(())
}
