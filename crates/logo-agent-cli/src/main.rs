use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use logo_agent::agent::DEFAULT_BRAND;
use logo_agent::config::Settings;
use logo_agent::platform::azure::AzureConnector;
use logo_agent::providers::mcp::McpLauncher;

mod workflow;

#[cfg(test)]
mod mock;

use workflow::Workflow;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Technology brand, project, product, or property to find a logo for
    #[arg(default_value = DEFAULT_BRAND)]
    brand: String,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let workflow = Workflow::new(&AzureConnector, &McpLauncher);
    match workflow
        .run(Settings::from_env(), &cli.brand, &mut io::stdout())
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("workflow halted: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
