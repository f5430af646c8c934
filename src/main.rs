use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qbo_tools::config::Config;
use qbo_tools::server::Authorizer;
use qbo_tools::token::TokenStore;
use qbo_tools::{Result, ToolError, pull};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let _ = dotenvy::dotenv();
    init_logging()?;
    let config = Config::from_env()?;

    match cli.command {
        Command::Authorize(args) => {
            let store = TokenStore::new(args.token);
            Authorizer::new(config, store).run()
        }
        Command::Pull(args) => {
            let store = TokenStore::new(args.token);
            pull::run(&config, &store, &args.output)
        }
    }
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Authorize against QuickBooks Online and pull accounting data to CSV."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local OAuth2 callback server and persist the token.
    Authorize(AuthorizeArgs),
    /// Pull the report and entity worklist using the persisted token.
    Pull(PullArgs),
}

#[derive(clap::Args)]
struct AuthorizeArgs {
    /// Token file to write on successful authorization.
    #[arg(long, default_value = "token.json")]
    token: PathBuf,
}

#[derive(clap::Args)]
struct PullArgs {
    /// Token file written by the authorize subcommand.
    #[arg(long, default_value = "token.json")]
    token: PathBuf,

    /// Directory the CSV files are written into.
    #[arg(long, default_value = "output")]
    output: PathBuf,
}
