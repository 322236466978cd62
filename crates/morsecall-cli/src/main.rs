use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "morsecall-cli", version, about = "Morsecall CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Replay a list of tap timestamps through the engine
    Simulate(commands::simulate::SimulateArgs),
    /// Interactive tap session: press Enter to tap
    Listen(commands::listen::ListenArgs),
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("MORSECALL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Listen(args) => commands::listen::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
