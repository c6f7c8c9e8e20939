use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "gitbrain",
    version,
    about = "Coordinate a coder and an overseer agent through a shared mailbox"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    #[command(flatten)]
    overrides: commands::session::Overrides,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = &cli.overrides;
    match &cli.command {
        commands::Commands::Init(args) => commands::init::run(args, overrides),
        commands::Commands::Send(args) => commands::send::run(args, overrides, cli.format),
        commands::Commands::Inbox(args) => commands::inbox::run(args, overrides, cli.format),
        commands::Commands::Count => commands::count::run(overrides, cli.format),
        commands::Commands::Clear => commands::clear::run(overrides),
        commands::Commands::Daemon(args) => commands::daemon::run(args, overrides),
        commands::Commands::Migrate(args) => commands::migrate::run(args, cli.format),
        commands::Commands::Validate(args) => commands::validate::run(args, overrides, cli.format),
    }
}
