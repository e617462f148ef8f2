
mod cli;
mod commands;
mod progress;

use cli::{Cli, Commands};
use commands::{build, export, repair};

/// `RUST_LOG` wins; otherwise `-v` raises the default level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    if std::env::var_os("RUST_LOG").is_none() {
        pretty_env_logger::formatted_builder().parse_filters(level).init();
    } else {
        pretty_env_logger::init_custom_env("RUST_LOG");
    }
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Build(args) => build::run(&cli, args),
        Commands::Repair(args) => repair::run(&cli, args),
        Commands::Export(args) => export::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
