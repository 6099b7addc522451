use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use output::OutputFormat;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("canopy=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);
    let session = backend::open(&cli.store)?;

    match &cli.command {
        Commands::Insert(args) => commands::mutate::insert(&session, args, format),
        Commands::Move(args) => commands::mutate::move_node(&session, args, format),
        Commands::Delete(args) => commands::mutate::delete(&session, args, format),
        Commands::Convert(args) => commands::mutate::convert(&session, args, format),
        Commands::Show(args) => commands::inspect::show(&session, args, format),
        Commands::Ancestors(args) => commands::inspect::ancestors(&session, args, format),
        Commands::Descendants(args) => commands::inspect::descendants(&session, args, format),
        Commands::Check(args) => commands::integrity::check(&session, args, format),
        Commands::Rebuild(args) => commands::integrity::rebuild(&session, args, format),
        Commands::Scopes => commands::scopes::run(&session, &cli.store, format),
    }
}
