use cemkit_cli::cli::{Cli, Commands};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::{annuity, cem, costs, market};

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays machine-readable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match &cli.command {
        Commands::Market { format } => {
            info!("Running two-bus market model");
            market::handle(*format)
        }
        Commands::Cem(args) => cem::handle(args),
        Commands::Costs {
            year,
            costs,
            format,
            technologies,
        } => costs::handle(*year, costs.as_deref(), *format, technologies),
        Commands::Annuity { rate, lifetime } => annuity::handle(*rate, *lifetime),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
