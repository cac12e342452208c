use crate::evaluate::{run_evaluate, EvaluateArgs};
use crate::server;
use art_eligibility::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "art-eligibility",
    about = "Determine when and why HIV-program subjects first became eligible for ART",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a cohort export once and print the results
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Subjects CSV export to serve (overrides ELIGIBILITY_SUBJECTS_CSV)
    #[arg(long, requires = "observations")]
    pub(crate) subjects: Option<PathBuf>,
    /// Observations CSV export to serve (overrides ELIGIBILITY_OBSERVATIONS_CSV)
    #[arg(long, requires = "subjects")]
    pub(crate) observations: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
    }
}
