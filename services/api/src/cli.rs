use crate::commands::{run_dispatch, run_eligibility, DispatchArgs, EligibilityArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use policy_notification::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Policy Notification Service",
    about = "Validate and dispatch insurance policy notifications",
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
    /// Run one dispatch pass over every enabled notification type
    Dispatch(DispatchArgs),
    /// Show which policies or families are eligible for a notification type
    Eligibility(EligibilityArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Policy CSV export to serve (defaults to POLICY_NOTIFICATION_POLICIES)
    #[arg(long)]
    pub(crate) policies: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Dispatch(args) => run_dispatch(args),
        Command::Eligibility(args) => run_eligibility(args),
    }
}
