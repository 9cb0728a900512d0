use crate::demo::{run_demo, run_lender_report, DemoArgs, LenderReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lender_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lender Desk",
    about = "Match loan opportunities to lenders and submit document packages",
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
    /// Print the lender panel for an opportunity
    Lenders(LenderReportArgs),
    /// Walk through filtering, document tagging, and submission on seeded data
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Lenders(args) => run_lender_report(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
