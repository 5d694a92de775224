use crate::demo::{print_blueprint, run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use mupai_survey::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "MUPAI Dietary Survey",
    about = "Run or demonstrate the MUPAI dietary pattern questionnaire from the command line",
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
    /// Print the questionnaire step table
    Blueprint,
    /// Walk a scripted questionnaire end to end and print the report
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
        Command::Blueprint => {
            print_blueprint();
            Ok(())
        }
        Command::Demo(args) => run_demo(args).await,
    }
}
