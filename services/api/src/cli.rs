use crate::demo::{run_catalog_show, run_catalog_validate, run_demo, run_screen, CatalogValidateArgs, DemoArgs, ScreenArgs};
use crate::server;
use aom_screening::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "AOM Screening",
    about = "Run the anti-obesity medication screening service or screen questionnaires from the command line",
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
    /// Screen a questionnaire JSON file and print the result
    Screen(ScreenArgs),
    /// Inspect or validate drug catalogs
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Walk through the reference screening scenarios end to end
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Strictly load a catalog file and report its contents or the first problem found
    Validate(CatalogValidateArgs),
    /// Print the built-in standard catalog as JSON
    Show,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured drug catalog file
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Screen(args) => run_screen(args),
        Command::Catalog {
            command: CatalogCommand::Validate(args),
        } => run_catalog_validate(args),
        Command::Catalog {
            command: CatalogCommand::Show,
        } => run_catalog_show(),
        Command::Demo(args) => run_demo(args),
    }
}
