use crate::admin::{
    run_actor_add, run_actor_list, run_import, run_stats, ActorAddArgs, CallerArgs, ImportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use recruitment_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Recruitment Tracker",
    about = "Run and administer the recruitment pipeline service from the command line",
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
    /// Upsert candidates from a roster CSV export
    Import(ImportArgs),
    /// Print candidate counts per stage
    Stats(CallerArgs),
    /// Manage team members
    Actors {
        #[command(subcommand)]
        command: ActorCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ActorCommand {
    /// Register a member directly in the database (bootstrap for the first admin)
    Add(ActorAddArgs),
    /// List registered members with their access levels
    List(CallerArgs),
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
        Command::Import(args) => run_import(args),
        Command::Stats(args) => run_stats(args),
        Command::Actors {
            command: ActorCommand::Add(args),
        } => run_actor_add(args),
        Command::Actors {
            command: ActorCommand::List(args),
        } => run_actor_list(args),
    }
}
