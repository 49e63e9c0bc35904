mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use contextforge::cli::{AuthCommand, Cli, Commands, HistoryCommand};
use contextforge::config::Config;
use contextforge::error::Result;

use commands::auth::{cmd_auth_login, cmd_auth_logout, cmd_auth_status};
use commands::compose::{cmd_compose, cmd_projects};
use commands::feedback::cmd_feedback;
use commands::history::{cmd_history_list, cmd_history_resolve};
use commands::refine::cmd_refine;
use commands::serve::cmd_serve;

fn main() -> Result<()> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Auth commands operate on auth.json directly; no Config needed
    let command = match cli.command {
        Commands::Auth { command } => {
            return match command {
                AuthCommand::Login { service } => cmd_auth_login(service),
                AuthCommand::Status => cmd_auth_status(),
                AuthCommand::Logout { service } => cmd_auth_logout(&service),
            };
        }
        other => other,
    };

    let config = Config::load()?;

    match command {
        Commands::Serve { bind } => cmd_serve(&config, bind),
        Commands::Projects => cmd_projects(&config),
        Commands::Compose {
            project,
            problem,
            file,
            output,
            no_history,
        } => cmd_compose(
            &config,
            &project,
            &problem,
            file.as_deref(),
            output.as_deref(),
            no_history,
        ),
        Commands::Refine {
            project,
            problem,
            kind,
            file,
            gateway,
            no_feedback,
            no_history,
        } => cmd_refine(
            &config,
            &project,
            &problem,
            kind,
            file.as_deref(),
            gateway.as_deref(),
            no_feedback,
            no_history,
        ),
        Commands::Feedback {
            project,
            problem,
            outcome,
            kind,
            prompt,
            refinement_id,
        } => cmd_feedback(
            &config,
            &project,
            &problem,
            outcome.worked(),
            kind,
            prompt,
            refinement_id,
        ),
        Commands::History { command } => match command {
            HistoryCommand::List { limit } => cmd_history_list(&config, limit),
            HistoryCommand::Resolve { id, minutes } => cmd_history_resolve(&config, id, minutes),
        },
        Commands::Auth { .. } => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
