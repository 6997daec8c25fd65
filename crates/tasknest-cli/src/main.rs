//! tasknest - offline-first tasks and notes CLI

mod cli;
mod commands;
mod config_profiles;
mod error;
mod session_store;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::add::{run_add, AddOptions};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::done::run_done;
use crate::commands::edit::{run_edit, EditOptions};
use crate::commands::list::{run_list, ListOptions};
use crate::commands::queue::run_queue;
use crate::commands::run::run_daemon;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_sync_conflicts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tasknest_core=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Add {
            title,
            note,
            description,
            body,
            priority,
            due,
        } => {
            let options = AddOptions {
                title_parts: &title,
                note,
                description,
                body,
                priority,
                due,
            };
            run_add(options, &db_path, profile).await?;
        }
        Commands::List {
            limit,
            kind,
            open,
            done,
            priority,
            status,
            text,
            json,
        } => {
            let options = ListOptions {
                limit,
                kind,
                open,
                done,
                priority,
                status,
                text,
                json,
            };
            run_list(options, &db_path, profile).await?;
        }
        Commands::Show { id, json } => run_show(&id, json, &db_path, profile).await?,
        Commands::Edit {
            id,
            title,
            description,
            body,
            priority,
            due,
            clear_due,
        } => {
            let options = EditOptions {
                title,
                description,
                body,
                priority,
                due,
                clear_due,
            };
            run_edit(&id, options, &db_path, profile).await?;
        }
        Commands::Done { id, undo } => run_done(&id, undo, &db_path, profile).await?,
        Commands::Delete { id } => run_delete(&id, &db_path, profile).await?,
        Commands::Sync { command } => match command {
            Some(SyncCommands::Conflicts { limit, json }) => {
                run_sync_conflicts(limit, json, &db_path, profile).await?;
            }
            None => run_sync(&db_path, profile).await?,
        },
        Commands::Status { json } => run_status(json, &db_path, profile).await?,
        Commands::Queue { limit, json } => run_queue(limit, json, &db_path, profile).await?,
        Commands::Run => run_daemon(&db_path, profile).await?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
