//! Vitae - a typst resume editor with live preview, autosave and sharing.

#![allow(dead_code)]

mod cli;
mod config;
mod core;
mod embed;
mod engine;
mod layout;
mod logger;
mod scheduler;
mod session;
mod store;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::common::App;
use cli::{Cli, Commands};
use config::VitaeConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = VitaeConfig::load(&cli)?;
    cli::common::runtime()?.block_on(run(&cli, config))
}

async fn run(cli: &Cli, config: VitaeConfig) -> Result<()> {
    let app = App::open(config).await?;

    match &cli.command {
        Commands::New { title, kind } => cli::project::new_project(&app, title, kind).await.map(|_| ()),
        Commands::Edit { project } => cli::edit::edit(&app, project).await,
        Commands::Export { project, output } => {
            cli::project::export(&app, project, output.as_deref()).await.map(|_| ())
        }
        Commands::Share {
            project,
            user_id,
            edit,
        } => cli::project::share(&app, project, user_id, *edit).await,
        Commands::Role { email, role } => cli::project::set_role(&app, email, *role).await,
        Commands::Link {
            project,
            ttl,
            verify,
        } => cli::project::link(&app, project, *ttl, verify.as_deref()).await,
        Commands::Rm { project } => cli::project::remove(&app, project).await,
    }
}
