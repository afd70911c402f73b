mod agent;
mod config;
mod contest;
mod engine;
mod field;
mod fitness;
mod flood;
mod game;
mod genetic;
mod manager;
mod protocol;
mod simulator;
mod stats;
mod types;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    contest_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run,

    Report,

    Clean,

    Play {
        #[arg(long)]
        ai: String,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.contest_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Run => mgr.run_contest()?,
        Command::Report => mgr.report()?,
        Command::Clean => mgr.clean()?,
        Command::Play { ai } => mgr.play(&ai)?,
    }

    Ok(())
}
