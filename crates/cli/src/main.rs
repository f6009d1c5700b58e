// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cb - coursebuild CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod color;
mod commands;
mod output;
mod table;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{build, db, jobs, status};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cb",
    version,
    about = "coursebuild - build course materials from authored sources"
)]
struct Cli {
    /// Log filter (also honors LOG_LEVEL / RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and execute a course build
    Build(build::BuildArgs),
    /// Inspect and manage queued jobs
    Jobs(jobs::JobsArgs),
    /// Database maintenance
    Db(db::DbArgs),
    /// Delete database files
    DeleteDatabase(db::DeleteDatabaseArgs),
    /// Show queue and worker health
    Status(status::StatusArgs),
}

fn init_tracing(cli_level: Option<&str>) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env("LOG_LEVEL")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            2
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Build(args) => build::run(args, cli.log_level.as_deref()).await,
        Commands::Jobs(args) => jobs::run(args),
        Commands::Db(args) => db::run(args),
        Commands::DeleteDatabase(args) => db::run_delete(args),
        Commands::Status(args) => status::run(args),
    }
}
