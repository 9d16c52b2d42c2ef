use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Config;
use dal::PgStopStore;
use dotenvy::dotenv;
use model::bus_stop::public_stops_into_vec;
use pipeline::{
    loader::{CommitMode, Loader},
    normalizer::write_snapshot,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

mod config;
mod dal;
mod model;
mod pipeline;
mod telemetry;

/// Loads bus stops from the public export and the NUS NextBus API into Postgres.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, reconcile and load both sources
    Run {
        #[command(flatten)]
        load: LoadArgs,
        /// Also write the enriched public stops to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Attach the routes to the public stops and write the result to a file
    Enrich {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Load only the enriched public stops
    LoadPublic(LoadArgs),
    /// Fetch, reconcile and load only the institutional stops
    LoadInstitutional(LoadArgs),
    /// Fetch the institutional stops and delete the stored ones the reconciliation table marks
    /// as duplicates
    Prune,
}

#[derive(Args)]
struct LoadArgs {
    /// Empty the tables before loading
    #[arg(long)]
    truncate: bool,
    /// Overrides LOAD_COMMIT_MODE
    #[arg(long, value_enum)]
    commit_mode: Option<CommitMode>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    _ = dotenv();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let telemetry = telemetry::init_tracing(&config.log_dir, config.otlp_endpoint.as_deref())?;

    let res = execute(cli.command, &config).await;
    if let Err(e) = &res {
        error!("{e:?}");
    }

    telemetry.shutdown();

    res
}

async fn execute(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Run { load, snapshot } => {
            let public = pipeline::read_enriched_public_stops(config)?;
            if let Some(path) = snapshot {
                write_snapshot(&path, &public)?;
            }
            let institutional = pipeline::fetch_institutional_stops(config).await?;

            let loader = connect_loader(config, load.commit_mode).await?;
            let stops = pipeline::reconcile(institutional, public);
            pipeline::load(&loader, &stops, load.truncate).await?;
        }
        Command::Enrich { snapshot } => {
            let public = pipeline::read_enriched_public_stops(config)?;
            write_snapshot(&snapshot, &public)?;
        }
        Command::LoadPublic(load) => {
            let public = pipeline::read_enriched_public_stops(config)?;

            let loader = connect_loader(config, load.commit_mode).await?;
            pipeline::load(&loader, &public_stops_into_vec(public), load.truncate).await?;
        }
        Command::LoadInstitutional(load) => {
            let institutional = pipeline::fetch_institutional_stops(config).await?;

            let loader = connect_loader(config, load.commit_mode).await?;
            pipeline::load(&loader, &institutional, load.truncate).await?;
        }
        Command::Prune => {
            let ids = pipeline::fetch_duplicate_ids(config).await?;

            let loader = connect_loader(config, None).await?;
            let removed = loader.remove_by_ids(&ids).await?;
            info!("pruned {} of {} reconciled bus stops", removed, ids.len());
        }
    }

    Ok(())
}

async fn connect_loader(
    config: &Config,
    commit_mode: Option<CommitMode>,
) -> Result<Loader<PgStopStore>> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.database.timeout)
        .connect_with(config.database.connect_options()?)
        .await
        .context("couldn't connect to the database")?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Loader::new(
        PgStopStore::new(pool),
        commit_mode.unwrap_or(config.commit_mode),
    ))
}
