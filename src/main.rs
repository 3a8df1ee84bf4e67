mod cli;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_name, Parser};
use figment::Figment;
use log::info;

use scrapnote::blobstore;
use scrapnote::clock::SystemClock;
use scrapnote::config::figment::FigmentExt;
use scrapnote::config::AppConfig;
use scrapnote::error_exit;
use scrapnote::logging::init_logging;
use scrapnote::metadata::MetadataStore;
use scrapnote::service::NoteService;
use scrapnote::snapshot::Snapshot;

use crate::cli::CliConfig;

#[tokio::main]
async fn main() {
    init_logging();

    info!("{} starting up", crate_name!());

    let cli_config = CliConfig::parse();
    if !cli_config.config_file.exists() {
        error_exit!(
            "configuration file at {} does not exist",
            cli_config.config_file.display(),
        );
    }
    let config: AppConfig = match Figment::new()
        .setup_app_config(&cli_config.config_file)
        .extract()
    {
        Ok(config) => config,
        Err(e) => error_exit!("failed to load configuration: {e}"),
    };

    if let Err(e) = run(config).await {
        error_exit!("{e}");
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    tokio::fs::create_dir_all(&config.data_directory).await?;

    let snapshot_path = config.snapshot_path();
    let snapshot = Snapshot::load(&snapshot_path).await?;
    let users = snapshot.users.clone();
    let stores = blobstore::load_all(&config.data_directory, &users).await?;
    let metadata = Arc::new(MetadataStore::restore(SystemClock, snapshot.notes));

    let (service, worker) =
        NoteService::start(metadata.clone(), stores, config.command_queue_depth);

    {
        let metadata = metadata.clone();
        let users = users.clone();
        let snapshot_path = snapshot_path.clone();
        let period = Duration::from_secs(config.snapshot_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                let snapshot = Snapshot {
                    users: users.clone(),
                    notes: metadata.export().await,
                };
                if let Err(e) = snapshot.save(&snapshot_path).await {
                    log::error!("periodic snapshot save failed: {e}");
                }
            }
        });
    }

    info!("serving {} user stores from {}", users.len(), config.data_directory.display());

    tokio::signal::ctrl_c().await?;
    info!("interrupted, saving the snapshot and shutting down");

    // dropping the service closes the command queues; the worker drains
    // what is left and stops
    drop(service);
    if let Err(e) = worker.await {
        log::error!("storage worker task failed: {e}");
    }

    let snapshot = Snapshot {
        users,
        notes: metadata.export().await,
    };
    snapshot.save(&snapshot_path).await?;

    info!("finished cleaning up");
    Ok(())
}
