use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use blob_client::BlobContainerClient;
use companion_sync::traits::{HttpImageFetcher, NotionSource};
use companion_sync::{Config, RunOptions, Schedule, SyncPipeline};
use notion_client::NotionClient;

#[derive(Parser)]
#[command(name = "companion-sync", about = "Publish the companion roster and pictures")]
struct Cli {
    /// Run one sync immediately and exit instead of waiting for the schedule
    #[arg(long)]
    now: bool,

    /// Publish companions.json without refreshing pictures
    #[arg(long)]
    skip_pictures: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive("companion_sync=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();
    info!("Companion sync starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let notion = NotionClient::new(config.notion_secret.clone(), config.http_timeout)?;
    let blob = BlobContainerClient::from_connection_string(
        &config.storage_connection_string,
        &config.storage_container,
        config.http_timeout,
    )?;
    let fetcher = HttpImageFetcher::new(config.http_timeout)?;

    let pipeline = SyncPipeline::new(
        Arc::new(NotionSource::new(notion, config.databases.clone())),
        Arc::new(blob),
        Arc::new(fetcher),
        config.image_concurrency,
    );
    let options = RunOptions {
        skip_images: cli.skip_pictures,
    };

    if cli.now {
        info!("Running task...");
        return match pipeline.run(Utc::now(), options).await {
            Ok(stats) => {
                info!("Done. {stats}");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Sync failed");
                Err(e.into())
            }
        };
    }

    let schedule = Schedule::every_hours(config.interval_hours);
    info!(every_hours = config.interval_hours, "Waiting for scheduled runs");

    let pipeline = &pipeline;
    tokio::select! {
        _ = schedule.run_forever(move || async move {
            info!("Running task...");
            match pipeline.run(Utc::now(), options).await {
                Ok(stats) => info!("Done. {stats}"),
                Err(e) => error!(error = %e, "Sync failed"),
            }
        }) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
