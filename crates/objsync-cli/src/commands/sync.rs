//! Sync command - run one sync pass into the object store
//!
//! Provides the `objsync sync` CLI command which:
//! 1. Applies command-line overrides to the loaded configuration
//! 2. Builds the Source (root + filters + recursion) and the S3 destination
//! 3. Runs one `RemoteSync` pass and displays the report

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use objsync_core::config::Config;
use objsync_core::ports::Destination;
use objsync_s3::S3Destination;
use objsync_sync::{Filter, Filters, FileUploadingService, RemoteSync, Source};

use crate::output::{get_formatter, OutputFormat};

/// Sync command with clap options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Override the source root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Override the destination bucket
    #[arg(long)]
    pub bucket: Option<String>,

    /// Only upload files ending with one of these suffixes
    #[arg(long = "include-suffix")]
    pub include_suffixes: Vec<String>,

    /// Do not descend into subdirectories
    #[arg(long)]
    pub no_recursive: bool,
}

impl SyncCommand {
    /// Execute the sync command.
    pub async fn execute(&self, format: OutputFormat, mut config: Config) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        // Step 1: Apply command-line overrides
        if let Some(root) = &self.root {
            config.sync.root = root.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.destination.bucket = bucket.clone();
        }
        if self.no_recursive {
            config.sync.recursive = false;
        }
        if config.destination.bucket.is_empty() {
            bail!("destination.bucket must be configured (config file or --bucket)");
        }
        if !config.sync.root.is_dir() {
            bail!(
                "source root is not a directory: {}",
                config.sync.root.display()
            );
        }

        info!(
            root = %config.sync.root.display(),
            bucket = %config.destination.bucket,
            "starting sync"
        );

        // Step 2: Build the source
        let mut filters = Filters::builder();
        for suffix in &self.include_suffixes {
            filters = filters.include(Filter::ends_with(suffix.clone()));
        }
        let source = Source::builder(&config.sync.root)
            .filters(filters.build())
            .recursive(config.sync.recursive)
            .build();

        // Step 3: Build the destination and service
        let destination = S3Destination::from_config(&config.destination)
            .await
            .context("Failed to build S3 destination")?;
        let mut service = FileUploadingService::new(Arc::new(destination) as Arc<dyn Destination>);
        service.set_part_concurrency(config.upload.part_concurrency);
        service.set_retry_attempts(config.upload.retry_attempts);

        // Step 4: Run one pass and report
        let report = RemoteSync::with_service(source, service).run().await;

        formatter.print_json(&serde_json::json!({
            "candidates": report.candidates,
            "uploaded": report.uploaded,
            "failed": report.failed,
        }));
        if report.failed > 0 {
            formatter.error(&format!(
                "synchronized {} of {} candidates, {} failed",
                report.uploaded, report.candidates, report.failed
            ));
        } else {
            formatter.success(&format!(
                "synchronized {} of {} candidates",
                report.uploaded, report.candidates
            ));
        }
        Ok(())
    }
}
