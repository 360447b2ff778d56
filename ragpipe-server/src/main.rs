use std::sync::Arc;

use anyhow::Context;
use ragpipe_core::{FileSystemSource, RagService, Settings};
use ragpipe_server::run_server;
use ragpipe_telemetry::{LogFormat, init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = std::env::var("RAGPIPE_LOG_FORMAT")
        .ok()
        .map(|value| value.parse::<LogFormat>())
        .transpose()?
        .unwrap_or_default();
    init_logging(format, "info")?;

    let settings = Settings::from_env().context("invalid RAGPIPE_* settings")?;
    let service = RagService::from_settings(&settings)
        .await
        .context("failed to start rag service")?;

    let source = FileSystemSource::new(&settings.documents_dir);
    let summary = service.ingest_all(&source).await?;
    info!(
        documents = summary.reports.len(),
        failed = summary.failed.len(),
        chunks = summary.chunks_stored(),
        "initial ingestion finished"
    );

    run_server(Arc::new(service), &settings.server).await
}
