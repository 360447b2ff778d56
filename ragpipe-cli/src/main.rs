mod cli;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ragpipe_core::{FileSystemSource, HealthReport, IngestSummary, RagService, Settings};
use ragpipe_telemetry::init_logging;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;

    let mut settings = Settings::from_env().context("invalid RAGPIPE_* settings")?;
    cli.apply(&mut settings);
    settings.validate()?;

    let service = RagService::from_settings(&settings)
        .await
        .context("failed to set up backends")?;

    match cli.command {
        Commands::Ingest { reset } => {
            if reset {
                service.reset().await.context("failed to clear the vector store")?;
            }
            let summary = ingest_documents(&service, &settings).await?;
            print_summary(&summary);
            if !summary.failed.is_empty() {
                bail!("{} document(s) failed to ingest", summary.failed.len());
            }
        }
        Commands::Ask { query } => {
            if !cli.skip_ingest {
                ingest_documents(&service, &settings).await?;
            }
            println!("{}", service.answer(&query).await);
        }
        Commands::Chat => {
            if !cli.skip_ingest {
                ingest_documents(&service, &settings).await?;
            }
            chat(&service).await?;
        }
        Commands::Serve { .. } => {
            if !cli.skip_ingest {
                ingest_documents(&service, &settings).await?;
            }
            ragpipe_server::run_server(Arc::new(service), &settings.server).await?;
        }
        Commands::Check => {
            let report = service.check().await;
            print_report(&report);
            if !report.is_healthy() {
                bail!("backend check failed");
            }
        }
    }

    Ok(())
}

async fn ingest_documents(service: &RagService, settings: &Settings) -> Result<IngestSummary> {
    let source = FileSystemSource::new(&settings.documents_dir);
    let summary = service
        .ingest_all(&source)
        .await
        .with_context(|| format!("failed to read {}", settings.documents_dir.display()))?;
    info!(
        documents = summary.reports.len(),
        failed = summary.failed.len(),
        chunks = summary.chunks_stored(),
        "ingestion finished"
    );
    Ok(summary)
}

fn print_summary(summary: &IngestSummary) {
    for report in &summary.reports {
        println!(
            "{}: {}/{} chunks stored",
            report.document_id, report.chunks_stored, report.chunks_total
        );
        for failure in &report.failures {
            println!("  chunk {} skipped: {}", failure.index, failure.message);
        }
    }
    for (id, message) in &summary.failed {
        println!("{id}: failed: {message}");
    }
    println!(
        "{} document(s), {} chunk(s) stored",
        summary.reports.len(),
        summary.chunks_stored()
    );
}

fn print_report(report: &HealthReport) {
    let rows = [
        ("embedding", &report.embedding),
        ("store", &report.store),
        ("generation", &report.generation),
    ];
    for (name, status) in rows {
        let mark = if status.ok { "ok" } else { "FAILED" };
        println!("{name:<10} {mark:<6} {}", status.detail);
    }
}

async fn chat(service: &RagService) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("Ask a question about your documents. Type 'quit' or 'exit' to leave.");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
                    break;
                }
                let _ = rl.add_history_entry(query);
                println!("{}\n", service.answer(query).await);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
