use clap::Parser;
use docflow::{
    config::PipelineConfig,
    extract::Utf8Extractor,
    logging,
    pipeline::{Document, Pipeline},
    summarize,
};
use std::path::PathBuf;
use std::sync::Arc;
use walkdir::WalkDir;

/// Summarize every readable text file under the given paths.
#[derive(Parser)]
#[command(name = "docflow", version, about)]
struct Cli {
    /// Files or directories to summarize.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Override the number of extraction workers.
    #[arg(long)]
    extract_workers: Option<usize>,
    /// Override the number of summarization workers.
    #[arg(long)]
    summarize_workers: Option<usize>,
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env().expect("Failed to load configuration");
    if let Some(workers) = cli.extract_workers {
        config.extract_workers = workers;
    }
    if let Some(workers) = cli.summarize_workers {
        config.summarize_workers = workers;
    }
    let config = config.validated().expect("Invalid worker configuration");

    let documents = collect_documents(&cli.paths);
    if documents.is_empty() {
        tracing::warn!("No readable documents found under the given paths");
        return;
    }
    let names: Vec<String> = documents.iter().map(|doc| doc.name.clone()).collect();

    let mut pipeline = Pipeline::new(
        &config,
        Arc::new(Utf8Extractor::new()),
        summarize::get_summarizer(&config),
    );
    pipeline.start().expect("Failed to start pipeline");

    let handle = pipeline
        .submit(documents)
        .await
        .expect("Pipeline is running");
    let outcome = handle.collect().await;

    for (sequence, summary) in &outcome.summaries {
        println!("== {} ==\n{summary}\n", names[*sequence]);
    }
    for (sequence, error) in &outcome.failures {
        eprintln!("failed: {}: {error}", names[*sequence]);
    }

    pipeline
        .shutdown_gracefully()
        .await
        .expect("Pipeline shutdown failed");

    let snapshot = pipeline.metrics_snapshot();
    tracing::info!(
        submitted = snapshot.documents_submitted,
        delivered = snapshot.summaries_delivered,
        failed = snapshot.documents_failed,
        "Run complete"
    );
}

fn collect_documents(paths: &[PathBuf]) -> Vec<Document> {
    let mut documents = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            match std::fs::read(entry.path()) {
                Ok(content) => {
                    documents.push(Document::new(entry.path().display().to_string(), content));
                }
                Err(error) => {
                    tracing::warn!(path = %entry.path().display(), %error, "Skipping unreadable file");
                }
            }
        }
    }
    documents
}
