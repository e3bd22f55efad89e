//! Batch ingestion pipeline orchestration.
//!
//! Coordinates the upload flow: cap → validation → byte read → extraction →
//! labelling → chunking. Each file is isolated: a failure records a skip
//! reason and the rest of the batch continues. Extraction runs on the
//! blocking pool with at most `ingest.concurrency` files in flight; the
//! report always lists files in upload order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::classify::Classifier;
use crate::config::{Config, IngestConfig};
use crate::extract::{extract_text, ExtractError};
use crate::models::{BatchReport, FileInput, IngestedFile, SkippedFile};
use crate::progress::{IngestProgressEvent, IngestProgressReporter, ProgressMode};
use crate::sources;
use crate::validate::validate;

enum Outcome {
    Ingested(IngestedFile),
    Skipped(SkippedFile),
}

/// Validates, extracts and chunks uploads against one [`IngestConfig`].
#[derive(Clone)]
pub struct Ingestor {
    classifier: Arc<Classifier>,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self::with_classifier(Classifier::shared(), config)
    }

    pub fn with_classifier(classifier: Arc<Classifier>, config: IngestConfig) -> Self {
        Self { classifier, config }
    }

    /// Ingest a batch. Inputs beyond `max_files_per_batch` are dropped and
    /// counted in [`BatchReport::truncated`].
    pub async fn ingest_batch(
        &self,
        mut inputs: Vec<FileInput>,
        progress: &dyn IngestProgressReporter,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        let cap = self.config.max_files_per_batch.max(1);
        if inputs.len() > cap {
            report.truncated = inputs.len() - cap;
            warn!(
                dropped = report.truncated,
                limit = cap,
                "batch exceeds file limit, ignoring extra files"
            );
            inputs.truncate(cap);
        }

        let total = inputs.len() as u64;
        progress.report(IngestProgressEvent::Started { total });

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        for (index, input) in inputs.into_iter().enumerate() {
            let ingestor = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let name = input.name.clone();
            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, ingestor.ingest_one(input).await)
            });
            names.insert(handle.id(), (index, name));
        }

        let mut outcomes = collect_outcomes(tasks, names, total, progress).await;
        outcomes.sort_by_key(|(index, _)| *index);
        for (_, outcome) in outcomes {
            match outcome {
                Outcome::Ingested(file) => report.files.push(file),
                Outcome::Skipped(skip) => report.skipped.push(skip),
            }
        }

        info!(
            ingested = report.files.len(),
            skipped = report.skipped.len(),
            "batch complete"
        );
        report
    }

    async fn ingest_one(self, input: FileInput) -> Outcome {
        let name = input.name.clone();

        let reasons = validate(&input, self.config.max_file_size_bytes, &self.classifier);
        if !reasons.is_empty() {
            debug!(file = %name, ?reasons, "rejected by validation");
            return Outcome::Skipped(SkippedFile { name, reasons });
        }

        let mime_type = input.mime_type.clone();
        let bytes = match input.into_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %name, error = %e, "failed to read upload");
                return Outcome::Skipped(SkippedFile {
                    name,
                    reasons: vec![format!("Failed to read file: {}", e)],
                });
            }
        };

        let task_name = name.clone();
        let processed = tokio::task::spawn_blocking(move || {
            self.process_bytes(&task_name, &mime_type, &bytes)
        })
        .await;

        match processed {
            Ok(Ok(file)) => Outcome::Ingested(file),
            Ok(Err(e)) => {
                warn!(file = %name, error = %e, "extraction failed, skipping file");
                Outcome::Skipped(SkippedFile {
                    name,
                    reasons: vec![e.to_string()],
                })
            }
            Err(e) => {
                warn!(file = %name, error = %e, "extraction task aborted");
                Outcome::Skipped(SkippedFile {
                    name,
                    reasons: vec![format!("Extraction aborted: {}", e)],
                })
            }
        }
    }

    /// Classify, extract, label and chunk one file's bytes.
    pub fn process_bytes(
        &self,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<IngestedFile, ExtractError> {
        let format = self.classifier.classify(name, mime_type);
        debug!(file = %name, format = format.tag(), "extracting");

        let text = extract_text(bytes, format)?;
        let extracted_text = match format.document_label(name) {
            Some(label) => format!("{}\n\n{}", label, text),
            None => text,
        };
        let chunks = chunk_text(
            &extracted_text,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let content_hash = format!("{:x}", hasher.finalize());

        Ok(IngestedFile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            size: bytes.len() as u64,
            mime_type: mime_type.to_string(),
            format,
            extracted_text,
            chunks,
            content_hash,
            uploaded_at: Utc::now(),
        })
    }
}

/// Drain `tasks`, reporting progress as each finishes. A task that panics
/// or is cancelled is recorded as skipped under the name it was spawned with.
async fn collect_outcomes(
    mut tasks: JoinSet<(usize, Outcome)>,
    mut names: HashMap<task::Id, (usize, String)>,
    total: u64,
    progress: &dyn IngestProgressReporter,
) -> Vec<(usize, Outcome)> {
    let mut outcomes = Vec::with_capacity(names.len());
    let mut done = 0u64;
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                let Some((index, name)) = names.remove(&e.id()) else {
                    warn!(error = %e, "ingest task failed for an untracked file");
                    continue;
                };
                warn!(file = %name, error = %e, "ingest task failed");
                let skip = SkippedFile {
                    name,
                    reasons: vec![format!("Extraction aborted: {}", e)],
                };
                (index, Outcome::Skipped(skip))
            }
        };
        done += 1;
        match &outcome {
            Outcome::Ingested(file) => progress.report(IngestProgressEvent::Processed {
                name: file.name.clone(),
                n: done,
                total,
            }),
            Outcome::Skipped(skip) => progress.report(IngestProgressEvent::Skipped {
                name: skip.name.clone(),
                reason: skip.reasons.join("; "),
            }),
        }
        outcomes.push((index, outcome));
    }
    outcomes
}

/// `chx ingest`: collect paths, run one batch, print the summary.
pub async fn run_ingest(
    config: &Config,
    paths: &[PathBuf],
    json: bool,
    mode: ProgressMode,
) -> Result<()> {
    let inputs = sources::collect_inputs(paths, &config.ingest)?;
    let ingestor = Ingestor::new(config.ingest.clone());
    let reporter = mode.reporter();
    let report = ingestor.ingest_batch(inputs, reporter.as_ref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("ingest");
    println!("  ingested: {}", report.files.len());
    for file in &report.files {
        println!(
            "    {} ({}, {} chunks)",
            file.name,
            file.format.tag(),
            file.chunks.len()
        );
    }
    println!("  skipped: {}", report.skipped.len());
    for skip in &report.skipped {
        println!("    {}: {}", skip.name, skip.reasons.join("; "));
    }
    if report.truncated > 0 {
        println!("  truncated: {}", report.truncated);
    }
    println!("ok");

    Ok(())
}
