//! Batch orchestration: extraction through generation for every input.
//!
//! Failure isolation is the contract here: one bad document costs one
//! failed result, never the batch. The single exception is the
//! inference service itself — if it never becomes ready there is
//! nothing any document could do, so the run aborts before any
//! generation with zero results.
//!
//! Extraction, normalization, and prompt building are independent per
//! document and run under a bounded worker pool. Generation is issued
//! strictly sequentially over one session: the local service is
//! typically single-model and single-GPU-bound, and concurrent requests
//! risk exhausting the host running the model.

use crate::config::PipelineConfig;
use crate::error::{DocError, DocGenError};
use crate::inference::InferenceClient;
use crate::output::{GenerationResult, PipelineRun, RunStats};
use crate::pipeline::input::BatchItem;
use crate::pipeline::{extract, input, normalize, prompt};
use crate::document::GenerationRequest;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Run the full pipeline over a batch of inputs (paths, directories,
/// URLs).
///
/// Returns `Ok(PipelineRun)` with one result per expanded input, in
/// input order, even when some (or all) documents failed.
///
/// # Errors
/// Returns `Err(DocGenError)` only for run-level failures:
/// - the inference service never became ready
/// - the configuration was invalid
pub async fn run_batch(
    inputs: &[String],
    config: &PipelineConfig,
) -> Result<PipelineRun, DocGenError> {
    let total_start = Instant::now();

    // ── Step 1: Expand inputs ────────────────────────────────────────────
    let items = input::expand_inputs(inputs);
    info!("batch of {} inputs expanded to {} documents", inputs.len(), items.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(items.len());
    }

    // ── Step 2: Readiness gate ───────────────────────────────────────────
    // Before any extraction work: a service that never comes up must
    // produce zero results, not a batch of half-prepared documents.
    let mut client = InferenceClient::from_config(config)?;
    client.ensure_ready().await?;

    // ── Step 3: Prepare documents (parallel, order-preserving) ───────────
    let prepare_start = Instant::now();
    let total = items.len();
    let prepared: Vec<(String, Result<GenerationRequest, DocError>)> =
        stream::iter(items.into_iter().map(|item| {
            let config = config.clone();
            async move {
                let identifier = item.identifier.clone();
                let outcome = prepare_document(item, &config).await;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_prepared(&identifier, outcome.is_ok());
                }
                (identifier, outcome)
            }
        }))
        .buffered(config.extract_concurrency)
        .collect()
        .await;
    let prepare_duration_ms = prepare_start.elapsed().as_millis() as u64;
    debug!("prepared {} documents in {}ms", total, prepare_duration_ms);

    // ── Step 4: Generate (sequential over the single session) ────────────
    let generate_start = Instant::now();
    let mut results = Vec::with_capacity(total);
    for (index, (identifier, outcome)) in prepared.into_iter().enumerate() {
        let result = match outcome {
            Ok(request) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_generation_start(index, total, &identifier);
                }
                client.generate(&request).await
            }
            Err(err) => GenerationResult::failure(&identifier, err, 0, 0),
        };
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_complete(index, total, &identifier, result.is_success());
        }
        results.push(result);
    }
    let generate_duration_ms = generate_start.elapsed().as_millis() as u64;

    // ── Step 5: Aggregate ────────────────────────────────────────────────
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let stats = RunStats {
        total_docs: results.len(),
        succeeded,
        failed: results.len() - succeeded,
        prepare_duration_ms,
        generate_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "run complete: {}/{} documents succeeded in {}ms",
        stats.succeeded, stats.total_docs, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.total_docs, stats.succeeded);
    }

    Ok(PipelineRun { results, stats })
}

/// Load, extract, normalize, and render one batch entry into a
/// generation request. Every failure maps to a per-document error.
async fn prepare_document(
    item: BatchItem,
    config: &PipelineConfig,
) -> Result<GenerationRequest, DocError> {
    let source = item.source.map_err(DocError::Extraction)?;
    let doc = input::load(
        &source,
        &item.identifier,
        Duration::from_secs(config.fetch_timeout_secs),
    )
    .await
    .map_err(DocError::Extraction)?;

    let extracted = extract::extract(&doc).map_err(DocError::Extraction)?;
    let normalized = normalize::normalize(extracted, config.max_block_chars);
    if normalized.is_empty() {
        return Err(DocError::Extraction(
            crate::error::ExtractionError::EmptyDocument,
        ));
    }

    prompt::build_request(&normalized, config)
}

/// Write the run's per-document records to a JSON file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_report(run: &PipelineRun, path: impl AsRef<Path>) -> Result<(), DocGenError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(&run.results)
        .map_err(|e| DocGenError::Internal(format!("failed to serialise report: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DocGenError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| DocGenError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| DocGenError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
