//! CLI binary for docgen.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the batch, and prints the per-document
//! report. Exit code 0 means the inference service was reachable
//! (individual document failures are visible in the report); a
//! non-zero exit means the service never became ready.

use anyhow::{Context, Result};
use clap::Parser;
use docgen::{
    run_batch, write_report, DocGenError, GenerationResult, PipelineConfig, ProgressCallback,
    RunProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per
/// document as it reaches a terminal result.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} docs  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Waiting");
        bar.set_message("checking inference service…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl RunProgressCallback for CliProgress {
    fn on_run_start(&self, total_docs: usize) {
        self.bar.set_length(total_docs as u64);
        self.bar.set_prefix("Processing");
        self.bar.set_message(String::new());
    }

    fn on_generation_start(&self, _index: usize, _total: usize, identifier: &str) {
        self.bar.set_message(identifier.to_string());
    }

    fn on_document_complete(&self, _index: usize, total: usize, identifier: &str, ok: bool) {
        if ok {
            self.bar.println(format!(
                "  {} {:<48} {}",
                green("✓"),
                identifier,
                dim(&format!("{}/{total}", self.bar.position() + 1)),
            ));
        } else {
            self.bar.println(format!("  {} {identifier}", red("✗")));
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_docs: usize, success_count: usize) {
        let failed = total_docs.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} documents processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents processed  ({} failed)",
                if failed == total_docs { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_docs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Describe every supported document in a folder (report to stdout)
  docgen ./datasheets/

  # Mix files and web pages, write the report to a file
  docgen catalog.pdf deck.pptx https://example.com/product -o report.json

  # One JSON file per document, original-style output folder
  docgen ./datasheets/ -o output/

  # Custom instruction from a file, different model
  docgen -i @instruction.txt --model mistral catalog.pdf

  # Service on another host, longer startup budget
  docgen --endpoint http://gpu-box:11434 --startup-timeout 300 deck.pptx

SUPPORTED FORMATS:
  .pdf  .pptx  .docx  .html/.htm  and http(s):// URLs (scraped as HTML)

EXIT STATUS:
  0  the inference service became ready (per-document failures, if
     any, are recorded in the report)
  1  the service never answered its health endpoint, or the
     configuration was invalid

ENVIRONMENT VARIABLES:
  DOCGEN_ENDPOINT     Inference service base URL
  DOCGEN_MODEL        Model name
  DOCGEN_INSTRUCTION  Task instruction template
  RUST_LOG            Tracing filter (e.g. docgen=debug)
"#;

/// Generate derived product content from documents with a local LLM.
#[derive(Parser, Debug)]
#[command(
    name = "docgen",
    version,
    about = "Extract text from product documents and generate derived content with a local LLM",
    long_about = "Extract text from PDF, PPTX, DOCX, and HTML documents (or scraped web pages), \
build prompts, and drive a locally running inference service (Ollama-compatible) with readiness \
checks, retries, and timeouts. Produces one result record per input document, in input order.",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document paths, directories, or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Report destination: a JSON file, or an existing directory for
    /// one file per document. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Task instruction template, or @path to read it from a file.
    #[arg(short, long, env = "DOCGEN_INSTRUCTION")]
    instruction: Option<String>,

    /// Model name passed to the generation endpoint.
    #[arg(long, env = "DOCGEN_MODEL", default_value = "llama3")]
    model: String,

    /// Inference service base URL.
    #[arg(long, env = "DOCGEN_ENDPOINT", default_value = "http://localhost:11434")]
    endpoint: String,

    /// Max tokens generated per document.
    #[arg(long, default_value_t = 1024)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Retries per document on transient inference failure.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Seconds to wait for the service to become ready.
    #[arg(long, default_value_t = 60)]
    startup_timeout: u64,

    /// Per-request inference timeout in seconds.
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,

    /// Timeout for fetching URL inputs in seconds.
    #[arg(long, default_value_t = 30)]
    fetch_timeout: u64,

    /// Parallel extraction workers.
    #[arg(long, default_value_t = 4)]
    extract_concurrency: usize,

    /// Cap on context blocks per prompt (drops from the end, headings
    /// last).
    #[arg(long)]
    max_context_blocks: Option<usize>,

    /// Hard ceiling on prompt length in characters.
    #[arg(long)]
    max_prompt_chars: Option<usize>,

    /// Echo the document identifier into the prompt.
    #[arg(long)]
    metadata: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the report.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the per-document feedback; INFO logs on
    // top of it would interleave badly, so they are off unless -v.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress).await?;

    // ── Run the batch ────────────────────────────────────────────────────
    let run = match run_batch(&cli.inputs, &config).await {
        Ok(run) => run,
        Err(e @ DocGenError::ServiceUnavailable { .. }) => {
            // Run-level failure: report it and exit non-zero.
            return Err(anyhow::Error::new(e));
        }
        Err(e) => return Err(anyhow::Error::new(e)).context("run failed"),
    };

    // ── Emit the report ──────────────────────────────────────────────────
    // An existing directory (or a trailing slash) selects one file per
    // document; anything else is a single report file.
    match cli.output {
        Some(ref path) if path.is_dir() || path.to_string_lossy().ends_with('/') => {
            write_per_document(path, &run.results).await?;
            if !cli.quiet {
                eprintln!(
                    "   {} records written to {}",
                    dim(&run.results.len().to_string()),
                    bold(&path.display().to_string()),
                );
            }
        }
        Some(ref path) => {
            write_report(&run, path)
                .await
                .context("failed to write report")?;
            if !cli.quiet {
                eprintln!(
                    "   {} records  →  {}",
                    dim(&run.results.len().to_string()),
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let json = serde_json::to_string_pretty(&run.results)
                .context("failed to serialise report")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(json.as_bytes()).context("failed to write to stdout")?;
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Processed {}/{} documents in {}ms",
            run.stats.succeeded, run.stats.total_docs, run.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let instruction = match cli.instruction.as_deref() {
        Some(value) if value.starts_with('@') => Some(
            tokio::fs::read_to_string(&value[1..])
                .await
                .with_context(|| format!("failed to read instruction from {}", &value[1..]))?
                .trim()
                .to_string(),
        ),
        Some(inline) => Some(inline.to_string()),
        None => None,
    };

    let mut builder = PipelineConfig::builder()
        .endpoint(&cli.endpoint)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .startup_timeout_secs(cli.startup_timeout)
        .request_timeout_secs(cli.request_timeout)
        .fetch_timeout_secs(cli.fetch_timeout)
        .extract_concurrency(cli.extract_concurrency)
        .include_metadata(cli.metadata);

    if let Some(instruction) = instruction {
        builder = builder.task_instruction(instruction);
    }
    if let Some(n) = cli.max_context_blocks {
        builder = builder.max_context_blocks(n);
    }
    if let Some(n) = cli.max_prompt_chars {
        builder = builder.max_prompt_chars(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("invalid configuration")
}

/// Write one JSON file per document into `dir`, named after the input.
async fn write_per_document(dir: &Path, results: &[GenerationResult]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for result in results {
        let name = format!("{}.json", slugify(&result.identifier));
        let path = dir.join(name);
        let json = serde_json::to_string_pretty(result)
            .context("failed to serialise record")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Reduce an identifier (path or URL) to a safe file stem.
fn slugify(identifier: &str) -> String {
    let base = if let Ok(url) = reqwest::Url::parse(identifier) {
        if url.scheme().starts_with("http") {
            format!(
                "{}{}",
                url.host_str().unwrap_or("").replace('.', "_"),
                url.path().replace('/', "_")
            )
        } else {
            identifier.to_string()
        }
    } else {
        Path::new(identifier)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(identifier)
            .to_string()
    };

    let slug: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug
    }
}
