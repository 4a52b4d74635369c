//! Input resolution: expand a batch of paths, directories, and URLs
//! into loadable document sources.
//!
//! Expansion is separated from loading so the orchestrator knows the
//! final batch size (and can report one result per entry, in order)
//! before any bytes are read. A directory contributes its supported
//! files in sorted order; an entry that cannot be expanded stays in the
//! batch carrying the error that will become its per-document failure.

use crate::document::{DocumentFormat, SourceDocument};
use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where one batch entry's bytes come from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    Url(String),
}

/// One scheduled batch entry: the identifier the report will carry,
/// plus either a loadable source or the expansion-time error.
#[derive(Debug)]
pub struct BatchItem {
    pub identifier: String,
    pub source: Result<InputSource, ExtractionError>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Expand user inputs into the final ordered batch.
///
/// Files and URLs map to one entry each. A directory maps to one entry
/// per supported file inside it (non-recursive, sorted by name, the
/// file path becoming the identifier); an empty or unreadable directory
/// maps to a single failed entry so it still appears in the report.
pub fn expand_inputs(inputs: &[String]) -> Vec<BatchItem> {
    let mut items = Vec::with_capacity(inputs.len());

    for input in inputs {
        if is_url(input) {
            items.push(BatchItem {
                identifier: input.clone(),
                source: Ok(InputSource::Url(input.clone())),
            });
            continue;
        }

        let path = PathBuf::from(input);
        if path.is_dir() {
            match expand_directory(&path) {
                Ok(files) if files.is_empty() => items.push(BatchItem {
                    identifier: input.clone(),
                    source: Err(ExtractionError::Unreadable {
                        detail: "directory contains no supported documents".into(),
                    }),
                }),
                Ok(files) => {
                    info!(
                        "expanded directory '{}' to {} documents",
                        path.display(),
                        files.len()
                    );
                    for file in files {
                        items.push(BatchItem {
                            identifier: file.display().to_string(),
                            source: Ok(InputSource::Path(file)),
                        });
                    }
                }
                Err(e) => items.push(BatchItem {
                    identifier: input.clone(),
                    source: Err(ExtractionError::Unreadable {
                        detail: format!("failed to read directory: {e}"),
                    }),
                }),
            }
        } else {
            items.push(BatchItem {
                identifier: input.clone(),
                source: Ok(InputSource::Path(path)),
            });
        }
    }

    items
}

/// Supported files directly inside `dir`, sorted by path for a
/// deterministic batch order.
fn expand_directory(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && DocumentFormat::from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

/// Load one entry's bytes and detect its format.
///
/// Local paths are typed by extension; URL inputs are scraped web pages
/// and always load as HTML. All failures are per-document
/// ([`ExtractionError`]), never fatal for the batch.
pub async fn load(
    source: &InputSource,
    identifier: &str,
    fetch_timeout: Duration,
) -> Result<SourceDocument, ExtractionError> {
    match source {
        InputSource::Path(path) => {
            let format = DocumentFormat::from_path(path).ok_or_else(|| {
                ExtractionError::UnsupportedFormat {
                    extension: path
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("")
                        .to_string(),
                }
            })?;
            let bytes =
                tokio::fs::read(path)
                    .await
                    .map_err(|e| ExtractionError::Unreadable {
                        detail: format!("{}: {e}", path.display()),
                    })?;
            debug!("read {} bytes from {}", bytes.len(), path.display());
            Ok(SourceDocument {
                identifier: identifier.to_string(),
                format,
                bytes,
            })
        }
        InputSource::Url(url) => {
            let bytes = fetch_url(url, fetch_timeout).await?;
            Ok(SourceDocument {
                identifier: identifier.to_string(),
                format: DocumentFormat::Html,
                bytes,
            })
        }
    }
}

async fn fetch_url(url: &str, timeout: Duration) -> Result<Vec<u8>, ExtractionError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ExtractionError::Unreadable {
            detail: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ExtractionError::Unreadable {
            detail: format!("failed to fetch {url}: {e}"),
        })?;

    if !response.status().is_success() {
        return Err(ExtractionError::Unreadable {
            detail: format!("HTTP {} fetching {url}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractionError::Unreadable {
            detail: format!("failed to read body of {url}: {e}"),
        })?;
    debug!("fetched {} bytes from {url}", bytes.len());
    Ok(bytes.to_vec())
}
