//! Document extraction — turns an uploaded PDF into bounded plain text.
//!
//! The parsing itself is delegated to an external backend behind `DocumentExtractor`.
//! `DocumentReader` resolves the upload into a file path, calls the backend, and
//! truncates the result. Results are memoized by content hash, so re-uploading the
//! same PDF does not hit the backend again. Failures never propagate: the caller
//! gets an empty string and decides what a missing document means for the session.

pub mod llama_parse;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;

/// Default word budget for extracted documents.
pub const DEFAULT_MAX_WORDS: usize = 2048;

/// Which document an upload represents. Forwarded to the backend for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    JobDescription,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::JobDescription => "job_description",
        }
    }
}

/// An uploaded document, either spooled to disk or held in memory.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Bytes),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parser API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse job {job_id} failed with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("Parse job {job_id} did not finish after {polls} polls")]
    Timeout { job_id: String, polls: u32 },

    #[error("No text was extracted")]
    Empty,
}

/// External PDF-to-text backend.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, path: &Path, kind: DocumentKind) -> Result<String, ExtractionError>;
}

/// Extracted, truncated text keyed by the SHA-256 of the document bytes.
pub type ExtractionCache = TtlCache<String, String>;

/// Front door for document text: digest, cache lookup, extraction, truncation.
pub struct DocumentReader {
    extractor: Arc<dyn DocumentExtractor>,
    cache: ExtractionCache,
    max_words: usize,
}

impl DocumentReader {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, cache: ExtractionCache, max_words: usize) -> Self {
        Self {
            extractor,
            cache,
            max_words,
        }
    }

    /// Extracts and truncates a document. Returns an empty string on any failure.
    /// Only non-empty results are cached, so a failed document can be retried.
    pub async fn read(&self, source: &DocumentSource, kind: DocumentKind) -> String {
        let digest = match content_digest(source).await {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!("Could not hash {}, skipping the cache: {e}", kind.as_str());
                None
            }
        };

        if let Some(text) = digest.as_ref().and_then(|d| self.cache.get(d)) {
            debug!("Extraction cache hit for {}", kind.as_str());
            return text;
        }

        match try_extract(self.extractor.as_ref(), source, kind).await {
            Ok(text) => {
                let truncated = truncate_words(&text, self.max_words);
                info!(
                    "Extracted {} ({} words kept)",
                    kind.as_str(),
                    truncated.split_whitespace().count()
                );
                if let Some(digest) = digest {
                    self.cache.insert(digest, truncated.clone());
                }
                truncated
            }
            Err(e) => {
                warn!("Failed to extract {}: {e}", kind.as_str());
                String::new()
            }
        }
    }
}

/// Hex SHA-256 of the document bytes. Spooled files are hashed in chunks.
async fn content_digest(source: &DocumentSource) -> Result<String, std::io::Error> {
    let mut hasher = Sha256::new();
    match source {
        DocumentSource::Bytes(bytes) => hasher.update(bytes),
        DocumentSource::Path(path) => {
            let mut file = tokio::fs::File::open(path).await?;
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

async fn try_extract(
    extractor: &dyn DocumentExtractor,
    source: &DocumentSource,
    kind: DocumentKind,
) -> Result<String, ExtractionError> {
    let text = match source {
        DocumentSource::Path(path) => extractor.extract(path, kind).await?,
        DocumentSource::Bytes(bytes) => {
            // The staged file is removed when `staged` drops, on every return path.
            let staged = stage_bytes(bytes)?;
            extractor.extract(staged.path(), kind).await?
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}

fn stage_bytes(bytes: &[u8]) -> Result<tempfile::NamedTempFile, ExtractionError> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// Keeps at most `max_words` whitespace-delimited words, joined by single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records the path it was handed and whether the file existed at call time.
    struct RecordingExtractor {
        result: Result<String, ()>,
        seen: Mutex<Option<(PathBuf, bool)>>,
        calls: AtomicU32,
    }

    impl RecordingExtractor {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(text.to_string()),
                seen: Mutex::new(None),
                calls: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: Err(()),
                seen: Mutex::new(None),
                calls: AtomicU32::new(0),
            })
        }

        fn seen_path(&self) -> PathBuf {
            self.seen.lock().unwrap().clone().unwrap().0
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentExtractor for RecordingExtractor {
        async fn extract(
            &self,
            path: &Path,
            _kind: DocumentKind,
        ) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some((path.to_path_buf(), path.exists()));
            self.result.clone().map_err(|_| ExtractionError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        }
    }

    fn reader(extractor: Arc<RecordingExtractor>, max_words: usize) -> DocumentReader {
        DocumentReader::new(
            extractor,
            ExtractionCache::new(16, Duration::from_secs(1200)),
            max_words,
        )
    }

    fn pdf_bytes(body: &'static [u8]) -> DocumentSource {
        DocumentSource::Bytes(Bytes::from_static(body))
    }

    #[test]
    fn test_truncate_keeps_word_prefix() {
        let text = "one  two\nthree\tfour five";
        assert_eq!(truncate_words(text, 3), "one two three");
    }

    #[test]
    fn test_truncate_short_text_is_normalized_only() {
        assert_eq!(truncate_words("  a b  ", 10), "a b");
        assert_eq!(truncate_words("", 10), "");
    }

    #[test]
    fn test_truncate_bound_and_prefix_hold_for_many_budgets() {
        let text = "Led migration of billing to Rust services cutting p99 latency by half";
        let words: Vec<&str> = text.split_whitespace().collect();
        for budget in 0..words.len() + 3 {
            let out = truncate_words(text, budget);
            let kept: Vec<&str> = out.split_whitespace().collect();
            assert!(kept.len() <= budget);
            assert_eq!(kept.as_slice(), &words[..kept.len()]);
        }
    }

    #[tokio::test]
    async fn test_bytes_are_staged_and_cleaned_up() {
        let extractor = RecordingExtractor::returning("Senior Java developer");
        let reader = reader(extractor.clone(), DEFAULT_MAX_WORDS);

        let text = reader.read(&pdf_bytes(b"%PDF-1.4 fake"), DocumentKind::Resume).await;

        assert_eq!(text, "Senior Java developer");
        let (path, existed) = extractor.seen.lock().unwrap().clone().unwrap();
        assert!(existed, "staged file must exist while the backend reads it");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert!(!path.exists(), "staged file must be removed afterwards");
    }

    #[tokio::test]
    async fn test_staged_file_removed_when_backend_fails() {
        let extractor = RecordingExtractor::failing();
        let reader = reader(extractor.clone(), DEFAULT_MAX_WORDS);

        let text = reader.read(&pdf_bytes(b"%PDF-1.4 fake"), DocumentKind::Resume).await;

        assert_eq!(text, "");
        assert!(!extractor.seen_path().exists());
    }

    #[tokio::test]
    async fn test_spooled_path_is_left_alone() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4 job").unwrap();
        let extractor = RecordingExtractor::returning("We are hiring");
        let reader = reader(extractor.clone(), DEFAULT_MAX_WORDS);
        let source = DocumentSource::Path(file.path().to_path_buf());

        let text = reader.read(&source, DocumentKind::JobDescription).await;

        assert_eq!(text, "We are hiring");
        assert_eq!(extractor.seen_path(), file.path());
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn test_blank_text_degrades_to_empty() {
        let reader = reader(RecordingExtractor::returning("   \n  "), DEFAULT_MAX_WORDS);
        let text = reader.read(&pdf_bytes(b"x"), DocumentKind::Resume).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let reader = reader(RecordingExtractor::returning("a b c d e f"), 4);
        let text = reader.read(&pdf_bytes(b"x"), DocumentKind::Resume).await;
        assert_eq!(text, "a b c d");
    }

    #[tokio::test]
    async fn test_same_document_is_extracted_once() {
        let extractor = RecordingExtractor::returning("Java developer");
        let reader = reader(extractor.clone(), DEFAULT_MAX_WORDS);

        let first = reader.read(&pdf_bytes(b"%PDF resume"), DocumentKind::Resume).await;
        let second = reader.read(&pdf_bytes(b"%PDF resume"), DocumentKind::Resume).await;
        reader.read(&pdf_bytes(b"%PDF other"), DocumentKind::Resume).await;

        assert_eq!(first, second);
        assert_eq!(extractor.calls(), 2);
    }

    #[tokio::test]
    async fn test_spooled_and_buffered_copies_share_an_entry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF same bytes").unwrap();
        let extractor = RecordingExtractor::returning("Java developer");
        let reader = reader(extractor.clone(), DEFAULT_MAX_WORDS);

        reader.read(&pdf_bytes(b"%PDF same bytes"), DocumentKind::Resume).await;
        let text = reader
            .read(&DocumentSource::Path(file.path().to_path_buf()), DocumentKind::Resume)
            .await;

        assert_eq!(text, "Java developer");
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let extractor = RecordingExtractor::failing();
        let reader = reader(extractor.clone(), DEFAULT_MAX_WORDS);

        reader.read(&pdf_bytes(b"%PDF broken"), DocumentKind::Resume).await;
        reader.read(&pdf_bytes(b"%PDF broken"), DocumentKind::Resume).await;

        assert_eq!(extractor.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_text_expires() {
        let extractor = RecordingExtractor::returning("Java developer");
        let reader = DocumentReader::new(
            extractor.clone(),
            ExtractionCache::new(16, Duration::from_secs(1200)),
            DEFAULT_MAX_WORDS,
        );

        reader.read(&pdf_bytes(b"%PDF resume"), DocumentKind::Resume).await;
        tokio::time::advance(Duration::from_secs(1200)).await;
        reader.read(&pdf_bytes(b"%PDF resume"), DocumentKind::Resume).await;

        assert_eq!(extractor.calls(), 2);
    }
}
