use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::extraction::DEFAULT_MAX_WORDS;

/// Application configuration loaded from environment variables.
/// Fails at startup if either backend API key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llama_parse_api_key: String,
    pub llama_parse_base_url: String,
    pub llama_parse_poll_interval: Duration,
    pub llama_parse_max_polls: u32,
    pub port: u16,
    pub rust_log: String,
    /// Word budget applied to every extracted document.
    pub max_document_words: usize,
    pub extraction_cache_ttl: Duration,
    pub extraction_cache_max_entries: usize,
    pub retry_max_attempts: u32,
    pub rate_limit_backoff: Duration,
    pub question_cache_ttl: Duration,
    pub question_cache_max_entries: usize,
    /// Sessions untouched for this long are dropped.
    pub session_idle_ttl: Duration,
    pub max_sessions: usize,
    pub tuning_artifact_path: PathBuf,
    pub compile_tuning_on_startup: bool,
    pub target_seniority: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llama_parse_api_key: require_env("LLAMA_PARSE_API_KEY")?,
            llama_parse_base_url: std::env::var("LLAMA_PARSE_BASE_URL")
                .unwrap_or_else(|_| "https://api.cloud.llamaindex.ai".to_string()),
            llama_parse_poll_interval: Duration::from_millis(parse_env(
                "LLAMA_PARSE_POLL_INTERVAL_MS",
                2000,
            )?),
            llama_parse_max_polls: parse_env("LLAMA_PARSE_MAX_POLLS", 60)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_document_words: parse_env("MAX_DOCUMENT_WORDS", DEFAULT_MAX_WORDS)?,
            extraction_cache_ttl: Duration::from_secs(parse_env(
                "EXTRACTION_CACHE_TTL_SECS",
                1200,
            )?),
            extraction_cache_max_entries: parse_env("EXTRACTION_CACHE_MAX_ENTRIES", 32)?,
            retry_max_attempts: parse_env("RETRY_MAX_ATTEMPTS", 3)?,
            rate_limit_backoff: Duration::from_secs(parse_env("RATE_LIMIT_BACKOFF_SECS", 70)?),
            question_cache_ttl: Duration::from_secs(parse_env("QUESTION_CACHE_TTL_SECS", 3600)?),
            question_cache_max_entries: parse_env("QUESTION_CACHE_MAX_ENTRIES", 9)?,
            session_idle_ttl: Duration::from_secs(parse_env("SESSION_IDLE_TTL_SECS", 1800)?),
            max_sessions: parse_env("MAX_SESSIONS", 1000)?,
            tuning_artifact_path: std::env::var("TUNING_ARTIFACT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/compiled_interview_module.json")),
            compile_tuning_on_startup: parse_env("COMPILE_TUNING_ON_STARTUP", true)?,
            target_seniority: std::env::var("TARGET_SENIORITY")
                .unwrap_or_else(|_| "senior developer".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Placeholder keys, no startup compile, and an artifact path nobody reads.
    pub fn for_tests() -> Self {
        Config {
            anthropic_api_key: "test-anthropic-key".to_string(),
            llama_parse_api_key: "test-llama-key".to_string(),
            llama_parse_base_url: "http://127.0.0.1:1".to_string(),
            llama_parse_poll_interval: Duration::from_millis(10),
            llama_parse_max_polls: 3,
            port: 0,
            rust_log: "debug".to_string(),
            max_document_words: DEFAULT_MAX_WORDS,
            extraction_cache_ttl: Duration::from_secs(1200),
            extraction_cache_max_entries: 32,
            retry_max_attempts: 3,
            rate_limit_backoff: Duration::from_secs(70),
            question_cache_ttl: Duration::from_secs(3600),
            question_cache_max_entries: 9,
            session_idle_ttl: Duration::from_secs(1800),
            max_sessions: 16,
            tuning_artifact_path: PathBuf::from("target/test-artifact.json"),
            compile_tuning_on_startup: false,
            target_seniority: "senior developer".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u32 = parse_env("INTERVIEWER_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_require_env_reports_missing_key() {
        let err = require_env("INTERVIEWER_TEST_MISSING_KEY").unwrap_err();
        assert!(err.to_string().contains("INTERVIEWER_TEST_MISSING_KEY"));
    }
}
