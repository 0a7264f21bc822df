mod cache;
mod config;
mod errors;
mod evaluation;
mod extraction;
mod interview;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::evaluation::dataset::{default_trainset, TrainingExample};
use crate::evaluation::scorer::{LlmAssessor, QualityScorer};
use crate::evaluation::tuning::{load_or_compile, TuningArtifact};
use crate::extraction::llama_parse::LlamaParseClient;
use crate::extraction::{DocumentReader, ExtractionCache};
use crate::interview::generator::{QuestionCache, QuestionGenerator};
use crate::interview::proposer::{Demonstration, LlmQuestionProposer};
use crate::interview::retry::RetryPolicy;
use crate::interview::session::SessionStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing API keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interviewer API v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let extractor = LlamaParseClient::new(
        config.llama_parse_api_key.clone(),
        config.llama_parse_base_url.clone(),
    )?
    .with_polling(config.llama_parse_poll_interval, config.llama_parse_max_polls);
    info!("LlamaParse extractor initialized ({})", config.llama_parse_base_url);
    let documents = Arc::new(DocumentReader::new(
        Arc::new(extractor),
        ExtractionCache::new(
            config.extraction_cache_max_entries,
            config.extraction_cache_ttl,
        ),
        config.max_document_words,
    ));

    let scorer = Arc::new(QualityScorer::new(
        Arc::new(LlmAssessor::new(llm.clone())),
        config.target_seniority.clone(),
    ));
    let trainset = Arc::new(default_trainset());

    let demonstrations = load_demonstrations(&config, &llm, &scorer, &trainset).await;

    let proposer = Arc::new(LlmQuestionProposer::new(llm, demonstrations));
    let generator = Arc::new(QuestionGenerator::new(
        proposer,
        RetryPolicy {
            max_attempts: config.retry_max_attempts,
            base_delay: config.rate_limit_backoff,
        },
        QuestionCache::new(config.question_cache_max_entries, config.question_cache_ttl),
    ));

    let sessions = SessionStore::new(config.max_sessions, config.session_idle_ttl);
    spawn_session_sweeper(sessions.clone(), config.session_idle_ttl);

    let state = AppState {
        documents,
        generator,
        scorer,
        sessions,
        trainset,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drops idle sessions so abandoned interviews do not pile up
/// between lookups.
fn spawn_session_sweeper(sessions: SessionStore, idle_ttl: Duration) {
    let period = (idle_ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = sessions.evict_idle();
            if evicted > 0 {
                info!("Dropped {evicted} idle sessions");
            }
        }
    });
}

/// Tuned demonstrations for the live proposer. Startup never fails on tuning:
/// without an artifact the proposer runs zero-shot.
async fn load_demonstrations(
    config: &Config,
    llm: &LlmClient,
    scorer: &QualityScorer,
    trainset: &[TrainingExample],
) -> Vec<Demonstration> {
    let path = &config.tuning_artifact_path;

    let demonstrations = if config.compile_tuning_on_startup {
        let untuned = LlmQuestionProposer::new(llm.clone(), Vec::new());
        load_or_compile(path, &untuned, scorer, trainset)
            .await
            .map(|artifact| artifact.demonstrations)
    } else {
        TuningArtifact::load(path).await.map(|loaded| match loaded {
            Some(artifact) => artifact.demonstrations,
            None => {
                info!("No tuning artifact at {}, running zero-shot", path.display());
                Vec::new()
            }
        })
    };

    demonstrations.unwrap_or_else(|e| {
        warn!("Starting without tuned demonstrations: {e:#}");
        Vec::new()
    })
}
