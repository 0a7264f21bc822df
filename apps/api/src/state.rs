use std::sync::Arc;

use crate::evaluation::dataset::TrainingExample;
use crate::evaluation::scorer::QualityScorer;
use crate::extraction::DocumentReader;
use crate::interview::generator::QuestionGenerator;
use crate::interview::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// PDF-to-text with a content-hash cache in front of the backend. Default: LlamaParse.
    pub documents: Arc<DocumentReader>,
    /// Cached, retrying question generator primed with the tuned demonstrations.
    pub generator: Arc<QuestionGenerator>,
    pub scorer: Arc<QualityScorer>,
    pub sessions: SessionStore,
    /// Labelled examples for `/evaluation/run`.
    pub trainset: Arc<Vec<TrainingExample>>,
}
