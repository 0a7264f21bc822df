//! Axum route handlers for the Interview API.

use std::io::Write;

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::BytesMut;
use serde::Deserialize;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{DocumentKind, DocumentSource};
use crate::interview::session::SessionView;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

/// Uploads larger than this are written to disk as they arrive instead of buffered.
const SPOOL_THRESHOLD_BYTES: usize = 1024 * 1024;

struct Uploads {
    resume: DocumentSource,
    job_description: DocumentSource,
    /// Keeps spooled files alive until extraction is done.
    _spooled: Vec<NamedTempFile>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let handle = state.sessions.create();
    let view = handle.lock().await.view();
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = state.sessions.get(id)?;
    let view = handle.lock().await.view();
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/start
///
/// Multipart upload with `resume` and `job_description` PDFs. Resets the session,
/// extracts both documents, greets, and asks the first question.
pub async fn handle_start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let uploads = read_uploads(multipart).await?;
    let handle = state.sessions.get(id)?;
    let mut session = handle.lock().await;
    session.reset();

    let resume = state
        .documents
        .read(&uploads.resume, DocumentKind::Resume)
        .await;
    let job_text = state
        .documents
        .read(&uploads.job_description, DocumentKind::JobDescription)
        .await;

    session.start(resume, job_text, &state.generator).await?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:id/answers
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = state.sessions.get(id)?;
    let mut session = handle.lock().await;
    session
        .submit_answer(&request.answer, &state.generator)
        .await?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:id/next
///
/// Retries question generation after a failed attempt.
pub async fn handle_next_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = state.sessions.get(id)?;
    let mut session = handle.lock().await;
    session.advance(&state.generator).await?;
    Ok(Json(session.view()))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = state.sessions.get(id)?;
    let mut session = handle.lock().await;
    session.reset();
    Ok(Json(session.view()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart helpers
// ────────────────────────────────────────────────────────────────────────────

async fn read_uploads(mut multipart: Multipart) -> Result<Uploads, AppError> {
    let mut resume: Option<DocumentSource> = None;
    let mut job_description: Option<DocumentSource> = None;
    let mut spooled = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name != "resume" && name != "job_description" {
            continue;
        }
        if !is_pdf(field.content_type(), field.file_name()) {
            return Err(AppError::Validation(format!("{name} must be a PDF")));
        }
        let source = read_field(field, &name, &mut spooled).await?;
        if name == "resume" {
            resume = Some(source);
        } else {
            job_description = Some(source);
        }
    }

    match (resume, job_description) {
        (Some(resume), Some(job_description)) => Ok(Uploads {
            resume,
            job_description,
            _spooled: spooled,
        }),
        _ => Err(AppError::Validation(
            "Both 'resume' and 'job_description' PDF files are required".to_string(),
        )),
    }
}

/// Buffers a field in memory, switching to a temp file once it passes
/// `SPOOL_THRESHOLD_BYTES`.
async fn read_field(
    mut field: Field<'_>,
    name: &str,
    spooled: &mut Vec<NamedTempFile>,
) -> Result<DocumentSource, AppError> {
    let mut buffer = BytesMut::new();
    let mut spool: Option<NamedTempFile> = None;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))?
    {
        match spool.as_mut() {
            Some(file) => file.write_all(&chunk).map_err(spool_error)?,
            None => {
                buffer.extend_from_slice(&chunk);
                if buffer.len() > SPOOL_THRESHOLD_BYTES {
                    let mut file = tempfile::Builder::new()
                        .prefix("upload-")
                        .suffix(".pdf")
                        .tempfile()
                        .map_err(spool_error)?;
                    file.write_all(&buffer).map_err(spool_error)?;
                    buffer.clear();
                    spool = Some(file);
                }
            }
        }
    }

    match spool {
        Some(mut file) => {
            file.flush().map_err(spool_error)?;
            let path = file.path().to_path_buf();
            spooled.push(file);
            Ok(DocumentSource::Path(path))
        }
        None if buffer.is_empty() => Err(AppError::Validation(format!("{name} is empty"))),
        None => Ok(DocumentSource::Bytes(buffer.freeze())),
    }
}

fn spool_error(err: std::io::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(err).context("Failed to spool upload to disk"))
}

fn is_pdf(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"))
}
