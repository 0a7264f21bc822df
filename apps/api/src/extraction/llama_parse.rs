//! LlamaParse client — uploads a PDF, polls the parse job, and fetches plain text.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::{DocumentExtractor, DocumentKind, ExtractionError};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_POLLS: u32 = 60;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct TextResult {
    text: String,
}

#[derive(Clone)]
pub struct LlamaParseClient {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl LlamaParseClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, ExtractionError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    async fn upload(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/parsing/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let upload: UploadResponse = check(response).await?.json().await?;
        Ok(upload.id)
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<(), ExtractionError> {
        for poll in 1..=self.max_polls {
            let response = self
                .client
                .get(format!("{}/api/parsing/job/{job_id}", self.base_url))
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let job: JobStatus = check(response).await?.json().await?;
            debug!("Parse job {job_id} poll {poll}: {}", job.status);

            match job.status.as_str() {
                "SUCCESS" => return Ok(()),
                "PENDING" => tokio::time::sleep(self.poll_interval).await,
                other => {
                    return Err(ExtractionError::JobFailed {
                        job_id: job_id.to_string(),
                        status: other.to_string(),
                    })
                }
            }
        }

        Err(ExtractionError::Timeout {
            job_id: job_id.to_string(),
            polls: self.max_polls,
        })
    }

    async fn fetch_text(&self, job_id: &str) -> Result<String, ExtractionError> {
        let response = self
            .client
            .get(format!(
                "{}/api/parsing/job/{job_id}/result/text",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let result: TextResult = check(response).await?.json().await?;
        Ok(result.text)
    }
}

#[async_trait]
impl DocumentExtractor for LlamaParseClient {
    async fn extract(&self, path: &Path, kind: DocumentKind) -> Result<String, ExtractionError> {
        let job_id = self.upload(path).await?;
        debug!("Uploaded {} as parse job {job_id}", kind.as_str());
        self.wait_for_job(&job_id).await?;
        self.fetch_text(&job_id).await
    }
}

async fn check(response: Response) -> Result<Response, ExtractionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ExtractionError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pdf_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();
        file
    }

    fn client_for(server: &MockServer) -> LlamaParseClient {
        LlamaParseClient::new("llx-test".to_string(), server.uri())
            .unwrap()
            .with_polling(Duration::from_millis(1), 3)
    }

    async fn mount_upload(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/parsing/upload"))
            .and(header("authorization", "Bearer llx-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-1"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_extract_happy_path() {
        let server = MockServer::start().await;
        mount_upload(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/parsing/job/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/parsing/job/job-1/result/text"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"text": "Jane Doe\nRust engineer"})),
            )
            .mount(&server)
            .await;

        let file = pdf_file();
        let text = client_for(&server)
            .extract(file.path(), DocumentKind::Resume)
            .await
            .unwrap();
        assert_eq!(text, "Jane Doe\nRust engineer");
    }

    #[tokio::test]
    async fn test_failed_job_is_reported() {
        let server = MockServer::start().await;
        mount_upload(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/parsing/job/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ERROR"})))
            .mount(&server)
            .await;

        let file = pdf_file();
        let err = client_for(&server)
            .extract(file.path(), DocumentKind::Resume)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::JobFailed { .. }));
    }

    #[tokio::test]
    async fn test_pending_job_times_out() {
        let server = MockServer::start().await;
        mount_upload(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/parsing/job/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "PENDING"})))
            .expect(3)
            .mount(&server)
            .await;

        let file = pdf_file();
        let err = client_for(&server)
            .extract(file.path(), DocumentKind::JobDescription)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Timeout { polls: 3, .. }));
    }

    #[tokio::test]
    async fn test_rejected_key_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/parsing/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let file = pdf_file();
        let err = client_for(&server)
            .extract(file.path(), DocumentKind::Resume)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Api { status: 401, .. }));
    }
}
