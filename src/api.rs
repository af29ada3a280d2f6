use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{TransferError, TransferResult};
use crate::models::{
    ActionPlanRequest, ActionPlanResult, ErrorBody, HealthStatus, QuestionGenerationRequest,
    QuestionResult, SwotRequest, SwotResult, UploadFile,
};

/// Generation endpoints of the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GenerateQuestions,
    GenerateSwot,
    GenerateActionPlan,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::GenerateQuestions => "/api/generate-questions",
            Endpoint::GenerateSwot => "/api/generate-swot",
            Endpoint::GenerateActionPlan => "/api/generate-action-plan",
        }
    }

    /// Message used when an error body carries no usable `detail`.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Endpoint::GenerateQuestions => "Error generating questions",
            Endpoint::GenerateSwot => "Error generating SWOT analysis",
            Endpoint::GenerateActionPlan => "Error generating action plan",
        }
    }
}

/// A multipart field value: plain text, or one or more files sent as
/// repeated parts under the same name.
#[derive(Debug, Clone)]
pub enum MultipartField {
    Text(String),
    Files(Vec<UploadFile>),
}

#[derive(Debug, Clone)]
pub struct MultipartResponse {
    pub status: StatusCode,
    /// Parsed JSON body, `Value::Null` when the body is not JSON.
    pub body: Value,
}

/// Operations the workflow needs from the analysis service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn generate_questions(
        &self,
        request: &QuestionGenerationRequest,
    ) -> TransferResult<QuestionResult>;

    async fn generate_swot(&self, request: &SwotRequest) -> TransferResult<SwotResult>;

    async fn generate_action_plan(
        &self,
        request: &ActionPlanRequest,
    ) -> TransferResult<ActionPlanResult>;

    async fn download_pdf(&self, pdf_id: &str, destination: &Path) -> TransferResult<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// No request timeout is set: generation can take minutes and the
    /// service bounds its own latency.
    pub fn new(base_url: impl Into<String>) -> TransferResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("swot-workbench/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a multipart form. Field order is preserved, and every file of a
    /// `Files` field becomes its own part in list order.
    pub async fn post_multipart(
        &self,
        path: &str,
        fields: Vec<(&str, MultipartField)>,
    ) -> TransferResult<MultipartResponse> {
        let mut form = Form::new();
        for (name, field) in fields {
            match field {
                MultipartField::Text(value) => {
                    form = form.text(name.to_string(), value);
                }
                MultipartField::Files(files) => {
                    for file in files {
                        let mime = file.mime_type();
                        let part = Part::bytes(file.content)
                            .file_name(file.file_name)
                            .mime_str(mime)?;
                        form = form.part(name.to_string(), part);
                    }
                }
            }
        }

        let url = self.url(path);
        debug!(%url, "sending multipart request");
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        info!(%url, status = status.as_u16(), "multipart request completed");

        Ok(MultipartResponse { status, body })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        fields: Vec<(&str, MultipartField)>,
    ) -> TransferResult<T> {
        let response = self.post_multipart(endpoint.path(), fields).await?;
        classify(endpoint, response)
    }

    /// Stream an artifact into `destination`. Any failure is reported as a
    /// download error and leaves no file behind.
    pub async fn download_pdf(&self, pdf_id: &str, destination: &Path) -> TransferResult<PathBuf> {
        let url = self.url(&format!(
            "/api/download-pdf/{}",
            urlencoding::encode(pdf_id)
        ));
        debug!(%url, destination = %destination.display(), "downloading artifact");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransferError::download(e.to_string()))?;

        if !response.status().is_success() {
            warn!(%url, status = response.status().as_u16(), "artifact download rejected");
            return Err(TransferError::download(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let partial = partial_path(destination);
        let saved = match write_stream(response, &partial).await {
            Ok(written) => tokio::fs::rename(&partial, destination)
                .await
                .map(|_| written)
                .map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };

        match saved {
            Ok(written) => {
                info!(destination = %destination.display(), bytes = written, "artifact saved");
                Ok(destination.to_path_buf())
            }
            Err(reason) => {
                let _ = tokio::fs::remove_file(&partial).await;
                warn!(%url, %reason, "artifact download failed");
                Err(TransferError::download(reason))
            }
        }
    }

    pub async fn health(&self) -> TransferResult<HealthStatus> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(server_error(status, &body, "Service is unavailable"));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn generate_questions(
        &self,
        request: &QuestionGenerationRequest,
    ) -> TransferResult<QuestionResult> {
        let fields = vec![
            ("csv_file", MultipartField::Files(vec![request.csv_file.clone()])),
            ("business_name", MultipartField::Text(request.business_name.clone())),
            ("api_key", MultipartField::Text(request.api_key.expose().to_string())),
        ];
        self.call(Endpoint::GenerateQuestions, fields).await
    }

    async fn generate_swot(&self, request: &SwotRequest) -> TransferResult<SwotResult> {
        let fields = vec![
            ("csv_file", MultipartField::Files(vec![request.csv_file.clone()])),
            ("pdf_files", MultipartField::Files(request.pdf_files.clone())),
            ("business_name", MultipartField::Text(request.business_name.clone())),
            ("api_key", MultipartField::Text(request.api_key.expose().to_string())),
        ];
        self.call(Endpoint::GenerateSwot, fields).await
    }

    async fn generate_action_plan(
        &self,
        request: &ActionPlanRequest,
    ) -> TransferResult<ActionPlanResult> {
        let swot = &request.swot;
        let fields = vec![
            ("csv_file", MultipartField::Files(vec![swot.csv_file.clone()])),
            ("pdf_files", MultipartField::Files(swot.pdf_files.clone())),
            ("business_name", MultipartField::Text(swot.business_name.clone())),
            ("swot_analysis", MultipartField::Text(request.swot_analysis.clone())),
            ("api_key", MultipartField::Text(swot.api_key.expose().to_string())),
        ];
        self.call(Endpoint::GenerateActionPlan, fields).await
    }

    async fn download_pdf(&self, pdf_id: &str, destination: &Path) -> TransferResult<PathBuf> {
        ApiClient::download_pdf(self, pdf_id, destination).await
    }
}

/// Turn a raw response into the typed result or a server error.
pub fn classify<T: DeserializeOwned>(
    endpoint: Endpoint,
    response: MultipartResponse,
) -> TransferResult<T> {
    if response.status.is_client_error() || response.status.is_server_error() {
        let error = server_error(response.status, &response.body, endpoint.fallback_message());
        warn!(endpoint = endpoint.path(), status = response.status.as_u16(), %error, "service reported an error");
        return Err(error);
    }
    serde_json::from_value(response.body).map_err(|e| TransferError::Decode(e.to_string()))
}

fn server_error(status: StatusCode, body: &Value, fallback: &str) -> TransferError {
    let body = ErrorBody::from_value(body);
    TransferError::Server {
        status: status.as_u16(),
        message: body.message_or(fallback),
        available_businesses: body.available_businesses(),
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_stream(response: reqwest::Response, path: &Path) -> Result<u64, String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| e.to_string())?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        file.write_all(&chunk).await.map_err(|e| e.to_string())?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| e.to_string())?;

    Ok(written)
}
