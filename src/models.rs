//! Request and response types exchanged with the analysis service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{TransferError, ValidationError};

/// A file selected by the user, held in memory until submission.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, keeping only its base name for the upload.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TransferError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| TransferError::ReadFile {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, content })
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Size in megabytes with one decimal, e.g. "1.2 MB".
    pub fn display_size(&self) -> String {
        format!("{:.1} MB", self.size() as f64 / 1024.0 / 1024.0)
    }

    pub fn mime_type(&self) -> &'static str {
        let lower = self.file_name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            "text/csv"
        } else if lower.ends_with(".pdf") {
            "application/pdf"
        } else {
            "application/octet-stream"
        }
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("size", &self.size())
            .finish()
    }
}

/// Secret API key. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("(not set)")
        } else {
            f.write_str("********")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGenerationRequest {
    pub csv_file: UploadFile,
    pub business_name: String,
    pub api_key: ApiKey,
}

impl QuestionGenerationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_common(&self.business_name, &self.api_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwotRequest {
    pub csv_file: UploadFile,
    pub pdf_files: Vec<UploadFile>,
    pub business_name: String,
    pub api_key: ApiKey,
}

impl SwotRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pdf_files.is_empty() {
            return Err(ValidationError::MissingPdfFiles);
        }
        check_common(&self.business_name, &self.api_key)
    }
}

/// Inputs of the SWOT run plus the analysis it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlanRequest {
    pub swot: SwotRequest,
    pub swot_analysis: String,
}

fn check_common(business_name: &str, api_key: &ApiKey) -> Result<(), ValidationError> {
    if business_name.trim().is_empty() {
        return Err(ValidationError::MissingBusinessName);
    }
    if api_key.is_empty() {
        return Err(ValidationError::MissingApiKey);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub business_name: String,
    pub questions_count: u32,
    #[serde(default)]
    pub questions_preview: Vec<String>,
    pub pdf_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotResult {
    pub business_name: String,
    pub files_count: u32,
    #[serde(default)]
    pub processed_files: Vec<String>,
    pub swot_analysis: String,
    pub pdf_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlanResult {
    pub business_name: String,
    pub files_count: u32,
    pub action_plan: String,
    pub action_pdf_id: String,
    pub comprehensive_pdf_id: String,
    #[serde(default)]
    pub processed_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// `detail` is either a plain string or an object carrying `message`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Structured {
        message: String,
        #[serde(default)]
        available_businesses: Vec<String>,
    },
    Text(String),
    Other(serde_json::Value),
}

impl ErrorBody {
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Message per the `detail.message` / `detail` / fallback rule.
    pub fn message_or(&self, fallback: &str) -> String {
        match &self.detail {
            Some(ErrorDetail::Structured { message, .. }) if !message.is_empty() => message.clone(),
            Some(ErrorDetail::Text(text)) if !text.is_empty() => text.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn available_businesses(&self) -> Vec<String> {
        match &self.detail {
            Some(ErrorDetail::Structured {
                available_businesses,
                ..
            }) => available_businesses.clone(),
            _ => Vec::new(),
        }
    }
}

/// Generated PDFs that can be downloaded from a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Questionnaire,
    Swot,
    ActionPlan,
    Strategy,
}

impl Artifact {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "questions" | "questionnaire" => Some(Artifact::Questionnaire),
            "swot" => Some(Artifact::Swot),
            "action-plan" | "action" | "plan" => Some(Artifact::ActionPlan),
            "strategy" | "comprehensive" => Some(Artifact::Strategy),
            _ => None,
        }
    }

    pub fn file_name(&self, business_name: &str) -> String {
        let suffix = match self {
            Artifact::Questionnaire => "questionnaire",
            Artifact::Swot => "analyse_SWOT",
            Artifact::ActionPlan => "plan_action",
            Artifact::Strategy => "strategie_complete",
        };
        format!("{}_{}.pdf", file_stem(business_name), suffix)
    }
}

/// Business name made safe for use as a single path component.
fn file_stem(business_name: &str) -> String {
    let stem: String = business_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        "analysis".to_string()
    } else {
        stem.to_string()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Questionnaire => write!(f, "questionnaire"),
            Artifact::Swot => write!(f, "swot"),
            Artifact::ActionPlan => write!(f, "action-plan"),
            Artifact::Strategy => write!(f, "strategy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_detail_message_wins() {
        let body = ErrorBody::from_value(&json!({
            "detail": { "message": "No responses found for business 'Acme'", "available_businesses": ["Foo", "Bar"] }
        }));
        assert_eq!(body.message_or("fallback"), "No responses found for business 'Acme'");
        assert_eq!(body.available_businesses(), vec!["Foo", "Bar"]);
    }

    #[test]
    fn flat_detail_string_is_used() {
        let body = ErrorBody::from_value(&json!({ "detail": "rate limited" }));
        assert_eq!(body.message_or("fallback"), "rate limited");
        assert!(body.available_businesses().is_empty());
    }

    #[test]
    fn unexpected_shapes_fall_back() {
        for value in [
            json!({}),
            json!(null),
            json!({ "detail": [{ "loc": ["body", "csv_file"], "msg": "field required" }] }),
            json!({ "detail": { "code": 7 } }),
            json!({ "detail": "" }),
            json!("Internal Server Error"),
        ] {
            let body = ErrorBody::from_value(&value);
            assert_eq!(body.message_or("Error generating questions"), "Error generating questions");
        }
    }

    #[test]
    fn upload_file_reports_size_and_mime() {
        let file = UploadFile::new("Report.PDF", vec![0u8; 1_300_000]);
        assert_eq!(file.display_size(), "1.2 MB");
        assert_eq!(file.mime_type(), "application/pdf");
        assert_eq!(UploadFile::new("a.csv", "x").mime_type(), "text/csv");
        assert_eq!(UploadFile::new("notes", "x").mime_type(), "application/octet-stream");
    }

    #[test]
    fn api_key_is_never_printed() {
        let key = ApiKey::new("sk-secret");
        assert!(!format!("{:?}", key).contains("sk-secret"));
        assert!(!key.to_string().contains("sk-secret"));
        assert_eq!(ApiKey::default().to_string(), "(not set)");
    }

    #[test]
    fn swot_request_requires_pdfs() {
        let request = SwotRequest {
            csv_file: UploadFile::new("a.csv", "x"),
            pdf_files: Vec::new(),
            business_name: "Acme".into(),
            api_key: ApiKey::new("k"),
        };
        assert_eq!(request.validate(), Err(ValidationError::MissingPdfFiles));
    }

    #[test]
    fn artifact_file_names_follow_business_name() {
        assert_eq!(Artifact::Swot.file_name("Acme"), "Acme_analyse_SWOT.pdf");
        assert_eq!(
            Artifact::Strategy.file_name("Café Dupont & Fils"),
            "Café Dupont & Fils_strategie_complete.pdf"
        );
        assert_eq!(Artifact::parse("action-plan"), Some(Artifact::ActionPlan));
        assert_eq!(Artifact::parse("unknown"), None);
    }

    #[test]
    fn artifact_file_names_stay_in_one_directory() {
        for name in ["../escaped", "/etc/passwd", "a\\..\\b", "..", "  ", "x:y*z?"] {
            let file_name = Artifact::Questionnaire.file_name(name);
            let path = Path::new(&file_name);
            assert_eq!(path.components().count(), 1, "{}", file_name);
            assert!(!file_name.starts_with('.'), "{}", file_name);
        }
        assert_eq!(
            Artifact::Questionnaire.file_name("../escaped"),
            "_escaped_questionnaire.pdf"
        );
        assert_eq!(Artifact::Swot.file_name(".."), "analysis_analyse_SWOT.pdf");
    }
}
