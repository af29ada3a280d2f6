//! Error types shared by the form store, transfer client and workflow.

use thiserror::Error;

use crate::workflow::Step;

/// Local validation failures, detected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A CSV file is required")]
    MissingCsvFile,

    #[error("At least one PDF file is required")]
    MissingPdfFiles,

    #[error("Business name is required")]
    MissingBusinessName,

    #[error("API key is required")]
    MissingApiKey,

    #[error("SWOT analysis must be generated first")]
    SwotRequired,
}

/// Failures raised while talking to the analysis service.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The request never produced a response (offline, DNS, reset...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status with the message extracted from the error body.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        available_businesses: Vec<String>,
    },

    /// A 2xx body that does not have the expected shape.
    #[error("Unexpected response from service: {0}")]
    Decode(String),

    #[error("Failed to download PDF")]
    Download { reason: String },

    #[error("Could not read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    pub fn download(reason: impl Into<String>) -> Self {
        Self::Download {
            reason: reason.into(),
        }
    }

    /// HTTP status for server-reported failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors surfaced by a workflow step.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} generation is already in progress")]
    InFlight(Step),

    /// SWOT was regenerated while this action plan was running.
    #[error("Action plan discarded because the SWOT analysis was regenerated")]
    Superseded,

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

pub type TransferResult<T> = Result<T, TransferError>;
pub type WorkflowResult<T> = Result<T, WorkflowError>;
