// Library exports for the SWOT Workbench client

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod models;
pub mod output;
pub mod workflow;

pub use api::{AnalysisBackend, ApiClient, Endpoint, MultipartField, MultipartResponse};
pub use app::App;
pub use config::Config;
pub use error::{TransferError, ValidationError, WorkflowError};
pub use forms::{FileSlot, FormEvent, FormField, FormStore};
pub use models::{
    ActionPlanRequest, ActionPlanResult, ApiKey, Artifact, QuestionGenerationRequest,
    QuestionResult, SwotRequest, SwotResult, UploadFile,
};
pub use output::OutputHandler;
pub use workflow::{Step, StepState, Workflow, WorkflowState};
