//! Orchestrates the three generation steps.
//!
//! Each step owns a [`StepState`]. State lives behind a mutex that is only
//! held between awaits, so the steps progress independently: a SWOT run in
//! flight never blocks a questionnaire run. The action plan is the only
//! step that reads another step's state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::api::AnalysisBackend;
use crate::error::{ValidationError, WorkflowError, WorkflowResult};
use crate::models::{
    ActionPlanRequest, ActionPlanResult, QuestionGenerationRequest, QuestionResult, SwotRequest,
    SwotResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Questions,
    Swot,
    ActionPlan,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Questions => write!(f, "Questionnaire"),
            Step::Swot => write!(f, "SWOT analysis"),
            Step::ActionPlan => write!(f, "Action plan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepState<T> {
    Idle,
    InFlight,
    Succeeded(T),
    Failed(String),
}

impl<T> Default for StepState<T> {
    fn default() -> Self {
        StepState::Idle
    }
}

impl<T> StepState<T> {
    /// Enter the in-flight state, dropping any previous result or error.
    pub fn begin(&mut self, step: Step) -> WorkflowResult<()> {
        if self.is_in_flight() {
            return Err(WorkflowError::InFlight(step));
        }
        *self = StepState::InFlight;
        Ok(())
    }

    pub fn succeed(&mut self, result: T) {
        *self = StepState::Succeeded(result);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = StepState::Failed(message.into());
    }

    pub fn reset(&mut self) {
        *self = StepState::Idle;
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, StepState::InFlight)
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            StepState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StepState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub questions: StepState<QuestionResult>,
    pub swot: StepState<SwotResult>,
    pub action_plan: StepState<ActionPlanResult>,
    /// Application-level error; cleared whenever an operation starts.
    pub last_error: Option<String>,
    /// Inputs that produced the current SWOT result.
    swot_inputs: Option<SwotRequest>,
    /// Bumped on every SWOT submission to detect stale action plans.
    swot_generation: u64,
}

impl WorkflowState {
    pub fn step_in_flight(&self, step: Step) -> bool {
        match step {
            Step::Questions => self.questions.is_in_flight(),
            Step::Swot => self.swot.is_in_flight(),
            Step::ActionPlan => self.action_plan.is_in_flight(),
        }
    }

    fn action_plan_request(&self) -> Option<ActionPlanRequest> {
        let result = self.swot.result()?;
        let inputs = self.swot_inputs.clone()?;
        Some(ActionPlanRequest {
            swot: inputs,
            swot_analysis: result.swot_analysis.clone(),
        })
    }
}

pub struct Workflow {
    backend: Arc<dyn AnalysisBackend>,
    state: Mutex<WorkflowState>,
}

impl Workflow {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(WorkflowState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.state().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    fn reject(&self, error: ValidationError) -> WorkflowError {
        debug!(%error, "request rejected before sending");
        self.state().last_error = Some(error.to_string());
        error.into()
    }

    pub async fn generate_questions(
        &self,
        request: QuestionGenerationRequest,
    ) -> WorkflowResult<QuestionResult> {
        request.validate().map_err(|e| self.reject(e))?;
        {
            let mut state = self.state();
            state.questions.begin(Step::Questions)?;
            state.last_error = None;
        }
        info!(business = %request.business_name, "generating questionnaire");

        let outcome = self.backend.generate_questions(&request).await;

        let mut state = self.state();
        match outcome {
            Ok(result) => {
                state.questions.succeed(result.clone());
                Ok(result)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%message, "questionnaire generation failed");
                state.questions.fail(message.clone());
                state.last_error = Some(message);
                Err(err.into())
            }
        }
    }

    /// Starting a SWOT run also clears the action plan derived from the
    /// previous analysis. An action plan still in flight keeps its slot until
    /// it returns and is discarded.
    pub async fn generate_swot(&self, request: SwotRequest) -> WorkflowResult<SwotResult> {
        request.validate().map_err(|e| self.reject(e))?;
        {
            let mut state = self.state();
            state.swot.begin(Step::Swot)?;
            if !state.action_plan.is_in_flight() {
                state.action_plan.reset();
            }
            state.swot_inputs = None;
            state.swot_generation += 1;
            state.last_error = None;
        }
        info!(
            business = %request.business_name,
            pdf_files = request.pdf_files.len(),
            "generating SWOT analysis"
        );

        let outcome = self.backend.generate_swot(&request).await;

        let mut state = self.state();
        match outcome {
            Ok(result) => {
                state.swot.succeed(result.clone());
                state.swot_inputs = Some(request);
                Ok(result)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%message, "SWOT generation failed");
                state.swot.fail(message.clone());
                state.last_error = Some(message);
                Err(err.into())
            }
        }
    }

    /// Requires a SWOT result from this session; without one no request is
    /// sent.
    pub async fn generate_action_plan(&self) -> WorkflowResult<ActionPlanResult> {
        let (request, generation) = {
            let mut state = self.state();
            let Some(request) = state.action_plan_request() else {
                drop(state);
                return Err(self.reject(ValidationError::SwotRequired));
            };
            state.action_plan.begin(Step::ActionPlan)?;
            state.last_error = None;
            (request, state.swot_generation)
        };
        info!(business = %request.swot.business_name, "generating action plan");

        let outcome = self.backend.generate_action_plan(&request).await;

        let mut state = self.state();
        if state.swot_generation != generation {
            warn!("discarding action plan built from a superseded SWOT analysis");
            state.action_plan.reset();
            return Err(WorkflowError::Superseded);
        }
        match outcome {
            Ok(result) => {
                state.action_plan.succeed(result.clone());
                Ok(result)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%message, "action plan generation failed");
                state.action_plan.fail(message.clone());
                state.last_error = Some(message);
                Err(err.into())
            }
        }
    }

    pub async fn download_pdf(&self, pdf_id: &str, destination: &Path) -> WorkflowResult<PathBuf> {
        self.state().last_error = None;
        match self.backend.download_pdf(pdf_id, destination).await {
            Ok(path) => Ok(path),
            Err(err) => {
                self.state().last_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }
}
