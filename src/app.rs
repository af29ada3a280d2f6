use anyhow::Result;
use reedline::{DefaultPrompt, DefaultPromptSegment, ExternalPrinter, Reedline, Signal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::api::{AnalysisBackend, ApiClient};
use crate::commands::{self, SessionCommand};
use crate::config::Config;
use crate::error::WorkflowError;
use crate::forms::{FormEvent, FormStore};
use crate::models::{ApiKey, Artifact, UploadFile};
use crate::output::{
    format_action_plan_result, format_file_list, format_questions_result, format_status,
    format_swot_result, format_workflow_error, OutputHandler,
};
use crate::workflow::{Step, Workflow};

/// What the shell should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Continue(Option<String>),
    Quit,
}

pub struct App {
    pub config: Config,
    pub forms: FormStore,
    pub workflow: Arc<Workflow>,
    pub output: OutputHandler,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::new(config.service.base_url.clone())?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    pub fn with_backend(config: Config, backend: Arc<dyn AnalysisBackend>) -> Self {
        let mut forms = FormStore::new();
        if let Some(key) = config.resolved_api_key() {
            forms.questions.api_key = ApiKey::new(key.clone());
            forms.swot.api_key = ApiKey::new(key);
        }

        Self {
            config,
            forms,
            workflow: Arc::new(Workflow::new(backend)),
            output: OutputHandler::new(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.output = OutputHandler::new().with_debug(debug);
        self
    }

    /// PDF id and business name behind a downloadable artifact, if the step
    /// producing it has succeeded.
    pub fn artifact_source(&self, artifact: Artifact) -> Option<(String, String)> {
        let state = self.workflow.snapshot();
        match artifact {
            Artifact::Questionnaire => state
                .questions
                .result()
                .map(|r| (r.pdf_id.clone(), r.business_name.clone())),
            Artifact::Swot => state
                .swot
                .result()
                .map(|r| (r.pdf_id.clone(), r.business_name.clone())),
            Artifact::ActionPlan => state
                .action_plan
                .result()
                .map(|r| (r.action_pdf_id.clone(), r.business_name.clone())),
            Artifact::Strategy => state
                .action_plan
                .result()
                .map(|r| (r.comprehensive_pdf_id.clone(), r.business_name.clone())),
        }
    }

    /// Generate the questionnaire from the current form behind a spinner and
    /// print it.
    pub async fn run_questions_once(&self) -> Result<()> {
        let request = self.forms.questions.submission().map_err(WorkflowError::from)?;
        let spinner = self.output.spinner("Generating questionnaire...");
        let outcome = self.workflow.generate_questions(request).await;
        spinner.finish_and_clear();

        let result = outcome?;
        self.output.print_block(&format_questions_result(&result))?;
        Ok(())
    }

    pub async fn run_swot_once(&self) -> Result<()> {
        let request = self.forms.swot.submission().map_err(WorkflowError::from)?;
        let spinner = self.output.spinner("Generating SWOT analysis...");
        let outcome = self.workflow.generate_swot(request).await;
        spinner.finish_and_clear();

        let result = outcome?;
        self.output.print_block(&format_swot_result(&result))?;
        Ok(())
    }

    pub async fn run_action_plan_once(&self) -> Result<()> {
        let spinner = self.output.spinner("Generating action plan...");
        let outcome = self.workflow.generate_action_plan().await;
        spinner.finish_and_clear();

        let result = outcome?;
        self.output.print_block(&format_action_plan_result(&result))?;
        Ok(())
    }

    pub async fn download(&self, artifact: Artifact, dir: Option<&Path>) -> Result<PathBuf> {
        let Some((pdf_id, business_name)) = self.artifact_source(artifact) else {
            anyhow::bail!("No {} available yet", artifact);
        };
        let dir = dir.unwrap_or(&self.config.service.download_dir);
        let destination = dir.join(artifact.file_name(&business_name));
        Ok(self.workflow.download_pdf(&pdf_id, &destination).await?)
    }

    /// Apply one shell command. Submissions run in the background and report
    /// through `notify` when they finish.
    pub async fn handle_command<F>(&mut self, command: SessionCommand, notify: F) -> Result<CommandOutcome>
    where
        F: Fn(String) + Send + 'static,
    {
        let message = match command {
            SessionCommand::SelectFile { slot, path } => {
                let file = UploadFile::from_path(&path).await?;
                let text = format!("Selected {} ({})", file.file_name, file.display_size());
                self.forms.apply(FormEvent::FileSelected { slot, file });
                Some(text)
            }
            SessionCommand::AddPdfs(paths) => {
                let mut files = Vec::with_capacity(paths.len());
                for path in &paths {
                    files.push(UploadFile::from_path(path).await?);
                }
                let added = files.len();
                self.forms.apply(FormEvent::FilesAdded(files));
                Some(format!(
                    "Added {} file(s), {} selected\n{}",
                    added,
                    self.forms.swot.pdf_files.len(),
                    format_file_list(&self.forms.swot.pdf_files)
                ))
            }
            SessionCommand::RemovePdf(index) => {
                let before = self.forms.swot.pdf_files.len();
                self.forms.apply(FormEvent::FileRemoved(index));
                if self.forms.swot.pdf_files.len() < before {
                    Some(format_file_list(&self.forms.swot.pdf_files))
                } else {
                    Some(format!("No PDF at position {}", index))
                }
            }
            SessionCommand::SetField { field, value } => {
                self.forms.apply(FormEvent::FieldChanged { field, value });
                None
            }
            SessionCommand::ListPdfs => Some(format_file_list(&self.forms.swot.pdf_files)),
            SessionCommand::Run(step) => Some(self.submit(step, notify)),
            SessionCommand::Status => Some(format_status(&self.forms, &self.workflow.snapshot())),
            SessionCommand::Download { artifact, dir } => {
                let saved = self.download(artifact, dir.as_deref()).await?;
                Some(format!("Saved {}", saved.display()))
            }
            SessionCommand::Help => Some(commands::HELP.to_string()),
            SessionCommand::Quit => return Ok(CommandOutcome::Quit),
        };
        Ok(CommandOutcome::Continue(message))
    }

    fn submit<F>(&self, step: Step, notify: F) -> String
    where
        F: Fn(String) + Send + 'static,
    {
        if self.workflow.snapshot().step_in_flight(step) {
            return format_workflow_error(&WorkflowError::InFlight(step));
        }
        let workflow = Arc::clone(&self.workflow);

        match step {
            Step::Questions => {
                let request = match self.forms.questions.submission() {
                    Ok(request) => request,
                    Err(e) => return format_workflow_error(&WorkflowError::from(e)),
                };
                tokio::spawn(async move {
                    let text = match workflow.generate_questions(request).await {
                        Ok(result) => format_questions_result(&result),
                        Err(err) => format_workflow_error(&err),
                    };
                    notify(text);
                });
            }
            Step::Swot => {
                let request = match self.forms.swot.submission() {
                    Ok(request) => request,
                    Err(e) => return format_workflow_error(&WorkflowError::from(e)),
                };
                tokio::spawn(async move {
                    let text = match workflow.generate_swot(request).await {
                        Ok(result) => format_swot_result(&result),
                        Err(err) => format_workflow_error(&err),
                    };
                    notify(text);
                });
            }
            Step::ActionPlan => {
                tokio::spawn(async move {
                    let text = match workflow.generate_action_plan().await {
                        Ok(result) => format_action_plan_result(&result),
                        Err(err) => format_workflow_error(&err),
                    };
                    notify(text);
                });
            }
        }
        format!("{} started", step)
    }

    /// Interactive shell over the forms and workflow.
    pub async fn run_session(&mut self) -> Result<()> {
        let printer = ExternalPrinter::<String>::default();
        let mut line_editor = session_editor(printer.clone());

        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("swot".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.output.print_banner()?;
        self.output
            .print_system(&format!("Service: {}", self.config.service.base_url))?;
        self.output.print_system("Type 'help' for commands.")?;

        loop {
            let line = match line_editor.read_line(&prompt)? {
                Signal::Success(line) => line,
                Signal::CtrlD => break,
                _ => continue,
            };

            let command = match commands::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    self.output.print_error(&message)?;
                    continue;
                }
            };
            debug!(?command, "session command");

            let sink = printer.clone();
            let notify = move |text: String| {
                let _ = sink.print(text);
            };
            match self.handle_command(command, notify).await {
                Ok(CommandOutcome::Continue(Some(text))) => self.output.print_block(&text)?,
                Ok(CommandOutcome::Continue(None)) => {}
                Ok(CommandOutcome::Quit) => break,
                Err(e) if self.output.is_debug() => self.output.print_error(&format!("{:#}", e))?,
                Err(e) => self.output.print_error(&e.to_string())?,
            }
        }

        Ok(())
    }
}

/// Line editor for the session shell. History stays in memory because lines
/// such as `swot key ...` carry the API key.
fn session_editor(printer: ExternalPrinter<String>) -> Reedline {
    Reedline::create().with_external_printer(printer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reedline::HistoryItem;

    #[test]
    fn session_history_keeps_keys_off_disk() {
        let mut editor = session_editor(ExternalPrinter::default());
        editor
            .history_mut()
            .save(HistoryItem::from_command_line("swot key sk-live-123"))
            .unwrap();
        editor.history_mut().sync().unwrap();

        assert_eq!(editor.history().count_all().unwrap(), 1);
        let legacy = Config::get_config_path().with_file_name("history.txt");
        let on_disk = std::fs::read_to_string(legacy).unwrap_or_default();
        assert!(!on_disk.contains("sk-live-123"));
    }
}
