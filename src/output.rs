use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

use crate::error::{TransferError, WorkflowError};
use crate::forms::FormStore;
use crate::models::{ActionPlanResult, QuestionResult, SwotResult, UploadFile};
use crate::workflow::{StepState, WorkflowState};

pub struct OutputHandler {
    debug: bool,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self { debug: false }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn print_banner(&self) -> io::Result<()> {
        println!("{}", style("╔═══════════════════════════════════════╗").cyan().bold());
        println!("{}", style("║     SWOT Workbench - AI Analysis      ║").cyan().bold());
        println!("{}", style("╚═══════════════════════════════════════╝").cyan().bold());
        Ok(())
    }

    pub fn print_error(&self, content: &str) -> io::Result<()> {
        println!("{} {}", style("Error:").red().bold(), content);
        Ok(())
    }

    pub fn print_workflow_error(&self, error: &WorkflowError) -> io::Result<()> {
        println!("{}", format_workflow_error(error));
        Ok(())
    }

    pub fn print_success(&self, content: &str) -> io::Result<()> {
        println!("{} {}", style("✓").green().bold(), content);
        Ok(())
    }

    pub fn print_system(&self, content: &str) -> io::Result<()> {
        println!("{}", style(content).yellow().dim());
        Ok(())
    }

    pub fn print_block(&self, content: &str) -> io::Result<()> {
        println!("{}", content);
        Ok(())
    }

    /// Spinner shown while a request is in flight.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_workflow_error(error: &WorkflowError) -> String {
    let mut text = format!("{} {}", style("Error:").red().bold(), error);
    if let WorkflowError::Transfer(TransferError::Server {
        available_businesses,
        ..
    }) = error
    {
        if !available_businesses.is_empty() {
            text.push_str(&format!(
                "\n  {} {}",
                style("Available businesses:").dim(),
                available_businesses.join(", ")
            ));
        }
    }
    text
}

pub fn format_questions_result(result: &QuestionResult) -> String {
    let mut lines = vec![
        format!(
            "{} {}",
            style("Questionnaire generated for").green().bold(),
            style(&result.business_name).white().bold()
        ),
        format!("  {} questions", result.questions_count),
    ];
    if !result.questions_preview.is_empty() {
        lines.push(format!("  {}", style("Preview:").dim()));
        for (i, question) in result.questions_preview.iter().enumerate() {
            lines.push(format!("    {}. {}", i + 1, question));
        }
    }
    lines.push(format!("  {} {}", style("PDF:").dim(), result.pdf_id));
    lines.join("\n")
}

pub fn format_swot_result(result: &SwotResult) -> String {
    let mut lines = vec![
        format!(
            "{} {}",
            style("SWOT analysis for").green().bold(),
            style(&result.business_name).white().bold()
        ),
        format!("  {} document(s) processed", result.files_count),
    ];
    for file in &result.processed_files {
        lines.push(format!("    • {}", file));
    }
    lines.push(String::new());
    lines.push(result.swot_analysis.clone());
    lines.push(String::new());
    lines.push(format!("  {} {}", style("PDF:").dim(), result.pdf_id));
    lines.join("\n")
}

pub fn format_action_plan_result(result: &ActionPlanResult) -> String {
    let lines = vec![
        format!(
            "{} {}",
            style("Action plan for").green().bold(),
            style(&result.business_name).white().bold()
        ),
        format!("  {} document(s) processed", result.files_count),
        String::new(),
        result.action_plan.clone(),
        String::new(),
        format!("  {} {}", style("Action plan PDF:").dim(), result.action_pdf_id),
        format!(
            "  {} {}",
            style("Full strategy PDF:").dim(),
            result.comprehensive_pdf_id
        ),
    ];
    lines.join("\n")
}

pub fn format_file_list(files: &[UploadFile]) -> String {
    if files.is_empty() {
        return format!("  {}", style("No PDF files selected").dim());
    }
    files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            format!(
                "  [{}] {} {}",
                i,
                file.file_name,
                style(format!("({})", file.display_size())).dim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_step<T>(state: &StepState<T>) -> String {
    match state {
        StepState::Idle => style("idle").dim().to_string(),
        StepState::InFlight => style("in progress…").yellow().to_string(),
        StepState::Succeeded(_) => style("done").green().to_string(),
        StepState::Failed(message) => format!("{} {}", style("failed:").red(), message),
    }
}

fn describe_file(file: Option<&UploadFile>) -> String {
    match file {
        Some(file) => format!("{} ({})", file.file_name, file.display_size()),
        None => style("(none)").dim().to_string(),
    }
}

fn ready(can_submit: bool) -> String {
    if can_submit {
        style("ready").green().to_string()
    } else {
        style("incomplete").yellow().to_string()
    }
}

pub fn format_status(forms: &FormStore, state: &WorkflowState) -> String {
    let questions = &forms.questions;
    let swot = &forms.swot;
    let mut lines = vec![
        style("Questionnaire").cyan().bold().to_string(),
        format!("  csv:      {}", describe_file(questions.csv_file.as_ref())),
        format!("  business: {}", questions.business_name),
        format!("  api key:  {}", questions.api_key),
        format!("  form:     {}", ready(questions.can_submit())),
        format!("  step:     {}", describe_step(&state.questions)),
        style("SWOT").cyan().bold().to_string(),
        format!("  csv:      {}", describe_file(swot.csv_file.as_ref())),
        format!("  business: {}", swot.business_name),
        format!("  api key:  {}", swot.api_key),
        format!("  pdfs:     {}", swot.pdf_files.len()),
        format!("  form:     {}", ready(swot.can_submit())),
        format!("  step:     {}", describe_step(&state.swot)),
        style("Action plan").cyan().bold().to_string(),
        format!("  step:     {}", describe_step(&state.action_plan)),
    ];
    if let Some(error) = &state.last_error {
        lines.push(format!("{} {}", style("Last error:").red().bold(), error));
    }
    lines.join("\n")
}
