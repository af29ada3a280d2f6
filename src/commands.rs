//! Parser for the interactive session shell.

use std::path::PathBuf;

use crate::forms::{FileSlot, FormField};
use crate::models::Artifact;
use crate::workflow::Step;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SelectFile { slot: FileSlot, path: PathBuf },
    AddPdfs(Vec<PathBuf>),
    RemovePdf(usize),
    SetField { field: FormField, value: String },
    ListPdfs,
    Run(Step),
    Status,
    Download { artifact: Artifact, dir: Option<PathBuf> },
    Help,
    Quit,
}

pub const HELP: &str = "\
Questionnaire form
  questions csv <file>          select the profiling CSV
  questions name <business>     set the business name
  questions key <api-key>       set the OpenAI API key
SWOT form
  swot csv <file>               select the profiling CSV
  swot add <file.pdf>...        append Q&A PDFs (order is kept)
  swot remove <index>           remove a PDF by position
  swot files                    list selected PDFs
  swot name <business>          set the business name
  swot key <api-key>            set the OpenAI API key
Workflow
  run questions|swot|action-plan  submit in the background
  status                          show forms and step states
  download <questionnaire|swot|action-plan|strategy> [dir]
  help | quit";

/// Parse one input line. `Ok(None)` means the line was blank.
pub fn parse(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (head, rest) = split_word(line);
    let command = match head.to_lowercase().as_str() {
        "questions" | "q" => parse_questions(rest)?,
        "swot" | "s" => parse_swot(rest)?,
        "run" => SessionCommand::Run(parse_step(rest)?),
        "status" => SessionCommand::Status,
        "download" | "dl" => parse_download(rest)?,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("Unknown command '{}'. Type 'help' for a list.", other)),
    };
    Ok(Some(command))
}

fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    }
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, String> {
    if value.is_empty() {
        Err(format!("Missing {}", what))
    } else {
        Ok(value)
    }
}

fn parse_questions(input: &str) -> Result<SessionCommand, String> {
    let (sub, value) = split_word(input);
    match sub {
        "csv" => Ok(SessionCommand::SelectFile {
            slot: FileSlot::QuestionsCsv,
            path: PathBuf::from(require(value, "CSV path")?),
        }),
        "name" => Ok(SessionCommand::SetField {
            field: FormField::QuestionsBusinessName,
            value: require(value, "business name")?.to_string(),
        }),
        "key" => Ok(SessionCommand::SetField {
            field: FormField::QuestionsApiKey,
            value: require(value, "API key")?.to_string(),
        }),
        _ => Err("Usage: questions csv|name|key <value>".to_string()),
    }
}

fn parse_swot(input: &str) -> Result<SessionCommand, String> {
    let (sub, value) = split_word(input);
    match sub {
        "csv" => Ok(SessionCommand::SelectFile {
            slot: FileSlot::SwotCsv,
            path: PathBuf::from(require(value, "CSV path")?),
        }),
        "add" => {
            let paths: Vec<PathBuf> = value.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err("Missing PDF path".to_string());
            }
            Ok(SessionCommand::AddPdfs(paths))
        }
        "remove" | "rm" => require(value, "index")?
            .parse()
            .map(SessionCommand::RemovePdf)
            .map_err(|_| format!("Invalid index '{}'", value)),
        "files" | "ls" => Ok(SessionCommand::ListPdfs),
        "name" => Ok(SessionCommand::SetField {
            field: FormField::SwotBusinessName,
            value: require(value, "business name")?.to_string(),
        }),
        "key" => Ok(SessionCommand::SetField {
            field: FormField::SwotApiKey,
            value: require(value, "API key")?.to_string(),
        }),
        _ => Err("Usage: swot csv|add|remove|files|name|key ...".to_string()),
    }
}

fn parse_step(input: &str) -> Result<Step, String> {
    match input.to_lowercase().as_str() {
        "questions" | "q" => Ok(Step::Questions),
        "swot" | "s" => Ok(Step::Swot),
        "action-plan" | "action" | "plan" => Ok(Step::ActionPlan),
        _ => Err("Usage: run questions|swot|action-plan".to_string()),
    }
}

fn parse_download(input: &str) -> Result<SessionCommand, String> {
    let (name, dir) = split_word(input);
    let artifact = Artifact::parse(name).ok_or_else(|| {
        "Usage: download questionnaire|swot|action-plan|strategy [dir]".to_string()
    })?;
    let dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
    Ok(SessionCommand::Download { artifact, dir })
}
