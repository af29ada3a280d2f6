use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use swot_workbench::forms::{FileSlot, FormField};
use swot_workbench::{
    logging, ApiClient, App, Artifact, Config, OutputHandler, UploadFile, WorkflowError,
};

#[derive(Parser)]
#[command(name = "swot")]
#[command(about = "SWOT Workbench - questionnaires, SWOT analyses and action plans from business profiles", long_about = None)]
struct Cli {
    /// Analysis service address (overrides the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// OpenAI API key forwarded to the service (overrides config and OPENAI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a diagnostic questionnaire from a profiling CSV
    Questions {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        business: String,
        /// Save the questionnaire PDF into this directory
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Generate a SWOT analysis, optionally followed by an action plan
    Swot {
        #[arg(long)]
        csv: PathBuf,
        /// Q&A PDFs, sent in the order given
        #[arg(long = "pdf", required = true)]
        pdfs: Vec<PathBuf>,
        #[arg(long)]
        business: String,
        /// Also generate the action plan from the resulting analysis
        #[arg(long)]
        action_plan: bool,
        /// Save every generated PDF into this directory
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Download a generated PDF by id
    Download {
        pdf_id: String,
        /// Destination file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that the analysis service is reachable
    Health,
    /// Show or initialise the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Interactive session (default)
    Session,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = OutputHandler::new().with_debug(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = match err.downcast_ref::<WorkflowError>() {
                Some(workflow_error) => output.print_workflow_error(workflow_error),
                None if output.is_debug() => output.print_error(&format!("{:?}", err)),
                None => output.print_error(&format!("{:#}", err)),
            };
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default()?;
    logging::init(&config.logging.level, cli.debug);

    if let Some(endpoint) = cli.endpoint {
        config.service.base_url = endpoint;
    }
    if let Some(key) = cli.api_key {
        config.service.api_key = Some(key);
    }

    match cli.command.unwrap_or(Command::Session) {
        Command::Session => {
            let mut app = App::new(config)?.with_debug(cli.debug);
            app.run_session().await
        }
        Command::Questions {
            csv,
            business,
            download,
        } => run_questions(App::new(config)?, csv, business, download).await,
        Command::Swot {
            csv,
            pdfs,
            business,
            action_plan,
            download,
        } => run_swot(App::new(config)?, csv, pdfs, business, action_plan, download).await,
        Command::Download { pdf_id, output } => {
            let client = ApiClient::new(config.service.base_url.clone())?;
            let destination = output.unwrap_or_else(|| {
                config
                    .service
                    .download_dir
                    .join(format!("analysis_{}.pdf", pdf_id))
            });
            let saved = client.download_pdf(&pdf_id, &destination).await?;
            OutputHandler::new().print_success(&format!("Saved {}", saved.display()))?;
            Ok(())
        }
        Command::Health => {
            let client = ApiClient::new(config.service.base_url.clone())?;
            let health = client.health().await?;
            println!("{} {} - {}", client.base_url(), health.status, health.message);
            Ok(())
        }
        Command::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => {
                let mut shown = config.clone();
                if shown.service.api_key.is_some() {
                    shown.service.api_key = Some("********".to_string());
                }
                println!("# {}", Config::get_config_path().display());
                print!("{}", serde_yaml::to_string(&shown)?);
                Ok(())
            }
            ConfigAction::Init => {
                let path = Config::get_config_path();
                if path.exists() {
                    anyhow::bail!("{} already exists", path.display());
                }
                Config::default().save()?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        },
    }
}

async fn run_questions(
    mut app: App,
    csv: PathBuf,
    business: String,
    download: Option<PathBuf>,
) -> Result<()> {
    app.forms
        .set_single_file(FileSlot::QuestionsCsv, UploadFile::from_path(&csv).await?);
    app.forms.set_field(FormField::QuestionsBusinessName, business);
    app.run_questions_once().await?;

    if let Some(dir) = download {
        let saved = app.download(Artifact::Questionnaire, Some(&dir)).await?;
        app.output.print_success(&format!("Saved {}", saved.display()))?;
    }
    Ok(())
}

/// A failed action plan still downloads the SWOT PDF before reporting the
/// failure.
async fn run_swot(
    mut app: App,
    csv: PathBuf,
    pdfs: Vec<PathBuf>,
    business: String,
    action_plan: bool,
    download: Option<PathBuf>,
) -> Result<()> {
    app.forms
        .set_single_file(FileSlot::SwotCsv, UploadFile::from_path(&csv).await?);
    let mut files = Vec::with_capacity(pdfs.len());
    for path in &pdfs {
        files.push(UploadFile::from_path(path).await?);
    }
    app.forms.add_files(files);
    app.forms.set_field(FormField::SwotBusinessName, business);
    app.run_swot_once().await?;

    let mut artifacts = vec![Artifact::Swot];
    let plan = if action_plan {
        println!();
        app.run_action_plan_once().await
    } else {
        Ok(())
    };
    if action_plan && plan.is_ok() {
        artifacts.extend([Artifact::ActionPlan, Artifact::Strategy]);
    }

    if let Some(dir) = download {
        for artifact in artifacts {
            match app.download(artifact, Some(&dir)).await {
                Ok(saved) => app.output.print_success(&format!("Saved {}", saved.display()))?,
                Err(e) => app.output.print_error(&e.to_string())?,
            }
        }
    }
    plan
}
