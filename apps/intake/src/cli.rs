use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::IntakeError;
use crate::intake::{load_case_file, CaseSubmission, IntakeReviewer, PromptLibrary};
use crate::llm_client::{self, LlmClient};

#[derive(Parser, Debug)]
#[command(
    name = "intake",
    about = "Screen post-conviction DNA innocence submissions against the intake criteria",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the bundled case submissions
    List,
    /// Review case submissions (default command; reviews every bundled case)
    Review(ReviewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReviewArgs {
    /// Bundled case to review, by 1-based position or name (repeatable)
    #[arg(long = "case", value_name = "CASE")]
    pub(crate) cases: Vec<String>,
    /// Case submission file to review (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    pub(crate) files: Vec<PathBuf>,
    /// Override the configured wrap width
    #[arg(long)]
    pub(crate) width: Option<usize>,
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let command = cli
        .command
        .unwrap_or_else(|| Command::Review(ReviewArgs::default()));

    match command {
        Command::List => list_cases(&config),
        Command::Review(args) => review_cases(&config, args).await,
    }
}

fn list_cases(config: &Config) -> Result<()> {
    let library = PromptLibrary::resolve(config.prompts_dir.as_deref())?;
    for (idx, case) in library.cases.iter().enumerate() {
        println!("{:>3}  {}", idx + 1, case.name);
    }
    Ok(())
}

async fn review_cases(config: &Config, args: ReviewArgs) -> Result<()> {
    let library = PromptLibrary::resolve(config.prompts_dir.as_deref())?;
    let submissions = select_submissions(&library, &args)?;
    if submissions.is_empty() {
        warn!("No case submissions to review");
        return Ok(());
    }

    let width = args.width.unwrap_or(config.wrap_width);
    let client = LlmClient::new(
        config.resolve_api_key()?,
        &config.openai_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let reviewer = IntakeReviewer::new(
        Arc::new(client),
        library.criteria.clone(),
        library.instructions.clone(),
        width,
    )?;

    // Sequential: each review finishes before the next request goes out.
    for case in &submissions {
        info!(case = %case.name, "Reviewing case submission");
        let answer = reviewer
            .review(&case.text)
            .await
            .with_context(|| format!("Review of case '{}' failed", case.name))?;
        println!("=== {} ===\n{}\n", case.name, answer);
    }

    Ok(())
}

/// Resolves `--case` and `--file` arguments, in that order. With neither given,
/// every bundled case is selected.
pub(crate) fn select_submissions(
    library: &PromptLibrary,
    args: &ReviewArgs,
) -> Result<Vec<CaseSubmission>, IntakeError> {
    if args.cases.is_empty() && args.files.is_empty() {
        return Ok(library.cases.clone());
    }

    let mut selected = Vec::with_capacity(args.cases.len() + args.files.len());
    for selector in &args.cases {
        selected.push(library.find_case(selector)?.clone());
    }
    for path in &args.files {
        selected.push(load_case_file(path)?);
    }
    Ok(selected)
}
