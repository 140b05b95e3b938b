//! The `refactor` command: rework an existing file according to a task and
//! review the diff before applying it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::ai::ollama::OllamaClient;
use crate::ai::{GenerateRequest, Generator};
use crate::config::Config;
use crate::prelude::{eprintln, println, *};
use crate::review::{self, ReviewOutcome};
use crate::{files, Global};
use codeloom_core::extract::extract_content;
use codeloom_core::prompt::build_refactor_prompt;

const CONTEXT_TREE_DEPTH: usize = 3;

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Path of the file to refactor
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Refactoring task description (required)
    #[arg(short, long)]
    pub task: String,

    /// Directory whose structure is included as prompt context
    #[arg(short = 'c', long)]
    pub context_dir: Option<String>,

    /// Generation temperature
    #[arg(long, default_value = "0.7")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[arg(long, default_value = "4000")]
    pub max_tokens: u32,
}

pub async fn run(options: Options, global: Global) -> Result<()> {
    let path = PathBuf::from(&options.file);

    let Some(original) = files::read_if_exists(&path)? else {
        return Err(eyre!("File {} does not exist", path.display()));
    };

    let config = Config::from_env()
        .with_connection(global.api_url.clone(), global.model.clone())
        .with_sampling(options.temperature, options.max_tokens);

    let project_context = match &options.context_dir {
        Some(dir) => match files::directory_tree(Path::new(dir), CONTEXT_TREE_DEPTH) {
            Ok(tree) => Some(format!("Project structure:\n{tree}")),
            Err(err) => {
                // Missing context degrades the prompt, it does not stop the run.
                eprintln!("{} Could not read context directory {dir}: {err}", "⚠".yellow());
                None
            }
        },
        None => None,
    };

    let prompt = build_refactor_prompt(
        &options.task,
        &options.file,
        &original,
        project_context.as_deref(),
    );

    if global.verbose {
        eprintln!("Model: {}", config.model);
        eprintln!("Prompt length: {} chars", prompt.len());
    }

    let client = OllamaClient::new(&config).map_err(|err| eyre!(err))?;

    let spinner = new_spinner("Connecting to Ollama...");
    if let Err(err) = client.health_check().await {
        spinner.finish_and_clear();
        return Err(eyre!("Ollama connection failed: {err}"));
    }
    spinner.finish_and_clear();

    loop {
        let spinner = new_spinner("Refactoring code...");

        let response = client
            .generate(GenerateRequest {
                prompt: prompt.clone(),
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            })
            .await
            .map_err(|err| {
                spinner.finish_and_clear();
                eyre!("Refactoring failed: {err}")
            })?;

        spinner.finish_and_clear();

        let proposed = extract_content(&response.content);

        match review::review_proposal(&config, &path, Some(&original), proposed)? {
            ReviewOutcome::Regenerate => continue,
            ReviewOutcome::Accepted | ReviewOutcome::Declined => return Ok(()),
        }
    }
}

fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message.to_string());
    spinner
}
