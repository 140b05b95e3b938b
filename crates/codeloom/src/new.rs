//! The `new` command: generate one file from a task description and review
//! it before anything is written.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::ai::ollama::OllamaClient;
use crate::ai::{GenerateRequest, Generator};
use crate::config::Config;
use crate::prelude::{eprintln, println, *};
use crate::review::{self, ReviewOutcome};
use crate::{files, Global};
use codeloom_core::extract::extract_content;
use codeloom_core::prompt::build_new_prompt;

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Path of the file to create
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Task description (required)
    #[arg(short, long)]
    pub task: String,

    /// Reference file to include as prompt context
    #[arg(long)]
    pub context_file: Option<String>,

    /// Generation temperature
    #[arg(long, default_value = "0.7")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[arg(long, default_value = "2000")]
    pub max_tokens: u32,
}

pub async fn run(options: Options, global: Global) -> Result<()> {
    let path = PathBuf::from(&options.file);

    let config = Config::from_env()
        .with_connection(global.api_url.clone(), global.model.clone())
        .with_sampling(options.temperature, options.max_tokens);

    let original = files::read_if_exists(&path)?;

    if original.is_some() {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "{} already exists. Propose changes anyway?",
                path.display()
            ))
            .default(false)
            .interact()
            .map_err(|err| eyre!("Prompt failed: {err}"))?;

        if !overwrite {
            println!("{}", "Operation cancelled.".yellow());
            return Ok(());
        }
    }

    let mut context = Vec::new();
    if let Some(context_file) = &options.context_file {
        match std::fs::read_to_string(context_file) {
            Ok(content) => {
                context.push(format!("Reference file ({context_file}):\n```\n{content}\n```"));
                if global.verbose {
                    eprintln!("Using context from: {context_file}");
                }
            }
            // A bad context file degrades the prompt, it does not stop the run.
            Err(err) => eprintln!(
                "{} Could not read context file {context_file}: {err}",
                "⚠".yellow()
            ),
        }
    }

    let client = OllamaClient::new(&config).map_err(|err| eyre!(err))?;
    let prompt = build_new_prompt(&options.file, &options.task, &context);

    if global.verbose {
        eprintln!("Model: {}", config.model);
        eprintln!("Prompt length: {} chars", prompt.len());
    }

    let spinner = new_spinner("Connecting to Ollama...");
    if let Err(err) = client.health_check().await {
        spinner.finish_and_clear();
        return Err(eyre!("Ollama connection failed: {err}"));
    }
    spinner.finish_and_clear();

    // Regenerate exits the review machine and loops back here for a fresh
    // proposal.
    loop {
        let spinner = new_spinner("Generating code...");

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
                eyre!("Generation failed: {err}")
            })?;

        spinner.finish_and_clear();

        if global.verbose {
            eprintln!(
                "Tokens: {} prompt, {} completion",
                response.usage.prompt_tokens, response.usage.completion_tokens
            );
        }

        let proposed = extract_content(&response.content);

        match review::review_proposal(&config, &path, original.as_deref(), proposed)? {
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
