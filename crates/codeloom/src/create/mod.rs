//! The `create` command: plan a whole project, then generate every file
//! through the worker pool.

pub mod dispatch;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::ai::ollama::OllamaClient;
use crate::ai::{GenerateRequest, Generator};
use crate::config::Config;
use crate::prelude::{eprintln, println, *};
use codeloom_core::cache::ResponseCache;
use codeloom_core::plan::{parse_plan, ProjectPlan};
use codeloom_core::prompt::build_plan_prompt;
use self::dispatch::{DispatchOptions, DispatchReport};

// Planning wants determinism more than creativity.
const PLAN_TEMPERATURE: f32 = 0.3;
const PLAN_MAX_TOKENS: u32 = 2000;

#[derive(Debug, clap::Args)]
pub struct Options {
    /// What to build, in natural language
    #[arg(value_name = "TASK", required = true, num_args = 1..)]
    pub task: Vec<String>,

    /// Number of files to generate in parallel
    #[arg(short, long, default_value = "3")]
    pub parallel: usize,

    /// Generation temperature
    #[arg(long, default_value = "0.7")]
    pub temperature: f32,

    /// Maximum tokens per generated file
    #[arg(long, default_value = "3000")]
    pub max_tokens: u32,

    /// Disable live streaming of the first worker's output
    #[arg(long)]
    pub no_stream: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Bypass the response cache
    #[arg(long)]
    pub no_cache: bool,
}

pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let task = options.task.join(" ");

    let config = Config::from_env()
        .with_connection(global.api_url.clone(), global.model.clone())
        .with_sampling(options.temperature, options.max_tokens);

    if global.verbose {
        eprintln!("API base: {}", config.api_url);
        eprintln!("Model: {}", config.model);
    }

    let client = Arc::new(OllamaClient::new(&config).map_err(|err| eyre!(err))?);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Connecting to Ollama...");

    // Pre-flight connectivity check and the planning call are the only two
    // fatal failure points of this command.
    if let Err(err) = client.health_check().await {
        spinner.finish_and_clear();
        return Err(eyre!("Ollama connection failed: {err}"));
    }

    spinner.set_message("Planning project structure...");

    let plan_response = client
        .generate(GenerateRequest {
            prompt: build_plan_prompt(&task),
            model: config.model.clone(),
            temperature: PLAN_TEMPERATURE,
            max_tokens: PLAN_MAX_TOKENS,
        })
        .await
        .map_err(|err| {
            spinner.finish_and_clear();
            eyre!("Planning failed: {err}")
        })?;

    let plan = match parse_plan(&plan_response.content) {
        Ok(plan) => plan,
        Err(err) => {
            spinner.finish_and_clear();
            eprintln!("{}", "Raw planning response:".yellow());
            eprintln!("{}", err.raw);
            return Err(eyre!("Could not parse the project plan: {}", err.reason));
        }
    };

    spinner.finish_and_clear();
    println!("{}", format_plan(&plan));

    if !options.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Create these {} files?", plan.files.len()))
            .default(true)
            .interact()
            .map_err(|err| eyre!("Prompt failed: {err}"))?;

        if !confirmed {
            println!("{}", "Operation cancelled.".yellow());
            return Ok(());
        }
    }

    let cache = if options.no_cache {
        None
    } else {
        Some(ResponseCache::new(config.cache_dir.clone()))
    };

    let progress = ProgressBar::new(plan.files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    progress.set_message("Generating files");

    let report = dispatch::dispatch(
        client,
        cache,
        &plan,
        DispatchOptions {
            concurrency: options.parallel.max(1),
            stream_first: !options.no_stream,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            root: PathBuf::from("."),
        },
        progress.clone(),
    )
    .await;

    progress.finish_and_clear();
    println!("{}", format_summary(&report, &plan));

    Ok(())
}

/// Render the plan as a grouped file tree with setup commands.
fn format_plan(plan: &ProjectPlan) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "PROJECT PLAN".bright_cyan().bold()));
    out.push_str(&format!("{}\n", "=".repeat(60).bright_cyan()));
    out.push_str(&format!("Project: {}\n", plan.project_name.bright_white().bold()));
    if !plan.description.is_empty() {
        out.push_str(&format!("Description: {}\n", plan.description));
    }

    // Group by directory so the plan reads as a tree.
    let mut by_dir: BTreeMap<String, Vec<&codeloom_core::plan::PlanFile>> = BTreeMap::new();
    for file in &plan.files {
        let dir = match file.path.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        };
        by_dir.entry(dir).or_default().push(file);
    }

    out.push_str(&format!("\n{}\n", "Files to create:".bright_white().bold()));
    for (dir, entries) in &by_dir {
        if !dir.is_empty() {
            out.push_str(&format!("{}/\n", dir.bright_black()));
        }
        for file in entries {
            let name = file.path.rsplit('/').next().unwrap_or(&file.path);
            let indent = if dir.is_empty() { "" } else { "  " };
            out.push_str(&format!(
                "{indent}{} - {}\n",
                name.bright_white(),
                file.description
            ));
        }
    }

    if !plan.setup_commands.is_empty() {
        out.push_str(&format!("\n{}\n", "Setup commands:".bright_white().bold()));
        for command in &plan.setup_commands {
            out.push_str(&format!("  {} {}\n", "$".bright_black(), command.cyan()));
        }
    }

    out
}

/// Render the final run summary: counts, failures, and next steps.
fn format_summary(report: &DispatchReport, plan: &ProjectPlan) -> String {
    let mut out = String::new();
    let total = plan.files.len();

    out.push_str(&format!("\n{}\n", "SUMMARY".bright_cyan().bold()));
    out.push_str(&format!("{}\n", "=".repeat(60).bright_cyan()));
    out.push_str(&format!(
        "{} {}/{} files created\n",
        if report.success_count == total {
            "✓".green().to_string()
        } else {
            "!".yellow().to_string()
        },
        report.success_count,
        total
    ));

    let failures = report.failures();
    if !failures.is_empty() {
        out.push_str(&format!("\n{}\n", "Failed files:".yellow().bold()));
        for failure in failures {
            out.push_str(&format!(
                "  {} {}: {}\n",
                "•".red(),
                failure.path.bright_white(),
                failure.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    if !plan.setup_commands.is_empty() {
        out.push_str(&format!("\n{}\n", "Next steps:".bright_white().bold()));
        for command in &plan.setup_commands {
            out.push_str(&format!("  {} {}\n", "$".bright_black(), command.cyan()));
        }
    }

    out
}
