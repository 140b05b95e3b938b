#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod ai;
mod config;
mod create;
mod error;
mod files;
mod new;
mod prelude;
mod refactor;
mod review;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Turn natural-language tasks into reviewed code changes with a local model"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Base URL of the Ollama API
    #[clap(
        long,
        env = "CODELOOM_API_URL",
        global = true,
        default_value = "http://localhost:11434"
    )]
    api_url: String,

    /// Model to use for generation
    #[clap(
        long,
        env = "CODELOOM_MODEL",
        global = true,
        default_value = "codellama:13b-instruct"
    )]
    model: String,

    /// Whether to display additional information.
    #[clap(long, env = "CODELOOM_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Generate a new code file from a task description
    New(crate::new::Options),

    /// Create a whole project from a natural-language description
    Create(crate::create::Options),

    /// Refactor an existing file according to a task
    Refactor(crate::refactor::Options),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::New(options) => crate::new::run(options, app.global).await,
        SubCommands::Create(options) => crate::create::run(options, app.global).await,
        SubCommands::Refactor(options) => crate::refactor::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
