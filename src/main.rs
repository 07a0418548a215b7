//! pdfqa CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use pdfqa::{
    commands::{
        cmd_ask, cmd_chat, cmd_info, cmd_init, cmd_models, print_answer, print_document_info,
        print_init_summary, print_models, InitOptions,
    },
    config::Config,
    engine::QaEngine,
    error::Result,
    llm::{ModelRouter, OllamaRuntime},
    progress::{embedding_progress, LogWriterFactory},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(
    version,
    about = "Ask questions about a PDF using a local language model",
    long_about = None
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "PDFQA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// List supported models and whether the runtime has them
    Models,

    /// Ask a single question about a PDF
    Ask {
        /// PDF file to load
        pdf: PathBuf,

        /// The question
        question: String,

        /// Model to answer with (defaults to runtime.default_model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Chat interactively about a PDF
    Chat {
        /// PDF file to load
        pdf: PathBuf,

        /// Model to start with (switch later with /model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show what was extracted from a PDF
    Info {
        /// PDF file to load
        pdf: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Handle commands that don't need an existing config
    match &cli.command {
        Commands::Init { force } => return handle_init(cli.config.clone(), *force, cli.json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "pdfqa", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Models => {
            let runtime = OllamaRuntime::from_config(&config.runtime)?;
            let router = ModelRouter::new(Arc::new(runtime), config.runtime.timeout());
            let models = cmd_models(&router).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else {
                print_models(&models, &config.runtime.default_model);
            }
        }

        Commands::Ask {
            pdf,
            question,
            model,
        } => {
            let engine = build_engine(&config, &pdf, cli.json)?;
            let model = model.unwrap_or_else(|| config.runtime.default_model.clone());
            let result = cmd_ask(&engine, &pdf, &question, &model).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_answer(&result.answer);
            }
        }

        Commands::Chat { pdf, model } => {
            let engine = build_engine(&config, &pdf, false)?;
            let model = model.unwrap_or_else(|| config.runtime.default_model.clone());
            cmd_chat(&engine, &pdf, &model).await?;
        }

        Commands::Info { pdf } => {
            let engine = build_engine(&config, &pdf, cli.json)?;
            let info = cmd_info(&engine, &pdf).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_document_info(&info);
            }
        }
    }

    Ok(())
}

fn handle_init(config: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // If the user names a config path, its parent becomes the base directory
    let (base_dir, config_path) = if let Some(path) = config {
        let config_path = if path.extension().is_some_and(|e| e == "toml") {
            path
        } else {
            path.join("config.toml")
        };
        let base = config_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir);
        (base, config_path)
    } else {
        let base = Config::default_base_dir();
        (base.clone(), base.join("config.toml"))
    };

    let config = cmd_init(InitOptions {
        base_dir,
        config_path,
        force,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print_init_summary(&config);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}

fn build_engine(config: &Config, pdf: &Path, quiet: bool) -> Result<QaEngine> {
    let engine = QaEngine::from_config(config)?;
    if quiet {
        return Ok(engine);
    }
    let label = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf.display().to_string());
    Ok(engine.with_progress(embedding_progress(label)))
}
