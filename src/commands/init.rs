//! Init command implementation

use crate::config::{Config, PathsConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

/// Write a default configuration file, refusing to overwrite unless forced
pub fn cmd_init(options: InitOptions) -> Result<Config> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths = PathsConfig {
        base_dir,
        config_file: config_path,
    };
    config.validate()?;
    config.save()?;
    info!("Created config at {:?}", config.paths.config_file);

    Ok(config)
}

/// Print next steps after a successful init
pub fn print_init_summary(config: &Config) {
    println!("✓ pdfqa initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Runtime: {}", config.runtime.url);
    println!("  Embeddings: {} ({})", config.embedding.backend, config.embedding.model);
    println!("\nNext steps:");
    println!("  1. Start the runtime: ollama serve");
    println!("  2. Pull a model: ollama pull {}", config.runtime.default_model);
    println!("  3. Ask away: pdfqa ask paper.pdf \"What is this about?\"");
}
