use anyhow::{bail, Context, Result};
use clap::Subcommand;

use entropia_common::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration (defaults merged with the config file)
    Show,
    /// Create a default configuration file at ~/.entropia/config.toml
    Init,
}

pub fn run(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show(),
        ConfigAction::Init => init(),
    }
}

fn show() -> Result<()> {
    let path = Config::default_path();
    match &path {
        Some(path) if path.exists() => {
            eprintln!("Configuration file: {}\n", path.display());
        }
        _ => eprintln!("No configuration file found (using defaults)\n"),
    }

    let config = Config::load().context("load configuration")?;
    println!("{}", config.to_toml().context("render configuration")?);

    eprintln!("Configuration hierarchy (highest to lowest priority):");
    eprintln!("  1. CLI flags");
    eprintln!("  2. Environment variables (OPENAI_API_KEY, ANTHROPIC_API_KEY, proxies)");
    eprintln!("  3. Config file (~/.entropia/config.toml)");
    eprintln!("  4. Defaults");

    Ok(())
}

fn init() -> Result<()> {
    let Some(path) = Config::default_path() else {
        bail!("cannot determine home directory");
    };

    if path.exists() {
        bail!(
            "config file already exists: {}\nUse 'entropia config show' to view it, or delete it first to recreate",
            path.display()
        );
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create config directory {}", dir.display()))?;
    }

    let config = Config::default();
    let mut content = String::new();
    content.push_str("# Entropia configuration\n");
    content.push_str("# Precedence: CLI flags > environment > this file > defaults.\n");
    content.push_str("#\n");
    content.push_str("# API keys are read from the environment, never from this file:\n");
    content.push_str("#   OPENAI_API_KEY, ANTHROPIC_API_KEY, OLLAMA_BASE_URL\n\n");
    content.push_str(&config.to_toml().context("render configuration")?);

    std::fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;

    println!("✓ Created default configuration: {}", path.display());
    println!("\nTo view it:\n  entropia config show");

    Ok(())
}
