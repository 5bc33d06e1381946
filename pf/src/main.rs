//! Planframe - plan text to positioned scene graphs
//!
//! CLI entry point for classifying plans, repairing model output and running
//! the generation pipeline.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tokio::sync::mpsc;
use tracing::info;

use keystore::FileCredentialStore;
use planframe::cli::{Cli, Command, OutputFormat, is_stdin};
use planframe::config::Config;
use planframe::design::{Shape, classify, repair, repair_nodes};
use planframe::surface::MemorySurface;
use planframe::ui::{GenerationStatus, Session, UiEvent, bridge};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planframe")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to log file; stdout carries command output and the bridge protocol
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("planframe.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Planframe loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Command::Classify { file, format } => cmd_classify(&file, format),
        Command::Repair { file, object, nodes } => cmd_repair(&config, &file, object, nodes),
        Command::Auth { key } => cmd_auth(&config, &key),
        Command::Generate { file, format, fonts } => cmd_generate(config, &file, format, fonts).await,
        Command::Bridge => cmd_bridge(config).await,
    }
}

/// Read a file argument, treating `-` as stdin
fn read_input(path: &Path) -> Result<String> {
    if is_stdin(path) {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path).context(format!("Failed to read {}", path.display()))
    }
}

fn open_store(config: &Config) -> Result<FileCredentialStore> {
    let store = match config.storage.credentials_path() {
        Some(path) => FileCredentialStore::open(&path),
        None => FileCredentialStore::open_default(),
    };
    store.context("Failed to open credential store")
}

/// Print plan sections
fn cmd_classify(file: &Path, format: OutputFormat) -> Result<()> {
    let plan = read_input(file)?;
    let sections = classify(&plan);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sections)?),
        OutputFormat::Text | OutputFormat::Tree => {
            for section in &sections {
                println!("{}", section.name.to_string().cyan().bold());
                for line in section.content.lines() {
                    println!("  {}", line);
                }
            }
        }
    }
    Ok(())
}

/// Print repaired JSON, or the node list with `--nodes`
fn cmd_repair(config: &Config, file: &Path, object: bool, nodes: bool) -> Result<()> {
    let raw = read_input(file)?;

    if nodes {
        let decoded = repair_nodes(&raw, config.layout.max_depth).map_err(|e| eyre!("{}", e))?;
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    let shape = if object { Shape::Object } else { Shape::Array };
    let value = repair(&raw, shape).into_result().map_err(|e| eyre!("{}", e))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Validate and store an API key
fn cmd_auth(config: &Config, key: &str) -> Result<()> {
    let store = open_store(config)?;
    let path = store.path().to_path_buf();

    let mut session = Session::new(config.clone(), Box::new(store));
    match session.verify_api_key(key) {
        UiEvent::VerifySuccess => {
            println!("{} API key stored in {}", "✓".green(), path.display());
            Ok(())
        }
        _ => Err(eyre!("API key rejected: expected a key starting with sk- or Bearer")),
    }
}

/// Run the pipeline against an in-memory surface and print the page
async fn cmd_generate(config: Config, file: &Path, format: OutputFormat, fonts: Option<Vec<String>>) -> Result<()> {
    let plan = read_input(file)?;
    let store = open_store(&config)?;

    let mut surface = match fonts {
        Some(families) => MemorySurface::new().with_fonts(families),
        None => MemorySurface::new(),
    };
    let session = Session::new(config, Box::new(store));

    let (tx, mut rx) = mpsc::channel(16);
    let work = async move {
        let outcome = session.start_generation(&plan, &mut surface, &tx).await;
        drop(tx);
        outcome.map(|o| (o, surface))
    };
    let progress = async {
        while let Some(event) = rx.recv().await {
            print_status(&event);
        }
    };
    let (result, ()) = tokio::join!(work, progress);

    let (outcome, surface) = result.ok_or_else(|| eyre!("Generation failed"))?;

    for section in &outcome.sections {
        if section.is_fallback() {
            eprintln!("{} {} used fallback components", "!".yellow(), section.name);
        }
    }

    match format {
        OutputFormat::Json => {
            let tree = surface.tree(outcome.root).ok_or_else(|| eyre!("Page node missing from surface"))?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        OutputFormat::Text | OutputFormat::Tree => print!("{}", surface.outline(outcome.root)),
    }
    Ok(())
}

fn print_status(event: &UiEvent) {
    if let UiEvent::GenerationStatus { message, status } = event {
        match status {
            GenerationStatus::Processing => eprintln!("{} {}", "…".dimmed(), message),
            GenerationStatus::Success => eprintln!("{} {}", "✓".green(), message),
            GenerationStatus::Error => eprintln!("{} {}", "✗".red(), message.red()),
        }
    }
}

/// Serve JSON-lines requests over stdio
async fn cmd_bridge(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let mut session = Session::new(config, Box::new(store));
    let mut surface = MemorySurface::new();

    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    bridge::serve(&mut session, &mut surface, reader, tokio::io::stdout())
        .await
        .context("Bridge I/O failed")
}
