mod http_backend;
mod manifest;

use anyhow::{Context, Result};
use clap::Parser;
use http_backend::HttpBackend;
use lamina_core::protocol::invoke;
use lamina_core::registry::EngineRegistry;
use manifest::TaskManifest;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the task manifest (YAML)
    #[arg(short, long)]
    task: PathBuf,

    /// Engine identifier to resolve (overrides the manifest's engine id)
    #[arg(short, long)]
    engine: Option<String>,

    /// Access credential, overrides the manifest's production.key
    #[arg(short, long)]
    key: Option<String>,

    /// Backend base URL, overrides the manifest's production.url
    #[arg(short, long)]
    url: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let raw = fs::read_to_string(&args.task)
        .with_context(|| format!("failed to read task manifest {}", args.task.display()))?;
    let task = TaskManifest::parse(&raw)?.compile()?;

    let registry = EngineRegistry::builder()
        .builtin(http_backend::URL_KEY, http_backend::DEFAULT_BASE_URL)
        .build();

    let mut config = task.engine_config.clone();
    if let Some(key) = &args.key {
        config.insert(http_backend::CREDENTIAL_KEY, key.clone());
    }
    if let Some(url) = &args.url {
        config.insert(http_backend::URL_KEY, url.clone());
    }

    let engine_id = args
        .engine
        .or_else(|| task.engine_id.clone())
        .unwrap_or_else(|| "default".to_string());

    let engine = registry.resolve_with(&engine_id, Some(&config))?;
    let backend = HttpBackend::from_engine(&engine)?;

    tracing::debug!(
        engine = %engine.id(),
        input_type = %task.input.schema().name(),
        output_type = %task.output.name(),
        "running invocation"
    );

    let result = invoke(&backend, &engine, &task.input, &task.output)?;
    println!("{}", serde_json::to_string_pretty(&result.to_json())?);

    Ok(())
}
