//! Main entry point for the application.
//!
//! This module initializes logging, loads environment variables and the
//! outline configuration, and drives the generation pipeline with the
//! built-in template agents, writing the finished book to the configured
//! output file.

use clap::Parser;
use colored::*;
use scrollforge::agents::AgentRegistry;
use scrollforge::cli::Cli;
use scrollforge::config::{self, GenerationConfig};
use scrollforge::core::{CompositeDocument, PipelineSettings, StageOrchestrator};
use scrollforge::utils;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    utils::init_logging(&cli.logging_level, true);

    if let Err(e) = dotenvy::dotenv() {
        warn!("Failed to load .env file: {}", e);
    }

    let config = match config::load_generation_config(&cli.outline) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    let settings = match PipelineSettings::from_parameters(&config.parameters) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    println!(
        "{}",
        format!(
            "📚 Generating '{}' ({} chapters)",
            config.outline.title,
            config.outline.chapters.len()
        )
        .bold()
        .cyan()
    );

    let registry = Arc::new(AgentRegistry::builtin());
    let orchestrator = StageOrchestrator::new(registry, settings).with_progress();

    match orchestrator
        .start_pipeline(&config.outline.title, &config.outline)
        .await
    {
        Ok(document) => {
            if let Err(e) = write_document(&config, &document) {
                error!("Failed to write the generated book: {}", e);
                eprintln!("{} {}", "✗".red(), e);
                std::process::exit(1);
            }
            println!(
                "{}",
                format!("✅ Book written to {}", config.output.file).green()
            );
        }
        Err(e) => {
            eprintln!(
                "{}",
                format!("The generation failed permanently: {}", e).red()
            );
            std::process::exit(1);
        }
    }
}

/// Writes the finished book in the configured output format
fn write_document(
    config: &GenerationConfig,
    document: &CompositeDocument,
) -> Result<(), scrollforge::errors::Error> {
    let rendered = match config.output.format.as_str() {
        "markdown" => render_markdown(document),
        _ => serde_json::to_string_pretty(document)?,
    };
    if let Some(parent) = Path::new(&config.output.file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&config.output.file, rendered)?;
    Ok(())
}

fn render_markdown(document: &CompositeDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", document.title));
    for chapter in &document.chapters {
        out.push_str(&chapter.content);
        out.push_str("\n\n");
        for summary in &chapter.summaries {
            out.push_str(&format!("> {}\n", summary));
        }
        if !chapter.exercises.is_empty() {
            out.push_str("\n## Exercises\n\n");
            for exercise in &chapter.exercises {
                out.push_str(&format!("- {}\n", exercise));
            }
        }
        if !chapter.references.is_empty() {
            out.push_str("\n## References\n\n");
            for reference in &chapter.references {
                out.push_str(&format!("- {}\n", reference));
            }
        }
        out.push('\n');
    }
    out
}
