//! Sauce CLI - render and inspect templates
//!
//! Commands: render, parse, check, modifiers
//! Outputs JSON to stdout, logs to stderr (RUST_LOG)
//! Returns 2 on parse/render failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sauce::{Context, Engine, EngineConfig};

#[derive(Parser)]
#[command(name = "sauce-cli")]
#[command(about = "Sauce CLI - placeholder and modifier-chain templates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an engine config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against a context
    Render {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// Inline JSON object
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,

        /// JSON object file
        #[arg(long)]
        context_file: Option<PathBuf>,
    },

    /// Dump the parsed node sequence
    Parse {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,
    },

    /// Check a template against the registered modifiers
    Check {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,
    },

    /// List registered modifiers
    Modifiers,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load_from_file(path) {
            Ok(c) => c,
            Err(e) => return fail(format!("Failed to load config: {}", e), ExitCode::FAILURE),
        },
        None => EngineConfig::default(),
    };

    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => return fail(e.to_string(), ExitCode::FAILURE),
    };

    match cli.command {
        Commands::Render { template, context, context_file } => {
            let source = match read(&template) {
                Ok(s) => s,
                Err(code) => return code,
            };

            let raw = match (context, context_file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => match read(&path) {
                    Ok(s) => s,
                    Err(code) => return code,
                },
                (None, None) => "{}".to_string(),
            };
            let ctx: Context = match serde_json::from_str(&raw) {
                Ok(c) => c,
                Err(e) => return fail(format!("Invalid context: {}", e), ExitCode::FAILURE),
            };

            match engine.render_str(&source, &ctx) {
                Ok(output) => emit(&serde_json::json!({ "success": true, "output": output })),
                Err(e) => fail(e.to_string(), ExitCode::from(2)),
            }
        }

        Commands::Parse { template } => {
            let source = match read(&template) {
                Ok(s) => s,
                Err(code) => return code,
            };
            match engine.compile(&source) {
                Ok(t) => emit(&serde_json::json!({ "success": true, "nodes": t.nodes() })),
                Err(e) => fail(e.to_string(), ExitCode::from(2)),
            }
        }

        Commands::Check { template } => {
            let source = match read(&template) {
                Ok(s) => s,
                Err(code) => return code,
            };
            match engine.compile(&source) {
                Ok(t) => {
                    let report = engine.check(&t);
                    let code = if report.valid { ExitCode::SUCCESS } else { ExitCode::from(2) };
                    emit(&report);
                    code
                }
                Err(e) => fail(e.to_string(), ExitCode::from(2)),
            }
        }

        Commands::Modifiers => emit(&engine.registry().names()),
    }
}

fn read(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path)
        .map_err(|e| fail(format!("Failed to read {}: {}", path.display(), e), ExitCode::FAILURE))
}

fn emit<T: serde::Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e.to_string(), ExitCode::FAILURE),
    }
}

fn fail(message: String, code: ExitCode) -> ExitCode {
    let output = serde_json::json!({ "success": false, "error": message });
    println!("{}", output);
    code
}
