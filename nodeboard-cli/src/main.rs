//! # Nodeboard CLI
//!
//! Replays a graph script headlessly and prints the resulting state as JSON.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use nodeboard_cli::{run_script, CliArgs, Script};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nodeboard_core=debug"));

    // stdout carries the report
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Use JSON format when RUST_LOG_FORMAT=json
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn read_script(path: &Path) -> anyhow::Result<Script> {
    let source = if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read script from stdin")?;
        source
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?
    };
    serde_json::from_str(&source).with_context(|| format!("Invalid script {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let mut script = read_script(&args.script)?;
    args.apply_overrides(&mut script);

    tracing::info!(
        steps = script.steps.len(),
        container = %args.container,
        "Replaying {}",
        args.script.display()
    );

    let report = run_script(&script, &args.container)?;
    let output = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");
    Ok(())
}
