//! # Nodeboard CLI
//!
//! Headless runner for Nodeboard graphs. Replays a JSON script of graph
//! operations against a recording renderer and prints the resulting state.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p nodeboard-cli -- nodeboard-cli/scripts/demo.json --pretty
//! ```
//!
//! ## Script format
//!
//! ```json
//! {
//!   "options": { "width": 1024, "snapline": { "tolerance": 8 } },
//!   "steps": [
//!     { "op": "register", "name": "box", "width": 120, "height": 80 },
//!     { "op": "add", "component": "box", "x": 10, "y": 20 },
//!     { "op": "interact", "id": "node-1", "event": { "type": "dragStop", "data": { "x": 40, "y": 50 } } }
//!   ]
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod script;

pub use script::{run_script, Report, Script, Step, RECORDED_EVENTS};

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the `nodeboard` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "nodeboard")]
#[command(about = "Replay a Nodeboard script headlessly and print the resulting graph state")]
#[command(version)]
pub struct CliArgs {
    /// Script to replay (`-` reads stdin)
    pub script: PathBuf,

    /// Mount target handed to the graph
    #[arg(long, env = "NODEBOARD_CONTAINER", default_value = "#nodeboard")]
    pub container: String,

    /// Canvas width in pixels, overriding the script
    #[arg(long)]
    pub width: Option<f64>,

    /// Canvas height in pixels, overriding the script
    #[arg(long)]
    pub height: Option<f64>,

    /// Pretty-print the report
    #[arg(long)]
    pub pretty: bool,
}

impl CliArgs {
    /// Apply command-line overrides to a parsed script.
    pub fn apply_overrides(&self, script: &mut Script) {
        if let Some(width) = self.width {
            script.options.width = Some(width);
        }
        if let Some(height) = self.height {
            script.options.height = Some(height);
        }
    }
}
