//! tgfmt CLI — format Markdown into Telegram-HTML message chunks.
//!
//! Usage:
//!   tgfmt notes.md                — format a file, print chunks
//!   echo '**hi**' | tgfmt        — format stdin
//!   tgfmt notes.md --json        — print a JSON array of {"text": …}
//!   tgfmt notes.md -m 2000       — custom per-chunk length limit

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "tgfmt",
    version,
    about = "Format Markdown into Telegram-HTML message chunks"
)]
struct Cli {
    /// Input file (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Maximum visible-text length per chunk (0 = no splitting)
    #[arg(short, long, default_value_t = 4096)]
    max_length: usize,

    /// Emit a JSON array of {"text": ...} objects instead of plain chunks
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let input = match &cli.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let chunks = tgfmt_core::format_message(&input, cli.max_length);
    debug!(chunks = chunks.len(), max_length = cli.max_length, "formatted input");

    if cli.json {
        let payload: Vec<_> = chunks.iter().map(|text| json!({ "text": text })).collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                println!("---8<---");
            }
            print!("{chunk}");
            if !chunk.ends_with('\n') {
                println!();
            }
        }
    }

    Ok(())
}
