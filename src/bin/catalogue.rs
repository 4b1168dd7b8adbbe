use std::path::PathBuf;

use anyhow::{Context, Result};

use value_scout::catalogue::{builtin_catalogue, save_catalogue};
use value_scout::logging;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init("warn");

    let catalogue = builtin_catalogue();
    match parse_out_arg() {
        Some(path) => {
            save_catalogue(&path, &catalogue)?;
            tracing::info!(path = %path.display(), competitions = catalogue.len(), "catalogue written");
        }
        None => {
            let json = serde_json::to_string_pretty(&catalogue).context("serialize catalogue")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn parse_out_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--out=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}
