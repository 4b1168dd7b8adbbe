use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use value_scout::catalogue::{CompetitionConfig, builtin_catalogue, load_catalogue};
use value_scout::feed_files::load_feed;
use value_scout::logging;
use value_scout::odds::parse_timestamp;
use value_scout::pipeline::{CompetitionFeed, scan_all};
use value_scout::settings::Settings;
use value_scout::synthetic::synthetic_feed;

const DEFAULT_DEMO_SEED: u64 = 2024;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init("info");

    let settings = Settings::from_env();
    let catalogue = match parse_string_arg("--catalogue") {
        Some(path) => load_catalogue(&PathBuf::from(path))?,
        None => builtin_catalogue(),
    };
    let selected = select_competitions(catalogue, parse_list_arg("--only"));
    if selected.is_empty() {
        return Err(anyhow!("no competitions selected"));
    }

    let now = match parse_string_arg("--now") {
        Some(raw) => parse_timestamp(&raw).ok_or_else(|| anyhow!("invalid --now timestamp {raw:?}"))?,
        None => Utc::now(),
    };

    let feeds: Vec<CompetitionFeed> = if has_flag("--demo") {
        let seed = parse_string_arg("--seed")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_DEMO_SEED);
        selected
            .into_iter()
            .enumerate()
            .map(|(idx, cfg)| synthetic_feed(cfg, seed.wrapping_add(idx as u64), now))
            .collect()
    } else {
        let dir = parse_string_arg("--data-dir")
            .or_else(|| std::env::var("SCOUT_DATA_DIR").ok())
            .map(PathBuf::from)
            .context("pass --data-dir <dir> (or SCOUT_DATA_DIR), or --demo")?;
        selected.into_iter().map(|cfg| load_feed(&dir, cfg)).collect()
    };

    let report = scan_all(&feeds, &settings, now);
    let json = if has_flag("--report") {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string_pretty(&report.opportunities)
    }
    .context("serialize scan output")?;
    println!("{json}");
    Ok(())
}

fn select_competitions(catalogue: Vec<CompetitionConfig>, only: Option<Vec<String>>) -> Vec<CompetitionConfig> {
    match only {
        Some(keys) => catalogue
            .into_iter()
            .filter(|cfg| keys.iter().any(|k| k == &cfg.key))
            .collect(),
        None => catalogue,
    }
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_list_arg(name: &str) -> Option<Vec<String>> {
    let raw = parse_string_arg(name)?;
    let keys: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if keys.is_empty() { None } else { Some(keys) }
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
