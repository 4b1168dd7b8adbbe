use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::catalogue::CompetitionConfig;
use crate::history::{HistoricalResult, parse_results_csv};
use crate::odds::{MarketEvent, parse_odds_json};
use crate::pipeline::CompetitionFeed;

pub fn results_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.csv"))
}

pub fn odds_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.odds.json"))
}

pub fn read_results(path: &Path) -> Result<Vec<HistoricalResult>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_results_csv(&raw).with_context(|| format!("parse {}", path.display()))
}

pub fn read_events(path: &Path) -> Result<Vec<MarketEvent>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_odds_json(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Load `<key>.csv` and `<key>.odds.json` from `dir`. A missing or broken
/// file leaves that half of the feed empty; the scan then reports the
/// competition as skipped or eventless instead of aborting.
pub fn load_feed(dir: &Path, config: CompetitionConfig) -> CompetitionFeed {
    let results = read_results(&results_path(dir, &config.key)).unwrap_or_else(|err| {
        warn!(competition = %config.key, error = %format!("{err:#}"), "no results feed");
        Vec::new()
    });
    let events = read_events(&odds_path(dir, &config.key)).unwrap_or_else(|err| {
        warn!(competition = %config.key, error = %format!("{err:#}"), "no odds feed");
        Vec::new()
    });
    CompetitionFeed {
        config,
        results,
        events,
    }
}
