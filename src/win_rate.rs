use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ScanError;
use crate::history::HistoricalResult;
use crate::settings::WinRateSettings;

/// Rating given to a player with no recorded matches.
pub const UNSEEN_RATING: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerForm {
    pub matches: usize,
    pub wins: usize,
    /// Laplace-smoothed (wins + 1) / (matches + 2).
    pub season_rate: f64,
    /// Plain win share over the most recent matches.
    pub recent_rate: f64,
    pub rating: f64,
}

/// Blended season/recent win-rate ratings for one competition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinRateTable {
    players: BTreeMap<String, PlayerForm>,
}

impl WinRateTable {
    pub fn form(&self, name: &str) -> Option<&PlayerForm> {
        self.players.get(name)
    }

    pub fn rating(&self, name: &str) -> f64 {
        self.players
            .get(name)
            .map(|f| f.rating)
            .unwrap_or(UNSEEN_RATING)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.players.keys().map(String::as_str)
    }

    /// (P(first wins), P(second wins)).
    pub fn head_to_head(&self, first: &str, second: &str) -> (f64, f64) {
        head_to_head(self.rating(first), self.rating(second))
    }
}

/// P(first wins) = r1 / (r1 + r2); an even split when neither has a rating.
pub fn head_to_head(first: f64, second: f64) -> (f64, f64) {
    let r1 = first.max(0.0);
    let r2 = second.max(0.0);
    let sum = r1 + r2;
    if sum <= 0.0 || !sum.is_finite() {
        return (0.5, 0.5);
    }
    (r1 / sum, r2 / sum)
}

/// Rate every player from finished matches. A result counts as a win for the
/// side with the higher score; level scores count as played, not won.
pub fn estimate_win_rates(
    results: &[HistoricalResult],
    settings: &WinRateSettings,
    min_results: usize,
) -> Result<WinRateTable, ScanError> {
    let required = min_results.max(1);
    if results.len() < required {
        return Err(ScanError::InsufficientData {
            results: results.len(),
            required,
        });
    }

    // Newest first: dated rows by date, then later rows before earlier ones.
    let mut order: Vec<usize> = (0..results.len()).collect();
    order.sort_by_key(|&idx| Reverse((results[idx].date, idx)));

    let mut history: BTreeMap<&str, Vec<bool>> = BTreeMap::new();
    for idx in order {
        let r = &results[idx];
        history
            .entry(r.home.as_str())
            .or_default()
            .push(r.home_score > r.away_score);
        history
            .entry(r.away.as_str())
            .or_default()
            .push(r.away_score > r.home_score);
    }

    let recent_n = settings.recent_matches.max(1);
    let players = history
        .into_iter()
        .map(|(name, outcomes)| {
            let matches = outcomes.len();
            let wins = outcomes.iter().filter(|w| **w).count();
            let season_rate = (wins as f64 + 1.0) / (matches as f64 + 2.0);
            let recent = &outcomes[..matches.min(recent_n)];
            let recent_rate = recent.iter().filter(|w| **w).count() as f64 / recent.len() as f64;
            let rating = settings.season_weight * season_rate + settings.recent_weight * recent_rate;
            (
                name.to_string(),
                PlayerForm {
                    matches,
                    wins,
                    season_rate,
                    recent_rate,
                    rating,
                },
            )
        })
        .collect();

    Ok(WinRateTable { players })
}
