use std::env;

use serde::{Deserialize, Serialize};

const DEFAULT_MIN_MATCH_SCORE: u8 = 75;
const DEFAULT_MIN_RESULTS: usize = 10;
const DEFAULT_MIN_EDGE: f64 = 0.05;
const DEFAULT_MAX_EDGE: f64 = 0.45;
const DEFAULT_KELLY_FRACTION: f64 = 0.20;
const DEFAULT_MAX_BANK_FRACTION: f64 = 0.02;
const DEFAULT_BANKROLL: f64 = 1000.0;
const DEFAULT_RECENT_MATCHES: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Similarity in [0, 100] below which a name is rejected instead of guessed.
    pub min_score: u8,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_MATCH_SCORE,
        }
    }
}

/// How much an older fixture counts relative to the newest one in the set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecencyWeighting {
    #[default]
    Uniform,
    /// Weight halves every `days` days of age.
    HalfLife { days: f64 },
    /// Weight falls linearly from 1.0 (newest) to `floor` (oldest).
    Linear { floor: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorSettings {
    pub min_results: usize,
    pub recency: RecencyWeighting,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            min_results: DEFAULT_MIN_RESULTS,
            recency: RecencyWeighting::Uniform,
        }
    }
}

/// Blend used by the win-rate path: season rate vs. recent form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinRateSettings {
    pub recent_matches: usize,
    pub season_weight: f64,
    pub recent_weight: f64,
}

impl Default for WinRateSettings {
    fn default() -> Self {
        Self {
            recent_matches: DEFAULT_RECENT_MATCHES,
            season_weight: 0.4,
            recent_weight: 0.6,
        }
    }
}

/// Edges below `min_edge` are noise; edges above `max_edge` are treated as a
/// mismatched or stale market rather than value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWindow {
    pub min_edge: f64,
    pub max_edge: f64,
}

impl Default for EdgeWindow {
    fn default() -> Self {
        Self {
            min_edge: DEFAULT_MIN_EDGE,
            max_edge: DEFAULT_MAX_EDGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeSettings {
    pub kelly_fraction: f64,
    pub max_bank_fraction: f64,
    pub bankroll: f64,
}

impl Default for StakeSettings {
    fn default() -> Self {
        Self {
            kelly_fraction: DEFAULT_KELLY_FRACTION,
            max_bank_fraction: DEFAULT_MAX_BANK_FRACTION,
            bankroll: DEFAULT_BANKROLL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Only in-window, positive-edge opportunities.
    #[default]
    Value,
    /// Also report the best candidate of events with no value, flagged as diagnostic.
    BestAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub reconcile: ReconcileSettings,
    pub estimator: EstimatorSettings,
    pub win_rate: WinRateSettings,
    pub edge_window: EdgeWindow,
    pub stake: StakeSettings,
    pub mode: ScanMode,
    /// Keep only events kicking off within this many hours of "now".
    pub lookahead_hours: Option<i64>,
}

impl Settings {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        out.reconcile.min_score = env_parse::<u8>("SCOUT_MIN_MATCH_SCORE")
            .unwrap_or(DEFAULT_MIN_MATCH_SCORE)
            .clamp(1, 100);

        out.estimator.min_results = env_parse::<usize>("SCOUT_MIN_RESULTS")
            .unwrap_or(DEFAULT_MIN_RESULTS)
            .max(1);
        if let Some(days) = env_parse::<f64>("SCOUT_HALF_LIFE_DAYS")
            && days > 0.0
        {
            out.estimator.recency = RecencyWeighting::HalfLife {
                days: days.clamp(7.0, 3650.0),
            };
        }

        out.win_rate.recent_matches = env_parse::<usize>("SCOUT_RECENT_MATCHES")
            .unwrap_or(DEFAULT_RECENT_MATCHES)
            .clamp(1, 100);

        out.edge_window.min_edge = env_parse::<f64>("SCOUT_MIN_EDGE")
            .unwrap_or(DEFAULT_MIN_EDGE)
            .clamp(0.0, 1.0);
        out.edge_window.max_edge = env_parse::<f64>("SCOUT_MAX_EDGE")
            .unwrap_or(DEFAULT_MAX_EDGE)
            .clamp(out.edge_window.min_edge, 5.0);

        out.stake.kelly_fraction = env_parse::<f64>("SCOUT_KELLY_FRACTION")
            .unwrap_or(DEFAULT_KELLY_FRACTION)
            .clamp(0.0, 1.0);
        out.stake.max_bank_fraction = env_parse::<f64>("SCOUT_MAX_BANK_FRACTION")
            .unwrap_or(DEFAULT_MAX_BANK_FRACTION)
            .clamp(0.0, 1.0);
        out.stake.bankroll = env_parse::<f64>("SCOUT_BANKROLL")
            .unwrap_or(DEFAULT_BANKROLL)
            .max(0.0);

        out.mode = match env::var("SCOUT_MODE")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "best" | "best_available" | "diagnostic" => ScanMode::BestAvailable,
            _ => ScanMode::Value,
        };

        out.lookahead_hours = env_parse::<i64>("SCOUT_LOOKAHEAD_HOURS")
            .filter(|h| *h > 0)
            .map(|h| h.min(24 * 30));

        out
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
