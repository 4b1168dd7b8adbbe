use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ScanError;
use crate::history::HistoricalResult;
use crate::settings::{EstimatorSettings, RecencyWeighting};

/// Coefficients never drop below this, so every expected rate stays positive.
pub const MIN_COEFFICIENT: f64 = 0.05;
const MIN_WEIGHT: f64 = 0.05;

/// Scoring and conceding rates relative to the league average (1.0 = average).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamRating {
    pub attack_home: f64,
    pub defence_home: f64,
    pub attack_away: f64,
    pub defence_away: f64,
}

impl TeamRating {
    pub const NEUTRAL: TeamRating = TeamRating {
        attack_home: 1.0,
        defence_home: 1.0,
        attack_away: 1.0,
        defence_away: 1.0,
    };
}

impl Default for TeamRating {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// League-wide mean scoring rates, used to turn coefficients back into goals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeagueBaseline {
    pub home_rate: f64,
    pub away_rate: f64,
    pub sample_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingTable {
    ratings: BTreeMap<String, TeamRating>,
    baseline: LeagueBaseline,
}

impl RatingTable {
    pub fn baseline(&self) -> LeagueBaseline {
        self.baseline
    }

    /// Rating of `name`, neutral when the entity was never seen.
    pub fn get(&self, name: &str) -> TeamRating {
        self.ratings.get(name).copied().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ratings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ratings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SideTotals {
    weight: f64,
    scored: f64,
    conceded: f64,
}

impl SideTotals {
    fn add(&mut self, w: f64, scored: u32, conceded: u32) {
        self.weight += w;
        self.scored += w * scored as f64;
        self.conceded += w * conceded as f64;
    }
}

/// Derive per-entity attack/defence coefficients and the league baseline
/// from one competition's finished fixtures.
///
/// Fails with [`ScanError::InsufficientData`] below `min_results` and with
/// [`ScanError::DegenerateBaseline`] when either league mean is zero.
pub fn estimate(
    results: &[HistoricalResult],
    settings: &EstimatorSettings,
) -> Result<RatingTable, ScanError> {
    let required = settings.min_results.max(1);
    if results.len() < required {
        return Err(ScanError::InsufficientData {
            results: results.len(),
            required,
        });
    }

    let weights = recency_weights(results, settings.recency);

    let mut sw = 0.0;
    let mut home_goals = 0.0;
    let mut away_goals = 0.0;
    let mut home_side: BTreeMap<&str, SideTotals> = BTreeMap::new();
    let mut away_side: BTreeMap<&str, SideTotals> = BTreeMap::new();

    for (r, w) in results.iter().zip(&weights) {
        sw += w;
        home_goals += w * r.home_score as f64;
        away_goals += w * r.away_score as f64;
        home_side
            .entry(r.home.as_str())
            .or_default()
            .add(*w, r.home_score, r.away_score);
        away_side
            .entry(r.away.as_str())
            .or_default()
            .add(*w, r.away_score, r.home_score);
    }

    let home_mean = if sw > 0.0 { home_goals / sw } else { 0.0 };
    let away_mean = if sw > 0.0 { away_goals / sw } else { 0.0 };
    if !(home_mean > 0.0 && away_mean > 0.0) {
        return Err(ScanError::DegenerateBaseline {
            home_mean,
            away_mean,
        });
    }

    let mut ratings = BTreeMap::new();
    for name in home_side.keys().chain(away_side.keys()) {
        if ratings.contains_key(*name) {
            continue;
        }
        let mut rating = TeamRating::NEUTRAL;
        if let Some(h) = home_side.get(name).filter(|t| t.weight > 0.0) {
            rating.attack_home = coefficient(h.scored, h.weight, home_mean);
            rating.defence_home = coefficient(h.conceded, h.weight, away_mean);
        }
        if let Some(a) = away_side.get(name).filter(|t| t.weight > 0.0) {
            rating.attack_away = coefficient(a.scored, a.weight, away_mean);
            rating.defence_away = coefficient(a.conceded, a.weight, home_mean);
        }
        ratings.insert((*name).to_string(), rating);
    }

    Ok(RatingTable {
        ratings,
        baseline: LeagueBaseline {
            home_rate: home_mean,
            away_rate: away_mean,
            sample_matches: results.len(),
        },
    })
}

fn coefficient(weighted_goals: f64, weight: f64, league_mean: f64) -> f64 {
    (weighted_goals / weight / league_mean).max(MIN_COEFFICIENT)
}

/// Per-result weights in (0, 1], non-increasing with age.
///
/// Age is measured in days from the newest dated fixture when every result
/// carries a date; otherwise results are taken to be in chronological order
/// and age counts fixtures from the end of the slice.
pub fn recency_weights(results: &[HistoricalResult], policy: RecencyWeighting) -> Vec<f64> {
    if results.is_empty() {
        return Vec::new();
    }
    if matches!(policy, RecencyWeighting::Uniform) {
        return vec![1.0; results.len()];
    }

    let ages: Vec<f64> = if results.iter().all(|r| r.date.is_some()) {
        let newest = results.iter().filter_map(|r| r.date).max();
        results
            .iter()
            .map(|r| match (newest, r.date) {
                (Some(n), Some(d)) => (n - d).num_days().max(0) as f64,
                _ => 0.0,
            })
            .collect()
    } else {
        let last = results.len() - 1;
        (0..results.len()).map(|idx| (last - idx) as f64).collect()
    };

    match policy {
        RecencyWeighting::Uniform => vec![1.0; results.len()],
        RecencyWeighting::HalfLife { days } => {
            let half_life = days.max(1.0);
            ages.iter()
                .map(|age| {
                    (-(std::f64::consts::LN_2 * age / half_life))
                        .exp()
                        .clamp(MIN_WEIGHT, 1.0)
                })
                .collect()
        }
        RecencyWeighting::Linear { floor } => {
            let floor = floor.clamp(MIN_WEIGHT, 1.0);
            let oldest = ages.iter().copied().fold(0.0_f64, f64::max);
            ages.iter()
                .map(|age| {
                    if oldest <= 0.0 {
                        1.0
                    } else {
                        1.0 - (1.0 - floor) * (age / oldest)
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn league() -> Vec<HistoricalResult> {
        let rows = [
            ("A", "B", 2, 0),
            ("B", "C", 1, 1),
            ("C", "A", 0, 3),
            ("A", "C", 4, 1),
            ("B", "A", 0, 1),
            ("C", "B", 2, 2),
            ("A", "B", 1, 0),
            ("B", "C", 0, 1),
            ("C", "A", 1, 2),
            ("A", "C", 2, 0),
        ];
        rows.iter()
            .map(|(h, a, hs, as_)| HistoricalResult::new(h, a, *hs, *as_))
            .collect()
    }

    #[test]
    fn baseline_is_mean_of_home_and_away_goals() {
        let table = estimate(&league(), &EstimatorSettings::default()).expect("enough data");
        let b = table.baseline();
        assert!((b.home_rate - 1.3).abs() < 1e-12);
        assert!((b.away_rate - 1.1).abs() < 1e-12);
        assert_eq!(b.sample_matches, 10);
    }

    #[test]
    fn strong_team_gets_above_average_attack() {
        let table = estimate(&league(), &EstimatorSettings::default()).expect("enough data");
        let a = table.get("A");
        // A at home: 2,4,1,2 scored over 4 games = 2.25 / 1.3
        assert!((a.attack_home - 2.25 / 1.3).abs() < 1e-12);
        assert!(a.attack_home > 1.0);
        assert!(a.defence_home < 1.0);
        let b = table.get("B");
        assert!(b.attack_home < 1.0);
    }

    #[test]
    fn unseen_entity_is_neutral() {
        let table = estimate(&league(), &EstimatorSettings::default()).expect("enough data");
        assert_eq!(table.get("Nobody"), TeamRating::NEUTRAL);
        assert!(!table.contains("Nobody"));
    }

    #[test]
    fn too_few_results_is_insufficient_data() {
        let rows = &league()[..9];
        let err = estimate(rows, &EstimatorSettings::default()).unwrap_err();
        assert_eq!(
            err,
            ScanError::InsufficientData {
                results: 9,
                required: 10
            }
        );
    }

    #[test]
    fn goalless_league_is_degenerate_not_a_division_fault() {
        let rows: Vec<_> = (0..12)
            .map(|i| HistoricalResult::new(&format!("T{}", i % 4), &format!("T{}", (i + 1) % 4), 0, 0))
            .collect();
        let err = estimate(&rows, &EstimatorSettings::default()).unwrap_err();
        assert!(err.is_insufficient_data());
        assert!(matches!(err, ScanError::DegenerateBaseline { .. }));
    }

    #[test]
    fn coefficients_stay_strictly_positive() {
        let mut rows = league();
        rows.push(HistoricalResult::new("D", "A", 0, 5));
        let table = estimate(&rows, &EstimatorSettings::default()).expect("enough data");
        let d = table.get("D");
        assert!(d.attack_home >= MIN_COEFFICIENT);
        // D never played away.
        assert_eq!(d.attack_away, 1.0);
        assert_eq!(d.defence_away, 1.0);
    }

    #[test]
    fn half_life_weights_are_monotone_in_recency() {
        let start = NaiveDate::from_ymd_opt(2024, 8, 1).expect("valid date");
        let rows: Vec<_> = (0..20)
            .map(|i| HistoricalResult::new("A", "B", 1, 0).on(start + chrono::Duration::days(i * 7)))
            .collect();
        let w = recency_weights(&rows, RecencyWeighting::HalfLife { days: 30.0 });
        assert_eq!(w.len(), 20);
        assert!((w[19] - 1.0).abs() < 1e-12);
        assert!(w.windows(2).all(|p| p[0] <= p[1]));
    }

    #[test]
    fn positional_weights_when_dates_missing() {
        let w = recency_weights(&league(), RecencyWeighting::Linear { floor: 0.5 });
        assert!((w[0] - 0.5).abs() < 1e-12);
        assert!((w[9] - 1.0).abs() < 1e-12);
        assert!(w.windows(2).all(|p| p[0] <= p[1]));
    }

    #[test]
    fn recency_weighting_shifts_ratings_toward_recent_form() {
        let mut rows = Vec::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        for i in 0..10 {
            // A scored freely early on, then dried up.
            let goals = if i < 5 { 4 } else { 0 };
            rows.push(HistoricalResult::new("A", "B", goals, 1).on(start + chrono::Duration::days(i * 30)));
            rows.push(HistoricalResult::new("B", "A", 1, 1).on(start + chrono::Duration::days(i * 30 + 1)));
        }
        let flat = estimate(&rows, &EstimatorSettings::default()).expect("enough data");
        let recent = estimate(
            &rows,
            &EstimatorSettings {
                min_results: 10,
                recency: RecencyWeighting::HalfLife { days: 30.0 },
            },
        )
        .expect("enough data");
        let flat_goals = flat.get("A").attack_home * flat.baseline().home_rate;
        let recent_goals = recent.get("A").attack_home * recent.baseline().home_rate;
        assert!(recent_goals < flat_goals);
    }
}
