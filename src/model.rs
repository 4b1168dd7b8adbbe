use serde::Serialize;

use crate::catalogue::{CompetitionConfig, RatingModelKind};
use crate::error::ScanError;
use crate::history::HistoricalResult;
use crate::odds::{GoalLine, OutcomeLabel};
use crate::predict::{OutcomeDistribution, PredictParams, predict};
use crate::ratings::{RatingTable, estimate};
use crate::settings::Settings;
use crate::win_rate::{WinRateTable, estimate_win_rates};

/// Model probabilities for every label the market can quote on one fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityTable {
    pub entries: Vec<(OutcomeLabel, f64)>,
    pub expected_home: Option<f64>,
    pub expected_away: Option<f64>,
    pub most_likely_score: Option<(u32, u32)>,
}

impl ProbabilityTable {
    pub fn get(&self, label: OutcomeLabel) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
    }

    fn from_distribution(d: &OutcomeDistribution) -> Self {
        let line = GoalLine::new(d.total_line);
        let mut entries = vec![
            (OutcomeLabel::Home, d.home_win),
            (OutcomeLabel::Draw, d.draw),
            (OutcomeLabel::Away, d.away_win),
        ];
        if d.total_line > 0.0 {
            entries.push((OutcomeLabel::Over(line), d.over));
            entries.push((OutcomeLabel::Under(line), d.under));
        }
        Self {
            entries,
            expected_home: Some(d.expected_home),
            expected_away: Some(d.expected_away),
            most_likely_score: Some(d.most_likely_score),
        }
    }
}

/// A competition's fitted model; the variant follows the competition's sport.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingModel {
    GoalBased(RatingTable),
    WinRateBased(WinRateTable),
}

impl RatingModel {
    pub fn fit(
        cfg: &CompetitionConfig,
        results: &[HistoricalResult],
        settings: &Settings,
    ) -> Result<Self, ScanError> {
        match cfg.model() {
            RatingModelKind::GoalBased => estimate(results, &settings.estimator).map(RatingModel::GoalBased),
            RatingModelKind::WinRateBased => {
                estimate_win_rates(results, &settings.win_rate, settings.estimator.min_results)
                    .map(RatingModel::WinRateBased)
            }
        }
    }

    pub fn kind(&self) -> RatingModelKind {
        match self {
            RatingModel::GoalBased(_) => RatingModelKind::GoalBased,
            RatingModel::WinRateBased(_) => RatingModelKind::WinRateBased,
        }
    }

    /// Names the reconciler matches market names against.
    pub fn entity_names(&self) -> Vec<String> {
        match self {
            RatingModel::GoalBased(t) => t.names().map(str::to_string).collect(),
            RatingModel::WinRateBased(t) => t.names().map(str::to_string).collect(),
        }
    }

    pub fn probabilities(&self, home: &str, away: &str, cfg: &CompetitionConfig) -> ProbabilityTable {
        match self {
            RatingModel::GoalBased(table) => {
                let d = predict(
                    &table.get(home),
                    &table.get(away),
                    &table.baseline(),
                    &PredictParams::for_competition(cfg),
                );
                ProbabilityTable::from_distribution(&d)
            }
            RatingModel::WinRateBased(table) => {
                let (p_home, p_away) = table.head_to_head(home, away);
                ProbabilityTable {
                    entries: vec![(OutcomeLabel::Home, p_home), (OutcomeLabel::Away, p_away)],
                    expected_home: None,
                    expected_away: None,
                    most_likely_score: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{HomeAdvantage, SportKind};

    fn rows() -> Vec<HistoricalResult> {
        let teams = ["Alpha", "Bravo", "Charlie", "Delta"];
        let mut out = Vec::new();
        for (i, h) in teams.iter().enumerate() {
            for (j, a) in teams.iter().enumerate() {
                if i != j {
                    let hs = if i == 0 { 3 } else { 1 };
                    out.push(HistoricalResult::new(h, a, hs, (j % 2) as u32));
                }
            }
        }
        out
    }

    #[test]
    fn goal_based_model_exposes_three_way_and_totals() {
        let cfg = CompetitionConfig::new("x", "X", SportKind::Football)
            .with_home_advantage(HomeAdvantage::Additive(0.2));
        let model = RatingModel::fit(&cfg, &rows(), &Settings::default()).expect("fits");
        assert_eq!(model.kind(), RatingModelKind::GoalBased);
        let table = model.probabilities("Alpha", "Delta", &cfg);
        let home = table.get(OutcomeLabel::Home).expect("home");
        let draw = table.get(OutcomeLabel::Draw).expect("draw");
        let away = table.get(OutcomeLabel::Away).expect("away");
        assert!((home + draw + away - 1.0).abs() < 1e-9);
        assert!(home > away);
        assert!(table.get(OutcomeLabel::Over(GoalLine::new(2.5))).is_some());
        assert!(table.get(OutcomeLabel::Over(GoalLine::new(3.5))).is_none());
        assert!(table.expected_home.is_some());
    }

    #[test]
    fn tennis_uses_head_to_head_ratings() {
        let cfg = CompetitionConfig::new("atp", "ATP", SportKind::Tennis);
        let model = RatingModel::fit(&cfg, &rows(), &Settings::default()).expect("fits");
        assert_eq!(model.kind(), RatingModelKind::WinRateBased);
        let table = model.probabilities("Alpha", "Delta", &cfg);
        assert_eq!(table.entries.len(), 2);
        assert!(table.get(OutcomeLabel::Draw).is_none());
        let p = table.get(OutcomeLabel::Home).expect("home") + table.get(OutcomeLabel::Away).expect("away");
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entity_names_cover_both_sides() {
        let cfg = CompetitionConfig::new("x", "X", SportKind::Football);
        let model = RatingModel::fit(&cfg, &rows(), &Settings::default()).expect("fits");
        assert_eq!(model.entity_names(), vec!["Alpha", "Bravo", "Charlie", "Delta"]);
    }
}
