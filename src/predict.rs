use serde::Serialize;

use crate::catalogue::{CompetitionConfig, HomeAdvantage};
use crate::ratings::{LeagueBaseline, TeamRating};

/// Expected rates are floored here; a Poisson rate must be positive.
pub const MIN_RATE: f64 = 0.1;
/// Discarded grid mass must stay below this.
pub const MAX_TAIL_MASS: f64 = 0.001;
const MAX_GRID: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictParams {
    pub home_advantage: HomeAdvantage,
    /// Starting grid size K; scores 0..K per side.
    pub max_goals: usize,
    pub total_line: f64,
}

impl PredictParams {
    pub fn for_competition(cfg: &CompetitionConfig) -> Self {
        Self {
            home_advantage: cfg.home_advantage,
            max_goals: cfg.max_goals(),
            total_line: cfg.total_line(),
        }
    }
}

/// Outcome probabilities from the joint (home, away) score grid.
///
/// Win/draw/loss and over/under are renormalised over `captured_mass`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeDistribution {
    pub expected_home: f64,
    pub expected_away: f64,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub total_line: f64,
    pub over: f64,
    pub under: f64,
    pub most_likely_score: (u32, u32),
    pub grid_size: usize,
    pub captured_mass: f64,
    pub tail_mass: f64,
}

/// Expected scoring rates for a fixture, both clamped to at least [`MIN_RATE`].
pub fn expected_rates(
    home: &TeamRating,
    away: &TeamRating,
    baseline: &LeagueBaseline,
    home_advantage: HomeAdvantage,
) -> (f64, f64) {
    let home_rate = home_advantage.apply(home.attack_home * away.defence_away * baseline.home_rate);
    let away_rate = away.attack_away * home.defence_home * baseline.away_rate;
    (clamp_rate(home_rate), clamp_rate(away_rate))
}

pub fn predict(
    home: &TeamRating,
    away: &TeamRating,
    baseline: &LeagueBaseline,
    params: &PredictParams,
) -> OutcomeDistribution {
    let (home_rate, away_rate) = expected_rates(home, away, baseline, params.home_advantage);
    distribution(home_rate, away_rate, params.max_goals, params.total_line)
}

/// Build the independent-Poisson grid for two rates.
///
/// The grid starts at `max_goals` per side and grows until the mass outside it
/// is below [`MAX_TAIL_MASS`].
pub fn distribution(
    home_rate: f64,
    away_rate: f64,
    max_goals: usize,
    total_line: f64,
) -> OutcomeDistribution {
    let home_rate = clamp_rate(home_rate);
    let away_rate = clamp_rate(away_rate);

    let mut pmf_h = PoissonSeries::new(home_rate);
    let mut pmf_a = PoissonSeries::new(away_rate);
    let mut k = max_goals.clamp(1, MAX_GRID);
    pmf_h.extend_to(k);
    pmf_a.extend_to(k);
    while 1.0 - pmf_h.mass() * pmf_a.mass() >= MAX_TAIL_MASS && k < MAX_GRID {
        k += 1;
        pmf_h.extend_to(k);
        pmf_a.extend_to(k);
    }

    let mut home_win = 0.0;
    let mut draw = 0.0;
    let mut away_win = 0.0;
    let mut over = 0.0;
    let mut under = 0.0;
    let mut best = (0.0, (0_u32, 0_u32));

    for (i, p_i) in pmf_h.terms.iter().enumerate() {
        for (j, p_j) in pmf_a.terms.iter().enumerate() {
            let p = p_i * p_j;
            match i.cmp(&j) {
                std::cmp::Ordering::Greater => home_win += p,
                std::cmp::Ordering::Equal => draw += p,
                std::cmp::Ordering::Less => away_win += p,
            }
            let total = (i + j) as f64;
            if total > total_line {
                over += p;
            } else if total < total_line {
                under += p;
            }
            if p > best.0 {
                best = (p, (i as u32, j as u32));
            }
        }
    }

    let captured = home_win + draw + away_win;
    let norm = if captured > 0.0 { captured } else { 1.0 };

    OutcomeDistribution {
        expected_home: home_rate,
        expected_away: away_rate,
        home_win: home_win / norm,
        draw: draw / norm,
        away_win: away_win / norm,
        total_line,
        over: over / norm,
        under: under / norm,
        most_likely_score: best.1,
        grid_size: k,
        captured_mass: captured,
        tail_mass: (1.0 - captured).max(0.0),
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.max(MIN_RATE)
    } else {
        MIN_RATE
    }
}

/// Poisson pmf terms built by the k-to-k+1 recurrence, carried in log space
/// so large rates do not underflow at k = 0.
struct PoissonSeries {
    ln_lambda: f64,
    ln_term: f64,
    terms: Vec<f64>,
    mass: f64,
}

impl PoissonSeries {
    fn new(lambda: f64) -> Self {
        Self {
            ln_lambda: lambda.ln(),
            ln_term: -lambda,
            terms: Vec::new(),
            mass: 0.0,
        }
    }

    fn extend_to(&mut self, len: usize) {
        while self.terms.len() < len {
            let k = self.terms.len();
            if k > 0 {
                self.ln_term += self.ln_lambda - (k as f64).ln();
            }
            let p = self.ln_term.exp();
            self.terms.push(p);
            self.mass += p;
        }
    }

    fn mass(&self) -> f64 {
        self.mass.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_baseline(home_rate: f64, away_rate: f64) -> LeagueBaseline {
        LeagueBaseline {
            home_rate,
            away_rate,
            sample_matches: 100,
        }
    }

    #[test]
    fn home_rate_combines_attack_defence_baseline_and_advantage() {
        let home = TeamRating {
            attack_home: 1.2,
            ..TeamRating::NEUTRAL
        };
        let away = TeamRating {
            defence_away: 0.9,
            ..TeamRating::NEUTRAL
        };
        let (h, a) = expected_rates(
            &home,
            &away,
            &neutral_baseline(1.5, 1.1),
            HomeAdvantage::Additive(0.25),
        );
        assert!((h - 1.87).abs() < 1e-12);
        assert!((a - 1.1).abs() < 1e-12);

        let d = predict(
            &home,
            &away,
            &neutral_baseline(1.5, 1.1),
            &PredictParams {
                home_advantage: HomeAdvantage::Additive(0.25),
                max_goals: 10,
                total_line: 2.5,
            },
        );
        assert!(d.home_win > d.away_win);
        assert!(d.over > 0.5);
    }

    #[test]
    fn result_probabilities_sum_to_one() {
        for (h, a) in [(0.1, 0.1), (1.3, 1.1), (3.2, 0.4), (6.0, 5.0)] {
            let d = distribution(h, a, 10, 2.5);
            assert!((d.home_win + d.draw + d.away_win - 1.0).abs() < 1e-9);
            assert!(d.captured_mass >= 1.0 - MAX_TAIL_MASS);
            assert!(d.tail_mass < MAX_TAIL_MASS);
        }
    }

    #[test]
    fn grid_grows_for_high_scoring_rates() {
        let d = distribution(8.0, 7.0, 10, 14.5);
        assert!(d.grid_size > 10);
        assert!(d.tail_mass < MAX_TAIL_MASS);
    }

    #[test]
    fn non_positive_rates_are_clamped() {
        let d = distribution(0.0, -3.0, 10, 2.5);
        assert_eq!(d.expected_home, MIN_RATE);
        assert_eq!(d.expected_away, MIN_RATE);
        assert!((d.home_win + d.draw + d.away_win - 1.0).abs() < 1e-9);
    }

    #[test]
    fn large_rates_do_not_underflow() {
        let d = distribution(112.0, 108.0, 180, 220.5);
        assert!(d.captured_mass > 0.99);
        assert!(d.home_win > d.away_win);
        assert!((d.over + d.under - 1.0).abs() < 1e-9);
    }

    #[test]
    fn predict_is_deterministic() {
        let home = TeamRating {
            attack_home: 1.4,
            defence_home: 0.8,
            ..TeamRating::NEUTRAL
        };
        let away = TeamRating::NEUTRAL;
        let params = PredictParams {
            home_advantage: HomeAdvantage::Multiplicative(1.05),
            max_goals: 10,
            total_line: 2.5,
        };
        let b = neutral_baseline(1.45, 1.2);
        assert_eq!(
            predict(&home, &away, &b, &params),
            predict(&home, &away, &b, &params)
        );
    }

    #[test]
    fn integer_line_leaves_push_mass_out() {
        let d = distribution(1.5, 1.5, 10, 3.0);
        assert!(d.over + d.under < 1.0);
    }
}
