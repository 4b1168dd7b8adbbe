use serde::Serialize;

use crate::settings::{EdgeWindow, StakeSettings};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    /// Expected return per unit staked: p * price - 1.
    pub edge: f64,
    /// Unscaled Kelly fraction (b*p - q) / b, floored at zero.
    pub kelly: f64,
    /// Fractional Kelly clamped to [0, max_bank_fraction].
    pub stake_fraction: f64,
}

impl Evaluation {
    pub const ZERO: Evaluation = Evaluation {
        edge: 0.0,
        kelly: 0.0,
        stake_fraction: 0.0,
    };
}

/// Where an edge falls relative to the acceptance window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeVerdict {
    Accepted,
    /// Positive but small enough to be noise.
    BelowFloor,
    /// Too good to be true. Usually a wrong entity match, a stale price or a
    /// mislabelled market, so the opportunity is dropped rather than trusted.
    AboveCeiling,
    /// Zero or negative edge.
    NoValue,
}

impl EdgeWindow {
    pub fn classify(&self, edge: f64) -> EdgeVerdict {
        if !edge.is_finite() || edge <= 0.0 {
            EdgeVerdict::NoValue
        } else if edge < self.min_edge {
            EdgeVerdict::BelowFloor
        } else if edge > self.max_edge {
            EdgeVerdict::AboveCeiling
        } else {
            EdgeVerdict::Accepted
        }
    }
}

/// Edge and stake for a model probability at a decimal price.
///
/// A price of 1.0 or less, or a probability of zero or less, evaluates to
/// [`Evaluation::ZERO`] instead of failing.
pub fn evaluate(probability: f64, price: f64, stake: &StakeSettings) -> Evaluation {
    if !(price > 1.0 && probability > 0.0) || !price.is_finite() || !probability.is_finite() {
        return Evaluation::ZERO;
    }
    let p = probability.min(1.0);
    let kelly = kelly_fraction(p, price);
    let stake_fraction = (kelly * stake.kelly_fraction).clamp(0.0, stake.max_bank_fraction.max(0.0));
    Evaluation {
        edge: p * price - 1.0,
        kelly,
        stake_fraction,
    }
}

/// Full-Kelly bankroll fraction; zero whenever the bet has no positive expectation.
pub fn kelly_fraction(probability: f64, price: f64) -> f64 {
    let b = price - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - probability;
    ((b * probability - q) / b).max(0.0)
}

/// Currency stake for a fraction of the bankroll, rounded to cents.
pub fn stake_amount(stake_fraction: f64, bankroll: f64) -> f64 {
    (stake_fraction * bankroll * 100.0).round() / 100.0
}
