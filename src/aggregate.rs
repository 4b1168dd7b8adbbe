use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::odds::OutcomeLabel;

/// One priced outcome the model rates as value (or, in diagnostic mode, the
/// best thing an event had to offer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub competition: String,
    /// Reconciled entity names, as they appear in the results feed.
    pub home: String,
    pub away: String,
    pub kickoff: Option<DateTime<Utc>>,
    pub label: OutcomeLabel,
    pub bookmaker: String,
    pub price: f64,
    pub probability: f64,
    pub edge: f64,
    pub stake_fraction: f64,
    pub stake_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_home: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_away: Option<f64>,
    pub diagnostic: bool,
}

impl Opportunity {
    pub fn fixture(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }

    fn pair_key(&self) -> (String, String, OutcomeLabel) {
        (self.home.clone(), self.away.clone(), self.label)
    }
}

/// Collapse candidates into the final ranked list.
///
/// Within a competition only the best price per (pair, label) survives. The
/// same (pair, label) coming from two competitions keeps the higher edge.
/// Output is sorted by edge, descending, with a name-based tie-break so the
/// order is stable for a fixed input.
pub fn aggregate(candidates: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut best_price: BTreeMap<(String, (String, String, OutcomeLabel)), Opportunity> = BTreeMap::new();
    for cand in candidates {
        let key = (cand.competition.clone(), cand.pair_key());
        if best_price.get(&key).is_none_or(|kept| prefer_price(&cand, kept)) {
            best_price.insert(key, cand);
        }
    }

    let mut unique: BTreeMap<(String, String, OutcomeLabel), Opportunity> = BTreeMap::new();
    for cand in best_price.into_values() {
        let key = cand.pair_key();
        if unique.get(&key).is_none_or(|kept| prefer_across(&cand, kept)) {
            unique.insert(key, cand);
        }
    }

    let mut out: Vec<Opportunity> = unique.into_values().collect();
    out.sort_by(rank_order);
    out
}

fn prefer_price(cand: &Opportunity, kept: &Opportunity) -> bool {
    match cand.price.total_cmp(&kept.price) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => cand.bookmaker < kept.bookmaker,
    }
}

fn prefer_across(cand: &Opportunity, kept: &Opportunity) -> bool {
    if cand.diagnostic != kept.diagnostic {
        return !cand.diagnostic;
    }
    match cand.edge.total_cmp(&kept.edge) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => cand.competition < kept.competition,
    }
}

fn rank_order(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.edge
        .total_cmp(&a.edge)
        .then_with(|| a.home.cmp(&b.home))
        .then_with(|| a.away.cmp(&b.away))
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.competition.cmp(&b.competition))
        .then_with(|| a.bookmaker.cmp(&b.bookmaker))
}
