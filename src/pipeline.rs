use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{Opportunity, aggregate};
use crate::catalogue::CompetitionConfig;
use crate::edge::{EdgeVerdict, evaluate, stake_amount};
use crate::error::ScanError;
use crate::history::HistoricalResult;
use crate::model::RatingModel;
use crate::odds::MarketEvent;
use crate::reconcile::{NameMatch, Reconciler};
use crate::settings::{ReconcileSettings, ScanMode, Settings};

/// Everything the scanner needs for one competition. Either list may be
/// empty when the upstream fetch failed.
#[derive(Debug, Clone)]
pub struct CompetitionFeed {
    pub config: CompetitionConfig,
    pub results: Vec<HistoricalResult>,
    pub events: Vec<MarketEvent>,
}

impl CompetitionFeed {
    pub fn new(config: CompetitionConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanCounters {
    /// Events inside the lookahead window; the rest land in `outside_window`.
    pub events: usize,
    pub outside_window: usize,
    pub unmatched_events: usize,
    pub invalid_prices: usize,
    pub unpriced_labels: usize,
    pub accepted: usize,
    pub below_floor: usize,
    pub above_ceiling: usize,
    pub no_value: usize,
}

impl ScanCounters {
    fn record(&mut self, verdict: EdgeVerdict) {
        match verdict {
            EdgeVerdict::Accepted => self.accepted += 1,
            EdgeVerdict::BelowFloor => self.below_floor += 1,
            EdgeVerdict::AboveCeiling => self.above_ceiling += 1,
            EdgeVerdict::NoValue => self.no_value += 1,
        }
    }

    pub fn merge(&mut self, other: &ScanCounters) {
        self.events += other.events;
        self.outside_window += other.outside_window;
        self.unmatched_events += other.unmatched_events;
        self.invalid_prices += other.invalid_prices;
        self.unpriced_labels += other.unpriced_labels;
        self.accepted += other.accepted;
        self.below_floor += other.below_floor;
        self.above_ceiling += other.above_ceiling;
        self.no_value += other.no_value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompetitionOutcome {
    Scanned { events: usize, matched: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitionScan {
    pub key: String,
    pub name: String,
    pub outcome: CompetitionOutcome,
    pub counters: ScanCounters,
    /// Candidates before cross-competition aggregation.
    pub opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitionSummary {
    pub key: String,
    pub name: String,
    pub outcome: CompetitionOutcome,
    pub counters: ScanCounters,
    pub candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub competitions: Vec<CompetitionSummary>,
    pub totals: ScanCounters,
    pub opportunities: Vec<Opportunity>,
}

/// Rate one competition and price every offer of its upcoming events.
///
/// Never fails: a competition with too little history is reported as skipped,
/// and unmatched events or invalid prices only bump counters.
pub fn scan_competition(feed: &CompetitionFeed, settings: &Settings, now: DateTime<Utc>) -> CompetitionScan {
    let cfg = &feed.config;
    let mut counters = ScanCounters::default();

    let model = match RatingModel::fit(cfg, &feed.results, settings) {
        Ok(m) => m,
        Err(err) => {
            warn!(competition = %cfg.key, error = %err, "competition skipped");
            return CompetitionScan {
                key: cfg.key.clone(),
                name: cfg.name.clone(),
                outcome: CompetitionOutcome::Skipped {
                    reason: err.to_string(),
                },
                counters,
                opportunities: Vec::new(),
            };
        }
    };

    let reconciler = Reconciler::new(model.entity_names());
    let reconcile = cfg.reconcile(settings);
    let window = cfg.edge_window(settings);
    let stake = cfg.stake(settings);
    let horizon = settings.lookahead_hours.and_then(|h| lookahead_horizon(now, h));

    let mut matched = 0;
    let mut opportunities = Vec::new();

    for event in &feed.events {
        if let Some(until) = horizon
            && !event.kicks_off_within(now, until)
        {
            counters.outside_window += 1;
            continue;
        }
        counters.events += 1;

        let (home, away) = match resolve_pair(&reconciler, event, &reconcile) {
            Ok(pair) => pair,
            Err(err) => {
                debug!(competition = %cfg.key, home = %event.home, away = %event.away, error = %err, "event skipped");
                counters.unmatched_events += 1;
                continue;
            }
        };
        matched += 1;

        let table = model.probabilities(&home.name, &away.name, cfg);
        let mut accepted_any = false;
        // Best sub-window candidate; ceiling breakers never qualify.
        let mut best_rejected: Option<Opportunity> = None;

        for offer in &event.offers {
            let price = match offer.validated_price() {
                Ok(p) => p,
                Err(err) => {
                    debug!(competition = %cfg.key, bookmaker = %offer.bookmaker, error = %err, "offer skipped");
                    counters.invalid_prices += 1;
                    continue;
                }
            };
            let Some(probability) = table.get(offer.label) else {
                counters.unpriced_labels += 1;
                continue;
            };

            let eval = evaluate(probability, price, &stake);
            let verdict = window.classify(eval.edge);
            counters.record(verdict);

            let mut opp = Opportunity {
                competition: cfg.key.clone(),
                home: home.name.clone(),
                away: away.name.clone(),
                kickoff: event.kickoff,
                label: offer.label,
                bookmaker: offer.bookmaker.clone(),
                price,
                probability,
                edge: eval.edge,
                stake_fraction: eval.stake_fraction,
                stake_amount: stake_amount(eval.stake_fraction, stake.bankroll),
                expected_home: table.expected_home,
                expected_away: table.expected_away,
                diagnostic: false,
            };

            match verdict {
                EdgeVerdict::Accepted => {
                    accepted_any = true;
                    opportunities.push(opp);
                }
                EdgeVerdict::AboveCeiling => {
                    debug!(
                        competition = %cfg.key,
                        fixture = %opp.fixture(),
                        label = %opp.label,
                        edge = eval.edge,
                        "edge above ceiling, suspected mismatch"
                    );
                }
                EdgeVerdict::BelowFloor | EdgeVerdict::NoValue => {
                    opp.stake_fraction = 0.0;
                    opp.stake_amount = 0.0;
                    keep_best(&mut best_rejected, opp);
                }
            }
        }

        if settings.mode == ScanMode::BestAvailable
            && !accepted_any
            && let Some(mut diag) = best_rejected
        {
            diag.diagnostic = true;
            opportunities.push(diag);
        }
    }

    info!(
        competition = %cfg.key,
        events = counters.events,
        matched,
        candidates = opportunities.len(),
        "competition scanned"
    );

    CompetitionScan {
        key: cfg.key.clone(),
        name: cfg.name.clone(),
        outcome: CompetitionOutcome::Scanned {
            events: counters.events,
            matched,
        },
        counters,
        opportunities,
    }
}

/// Scan every competition in parallel, then join and aggregate.
pub fn scan_all(feeds: &[CompetitionFeed], settings: &Settings, now: DateTime<Utc>) -> ScanReport {
    let scans: Vec<CompetitionScan> = feeds
        .par_iter()
        .map(|feed| scan_competition(feed, settings, now))
        .collect();

    let mut totals = ScanCounters::default();
    let mut competitions = Vec::with_capacity(scans.len());
    let mut candidates = Vec::new();
    for scan in scans {
        totals.merge(&scan.counters);
        competitions.push(CompetitionSummary {
            key: scan.key,
            name: scan.name,
            outcome: scan.outcome,
            counters: scan.counters,
            candidates: scan.opportunities.len(),
        });
        candidates.extend(scan.opportunities);
    }

    let opportunities = aggregate(candidates);
    info!(
        competitions = competitions.len(),
        opportunities = opportunities.len(),
        "scan complete"
    );

    ScanReport {
        generated_at: now,
        competitions,
        totals,
        opportunities,
    }
}

/// Both sides must clear the threshold and land on different entities.
fn resolve_pair(
    reconciler: &Reconciler,
    event: &MarketEvent,
    settings: &ReconcileSettings,
) -> Result<(NameMatch, NameMatch), ScanError> {
    let home = reconciler.resolve(&event.home, settings)?;
    let away = reconciler.resolve(&event.away, settings)?;
    if home.name == away.name {
        return Err(ScanError::UnmatchedEntity {
            name: event.away.clone(),
            best: Some(away.name),
            score: away.score,
        });
    }
    Ok((home, away))
}

/// End of the lookahead window; `None` (no horizon) when `now + hours`
/// does not fit in a timestamp.
fn lookahead_horizon(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    let until = Duration::try_hours(hours).and_then(|span| now.checked_add_signed(span));
    if until.is_none() {
        warn!(hours, "lookahead out of range, scanning without a horizon");
    }
    until
}

fn keep_best(slot: &mut Option<Opportunity>, cand: Opportunity) {
    if slot.as_ref().is_none_or(|kept| cand.edge > kept.edge) {
        *slot = Some(cand);
    }
}
