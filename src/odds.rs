use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ScanError;

/// A totals line stored in tenths so it can key maps ("2.5" -> 25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoalLine(i32);

impl GoalLine {
    pub fn new(line: f64) -> Self {
        Self((line * 10.0).round() as i32)
    }

    pub fn value(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for GoalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutcomeLabel {
    Home,
    Draw,
    Away,
    Over(GoalLine),
    Under(GoalLine),
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeLabel::Home => write!(f, "Home"),
            OutcomeLabel::Draw => write!(f, "Draw"),
            OutcomeLabel::Away => write!(f, "Away"),
            OutcomeLabel::Over(line) => write!(f, "Over {line}"),
            OutcomeLabel::Under(line) => write!(f, "Under {line}"),
        }
    }
}

impl Serialize for OutcomeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One bookmaker's decimal price for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    pub bookmaker: String,
    pub label: OutcomeLabel,
    pub price: f64,
}

impl Offer {
    pub fn new(bookmaker: &str, label: OutcomeLabel, price: f64) -> Self {
        Self {
            bookmaker: bookmaker.to_string(),
            label,
            price,
        }
    }

    /// Decimal odds must exceed 1.0; anything else is rejected, never clamped.
    pub fn validated_price(&self) -> Result<f64, ScanError> {
        if self.price.is_finite() && self.price > 1.0 {
            Ok(self.price)
        } else {
            Err(ScanError::InvalidPrice { price: self.price })
        }
    }
}

/// One upcoming fixture as reported by the odds source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketEvent {
    pub home: String,
    pub away: String,
    pub kickoff: Option<DateTime<Utc>>,
    pub offers: Vec<Offer>,
}

impl MarketEvent {
    pub fn new(home: &str, away: &str) -> Self {
        Self {
            home: home.to_string(),
            away: away.to_string(),
            kickoff: None,
            offers: Vec::new(),
        }
    }

    pub fn with_offer(mut self, bookmaker: &str, label: OutcomeLabel, price: f64) -> Self {
        self.offers.push(Offer::new(bookmaker, label, price));
        self
    }

    pub fn kicks_off_within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        match self.kickoff {
            Some(k) => k >= from && k <= to,
            // Undated events are kept; the feed decides what "upcoming" means.
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    #[serde(default)]
    commence_time: Option<String>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

/// Parse an odds-API style event list (h2h and totals markets) into
/// [`MarketEvent`]s. Outcomes that cannot be labelled are dropped; prices are
/// kept as quoted so invalid ones can be reported downstream.
pub fn parse_odds_json(raw: &str) -> Result<Vec<MarketEvent>> {
    let parsed: Vec<OddsEvent> = serde_json::from_str(raw).context("invalid odds json")?;
    Ok(parsed.iter().map(event_from_feed).collect())
}

fn event_from_feed(event: &OddsEvent) -> MarketEvent {
    let mut out = MarketEvent::new(event.home_team.trim(), event.away_team.trim());
    out.kickoff = event.commence_time.as_deref().and_then(parse_timestamp);

    for book in &event.bookmakers {
        let bookmaker = if book.title.trim().is_empty() {
            book.key.trim()
        } else {
            book.title.trim()
        };
        for market in &book.markets {
            for outcome in &market.outcomes {
                let Some(label) = label_for(&market.key, outcome, &event.home_team, &event.away_team)
                else {
                    continue;
                };
                out.offers.push(Offer::new(bookmaker, label, outcome.price));
            }
        }
    }
    out
}

fn label_for(market_key: &str, outcome: &OddsOutcome, home: &str, away: &str) -> Option<OutcomeLabel> {
    let name = outcome.name.trim();
    match market_key.trim().to_ascii_lowercase().as_str() {
        "h2h" => {
            if is_draw_label(name) {
                Some(OutcomeLabel::Draw)
            } else if name.eq_ignore_ascii_case(home.trim()) {
                Some(OutcomeLabel::Home)
            } else if name.eq_ignore_ascii_case(away.trim()) {
                Some(OutcomeLabel::Away)
            } else {
                None
            }
        }
        "totals" => {
            let line = GoalLine::new(outcome.point?);
            match name.to_ascii_lowercase().as_str() {
                "over" => Some(OutcomeLabel::Over(line)),
                "under" => Some(OutcomeLabel::Under(line)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_draw_label(name: &str) -> bool {
    let n: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    n == "draw" || n == "tie" || n == "x"
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}
