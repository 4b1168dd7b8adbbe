use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One finished fixture of a competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalResult {
    pub home: String,
    pub away: String,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl HistoricalResult {
    pub fn new(home: &str, away: &str, home_score: u32, away_score: u32) -> Self {
        Self {
            home: home.to_string(),
            away: away.to_string(),
            home_score,
            away_score,
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

const HOME_COLUMNS: &[&str] = &["hometeam", "home_team", "home", "team1", "ht", "winner_name"];
const AWAY_COLUMNS: &[&str] = &["awayteam", "away_team", "away", "team2", "at", "loser_name"];
const HOME_SCORE_COLUMNS: &[&str] = &["fthg", "hg", "home_goals", "home_score", "score1"];
const AWAY_SCORE_COLUMNS: &[&str] = &["ftag", "ag", "away_goals", "away_score", "score2"];
const DATE_COLUMNS: &[&str] = &["date", "tourney_date", "game_date", "match_date"];

const DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Normalise a results CSV into [`HistoricalResult`] rows.
///
/// Header names vary by source and are matched case-insensitively against a
/// list of aliases. Winner/loser tables (no score columns) become 1-0 results
/// for the winner. Rows with a missing or non-integer score are dropped.
pub fn parse_results_csv(raw: &str) -> Result<Vec<HistoricalResult>> {
    let mut records = csv_records(raw.trim_start_matches('\u{feff}')).into_iter();
    let header: Vec<String> = records
        .next()
        .ok_or_else(|| anyhow!("empty results csv"))?
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let home_idx = find_column(&header, HOME_COLUMNS).ok_or_else(|| anyhow!("missing home entity column"))?;
    let away_idx = find_column(&header, AWAY_COLUMNS).ok_or_else(|| anyhow!("missing away entity column"))?;
    let scores = match (
        find_column(&header, HOME_SCORE_COLUMNS),
        find_column(&header, AWAY_SCORE_COLUMNS),
    ) {
        (Some(h), Some(a)) => Some((h, a)),
        (None, None) if header[home_idx] == "winner_name" => None,
        _ => return Err(anyhow!("missing score columns")),
    };
    let date_idx = find_column(&header, DATE_COLUMNS);

    let mut out = Vec::new();
    for cells in records {
        let home = cell(&cells, home_idx);
        let away = cell(&cells, away_idx);
        if home.is_empty() || away.is_empty() {
            continue;
        }
        let (home_score, away_score) = match scores {
            Some((h, a)) => {
                let (Some(hs), Some(as_)) = (parse_score(cell(&cells, h)), parse_score(cell(&cells, a)))
                else {
                    continue;
                };
                (hs, as_)
            }
            None => (1, 0),
        };
        out.push(HistoricalResult {
            home: home.to_string(),
            away: away.to_string(),
            home_score,
            away_score,
            date: date_idx.and_then(|idx| parse_date(cell(&cells, idx))),
        });
    }
    Ok(out)
}

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| header.iter().position(|h| h == alias))
}

fn cell(cells: &[String], idx: usize) -> &str {
    cells.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn parse_score(raw: &str) -> Option<u32> {
    let v = raw.trim().parse::<f64>().ok()?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return None;
    }
    Some(v as u32)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Some exports append a time component.
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Split CSV text into records. Double-quoted fields may carry commas,
/// `""` escapes and line breaks; blank records are dropped.
fn csv_records(raw: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }
    record.push(field);
    push_record(&mut records, record);
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    if record.iter().any(|f| !f.trim().is_empty()) {
        records.push(record);
    }
}
