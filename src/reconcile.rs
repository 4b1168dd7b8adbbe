//! Fuzzy reconciliation of entity names between the odds feed and the
//! historical results feed.
//!
//! Scores are in [0, 100]. A name is compared on several normalised views
//! (raw, sorted tokens, token-set, abbreviated-prefix) and the best view wins,
//! so "Manchester Utd" lands on "Manchester United", "Nott'm Forest" on
//! "Nottingham Forest" and "Man City" on "Manchester City" while a random
//! team stays well below any sane threshold.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::Serialize;
use strsim::normalized_levenshtein;

use crate::error::ScanError;
use crate::settings::ReconcileSettings;

static NOISE_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["fc", "cf", "afc", "sc", "ac", "club", "the"]
        .into_iter()
        .collect()
});

const PREFIX_SCORE: f64 = 90.0;
const MIN_PREFIX_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameMatch {
    pub name: String,
    pub score: u8,
}

#[derive(Debug, Clone)]
struct Prepared {
    original: String,
    joined: String,
    sorted: String,
    tokens: Vec<String>,
}

impl Prepared {
    fn new(raw: &str) -> Self {
        let mut tokens = canonical_tokens(raw);
        let joined = tokens.join(" ");
        tokens.sort();
        tokens.dedup();
        Self {
            original: raw.to_string(),
            joined,
            sorted: tokens.join(" "),
            tokens,
        }
    }
}

/// A candidate pool prepared once and queried many times.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    pool: Vec<Prepared>,
}

impl Reconciler {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pool = names
            .into_iter()
            .map(|n| Prepared::new(n.as_ref()))
            .filter(|p| !p.tokens.is_empty())
            .collect();
        Self { pool }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Highest-scoring candidate regardless of threshold.
    ///
    /// Ties go to the lexicographically smallest name so the result does not
    /// depend on pool order.
    pub fn best(&self, query: &str) -> Option<NameMatch> {
        let q = Prepared::new(query);
        if q.tokens.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &Prepared)> = None;
        for cand in &self.pool {
            let score = similarity_prepared(&q, cand);
            best = match best {
                Some((s, p))
                    if s > score || (s == score && p.original <= cand.original) =>
                {
                    Some((s, p))
                }
                _ => Some((score, cand)),
            };
        }

        best.map(|(score, p)| NameMatch {
            name: p.original.clone(),
            score: to_score(score),
        })
    }

    pub fn find(&self, query: &str, min_score: u8) -> Option<NameMatch> {
        self.best(query).filter(|m| m.score >= min_score)
    }

    pub fn resolve(&self, query: &str, settings: &ReconcileSettings) -> Result<NameMatch, ScanError> {
        match self.best(query) {
            Some(m) if m.score >= settings.min_score => Ok(m),
            Some(m) => Err(ScanError::UnmatchedEntity {
                name: query.to_string(),
                best: Some(m.name),
                score: m.score,
            }),
            None => Err(ScanError::UnmatchedEntity {
                name: query.to_string(),
                best: None,
                score: 0,
            }),
        }
    }
}

/// One-shot match of `query` against `candidates`; `None` below `min_score`
/// or when the pool is empty.
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S], min_score: u8) -> Option<NameMatch> {
    Reconciler::new(candidates).find(query, min_score)
}

/// Similarity of two names in [0, 100].
pub fn similarity(a: &str, b: &str) -> u8 {
    let pa = Prepared::new(a);
    let pb = Prepared::new(b);
    if pa.tokens.is_empty() || pb.tokens.is_empty() {
        return 0;
    }
    to_score(similarity_prepared(&pa, &pb))
}

fn similarity_prepared(a: &Prepared, b: &Prepared) -> f64 {
    if a.sorted == b.sorted {
        return 100.0;
    }
    let raw = ratio(&a.joined, &b.joined);
    let sorted = ratio(&a.sorted, &b.sorted);
    let set = token_set_ratio(&a.tokens, &b.tokens);
    let prefix = prefix_ratio(&a.tokens, &b.tokens);
    raw.max(sorted).max(set).max(prefix)
}

/// Best of the edit-distance and insert/delete ratios. The latter,
/// 2 * lcs / (|a| + |b|), is the lenient one that lets truncations like
/// "Sheffield Weds" reach a full name.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (normalized_levenshtein(a, b) * 100.0).max(indel_ratio(a, b))
}

fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0_usize; b.len() + 1];
    let mut row = vec![0_usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

fn token_set_ratio(a: &[String], b: &[String]) -> f64 {
    let common: Vec<&str> = a
        .iter()
        .filter(|t| b.contains(t))
        .map(String::as_str)
        .collect();
    let only_a: Vec<&str> = a
        .iter()
        .filter(|t| !b.contains(t))
        .map(String::as_str)
        .collect();
    let only_b: Vec<&str> = b
        .iter()
        .filter(|t| !a.contains(t))
        .map(String::as_str)
        .collect();

    let t0 = common.join(" ");
    let t1 = join_nonempty(&t0, &only_a.join(" "));
    let t2 = join_nonempty(&t0, &only_b.join(" "));

    ratio(&t0, &t1).max(ratio(&t0, &t2)).max(ratio(&t1, &t2))
}

/// Abbreviated multi-word names ("Man City", "Ath Bilbao") whose every token
/// starts a distinct token of the other name. Either side may be the short one.
fn prefix_ratio(a: &[String], b: &[String]) -> f64 {
    if abbreviates(a, b) || abbreviates(b, a) {
        PREFIX_SCORE
    } else {
        0.0
    }
}

fn abbreviates(short: &[String], long: &[String]) -> bool {
    if short.len() < 2 || short.len() > long.len() {
        return false;
    }
    let mut used = vec![false; long.len()];
    for tok in short {
        if tok.chars().count() < MIN_PREFIX_CHARS {
            return false;
        }
        let hit = long
            .iter()
            .enumerate()
            .find(|(idx, l)| !used[*idx] && l.starts_with(tok.as_str()));
        match hit {
            Some((idx, _)) => used[idx] = true,
            None => return false,
        }
    }
    true
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a} {b}"),
    }
}

fn canonical_tokens(raw: &str) -> Vec<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    let all: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
    let kept: Vec<String> = all
        .iter()
        .filter(|w| !NOISE_TOKENS.contains(w.as_str()))
        .cloned()
        .collect();
    // A name made only of noise tokens keeps them.
    if kept.is_empty() { all } else { kept }
}

fn to_score(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviated_united_matches_full_name() {
        let pool = ["Manchester United", "Manchester City", "Liverpool"];
        let m = best_match("Manchester Utd", &pool, 75).expect("should match");
        assert_eq!(m.name, "Manchester United");
        assert!(m.score >= 75);
    }

    #[test]
    fn empty_pool_returns_none() {
        let pool: [&str; 0] = [];
        assert!(best_match("Zzzz FC", &pool, 75).is_none());
        let err = Reconciler::new(pool)
            .resolve("Zzzz FC", &ReconcileSettings::default())
            .unwrap_err();
        assert!(matches!(err, ScanError::UnmatchedEntity { best: None, .. }));
    }

    #[test]
    fn club_suffixes_are_ignored() {
        assert_eq!(similarity("Arsenal FC", "Arsenal"), 100);
        assert_eq!(similarity("AFC Bournemouth", "Bournemouth"), 100);
    }

    #[test]
    fn prefix_abbreviation_matches() {
        let pool = ["Manchester United", "Manchester City", "Everton"];
        let m = best_match("Man City", &pool, 80).expect("should match");
        assert_eq!(m.name, "Manchester City");
    }

    #[test]
    fn unrelated_name_is_rejected_with_best_guess() {
        let rec = Reconciler::new(["Liverpool", "Everton"]);
        let err = rec
            .resolve("Real Madrid", &ReconcileSettings { min_score: 75 })
            .unwrap_err();
        match err {
            ScanError::UnmatchedEntity { name, best, score } => {
                assert_eq!(name, "Real Madrid");
                assert!(best.is_some());
                assert!(score < 75);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn ties_resolve_independently_of_pool_order() {
        let a = Reconciler::new(["Team B", "Team A"]).best("Team");
        let b = Reconciler::new(["Team A", "Team B"]).best("Team");
        assert_eq!(a, b);
        assert_eq!(a.map(|m| m.name), Some("Team A".to_string()));
    }

    #[test]
    fn results_feed_short_forms_clear_default_threshold() {
        assert_eq!(similarity("Sheffield Wednesday", "Sheffield Weds"), 85);
        assert_eq!(similarity("Nottingham Forest", "Nott'm Forest"), 80);

        let pool = ["Sheffield Weds", "Sheffield United", "Leeds"];
        let m = best_match("Sheffield Wednesday", &pool, 75).expect("should match");
        assert_eq!(m.name, "Sheffield Weds");

        let pool = ["Man United", "Man City", "Newcastle"];
        let m = best_match("Manchester United", &pool, 75).expect("should match");
        assert_eq!(m.name, "Man United");
        assert_eq!(m.score, 90);

        let pool = ["Nott'm Forest", "Norwich", "Notts County"];
        let m = best_match("Nottingham Forest", &pool, 75).expect("should match");
        assert_eq!(m.name, "Nott'm Forest");
    }

    #[test]
    fn lcs_counts_common_subsequence() {
        let a: Vec<char> = "sheffield wednesday".chars().collect();
        let b: Vec<char> = "sheffield weds".chars().collect();
        assert_eq!(lcs_len(&a, &b), 14);
        assert_eq!(lcs_len(&a, &[]), 0);
    }

    #[test]
    fn accents_survive_normalisation() {
        assert_eq!(similarity("Fenerbahçe", "fenerbahçe"), 100);
    }
}
