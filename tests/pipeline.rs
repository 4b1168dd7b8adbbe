use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};

use value_scout::catalogue::{CompetitionConfig, HomeAdvantage, SportKind, builtin_catalogue, load_catalogue};
use value_scout::feed_files::load_feed;
use value_scout::odds::{GoalLine, OutcomeLabel};
use value_scout::pipeline::{CompetitionFeed, CompetitionOutcome, scan_all, scan_competition};
use value_scout::settings::{ScanMode, Settings};
use value_scout::synthetic::synthetic_feed;

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn fixture_feed() -> CompetitionFeed {
    let cfg = CompetitionConfig::new("soccer_fixture", "Fixture League", SportKind::Football)
        .with_home_advantage(HomeAdvantage::Additive(0.25));
    load_feed(&fixtures_dir(), cfg)
}

#[test]
fn fixture_scan_counts_every_skip_reason() {
    let scan = scan_competition(&fixture_feed(), &Settings::default(), now());
    assert_eq!(scan.outcome, CompetitionOutcome::Scanned { events: 4, matched: 3 });

    let c = scan.counters;
    assert_eq!(c.unmatched_events, 1);
    assert_eq!(c.invalid_prices, 1);
    assert_eq!(c.above_ceiling, 1);
    assert_eq!(c.below_floor, 1);
    assert_eq!(c.accepted, 4);
    assert_eq!(c.no_value, 4);
    assert_eq!(c.outside_window, 0);
}

#[test]
fn fixture_scan_ranks_best_prices_by_edge() {
    let report = scan_all(&[fixture_feed()], &Settings::default(), now());
    let rows: Vec<(String, OutcomeLabel, f64)> = report
        .opportunities
        .iter()
        .map(|o| (o.home.clone(), o.label, o.price))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Manchester City".to_string(), OutcomeLabel::Home, 1.45),
            ("Liverpool".to_string(), OutcomeLabel::Home, 1.95),
            ("Manchester City".to_string(), OutcomeLabel::Over(GoalLine::new(2.5)), 2.30),
        ]
    );

    let best = &report.opportunities[0];
    assert_eq!(best.bookmaker, "Pinnacle");
    assert_eq!(best.away, "Tottenham");
    assert!(best.edge > 0.05 && best.edge < 0.45);
    assert!((best.stake_fraction - 0.02).abs() < 1e-12);
    assert!((best.stake_amount - 20.0).abs() < 1e-9);
    assert!(best.expected_home.is_some());
    assert!(report.opportunities.iter().all(|o| !o.diagnostic));
}

#[test]
fn lookahead_window_drops_later_fixtures() {
    let settings = Settings {
        lookahead_hours: Some(72),
        ..Settings::default()
    };
    let report = scan_all(&[fixture_feed()], &settings, now());
    assert_eq!(report.totals.outside_window, 1);
    assert_eq!(report.totals.events, 3);
    assert!(report.opportunities.iter().all(|o| o.home != "Liverpool"));
    assert_eq!(report.opportunities.len(), 2);
}

#[test]
fn strict_threshold_rejects_abbreviated_names() {
    let mut feed = fixture_feed();
    feed.config.min_match_score = Some(100);
    feed.events[0].away = "Spurs".to_string();
    let scan = scan_competition(&feed, &Settings::default(), now());
    assert_eq!(scan.counters.unmatched_events, 2);
}

#[test]
fn missing_competition_contributes_nothing() {
    let catalogue = load_catalogue(&fixtures_dir().join("competitions.json")).expect("catalogue should load");
    let feeds: Vec<CompetitionFeed> = catalogue.into_iter().map(|cfg| load_feed(&fixtures_dir(), cfg)).collect();
    let report = scan_all(&feeds, &Settings::default(), now());

    assert_eq!(report.competitions.len(), 2);
    assert!(matches!(report.competitions[0].outcome, CompetitionOutcome::Scanned { .. }));
    assert!(matches!(report.competitions[1].outcome, CompetitionOutcome::Skipped { .. }));
    assert_eq!(report.opportunities.len(), 3);
}

#[test]
fn same_fixture_in_two_competitions_is_reported_once() {
    let a = fixture_feed();
    let mut b = fixture_feed();
    b.config.key = "soccer_fixture_cup".to_string();
    let report = scan_all(&[a, b], &Settings::default(), now());
    assert_eq!(report.opportunities.len(), 3);
    assert_eq!(report.totals.events, 8);
}

#[test]
fn best_available_mode_adds_diagnostic_rows_only_for_valueless_events() {
    let settings = Settings {
        mode: ScanMode::BestAvailable,
        ..Settings::default()
    };
    let report = scan_all(&[fixture_feed()], &settings, now());
    let diagnostic: Vec<_> = report.opportunities.iter().filter(|o| o.diagnostic).collect();
    // Arsenal v Chelsea has a ceiling-breaking and a sub-floor price only.
    assert_eq!(diagnostic.len(), 1);
    assert_eq!(diagnostic[0].home, "Arsenal");
    assert_eq!(diagnostic[0].stake_fraction, 0.0);
    assert_eq!(report.opportunities.iter().filter(|o| !o.diagnostic).count(), 3);
}

#[test]
fn synthetic_demo_scans_every_builtin_sport() {
    let keys = ["soccer_epl", "icehockey_nhl", "basketball_nba", "tennis_atp"];
    let feeds: Vec<CompetitionFeed> = builtin_catalogue()
        .into_iter()
        .filter(|c| keys.contains(&c.key.as_str()))
        .enumerate()
        .map(|(idx, cfg)| synthetic_feed(cfg, 40 + idx as u64, now()))
        .collect();
    assert_eq!(feeds.len(), 4);

    let report = scan_all(&feeds, &Settings::default(), now());
    for summary in &report.competitions {
        match &summary.outcome {
            CompetitionOutcome::Scanned { events, matched } => {
                assert_eq!(*events, 5, "{}", summary.key);
                assert_eq!(*matched, 5, "{}", summary.key);
            }
            other => panic!("{} not scanned: {other:?}", summary.key),
        }
        assert_eq!(summary.counters.invalid_prices, 0);
    }
    let window = Settings::default().edge_window;
    assert!(
        report
            .opportunities
            .iter()
            .all(|o| o.edge >= window.min_edge && o.edge <= 0.45)
    );
    assert!(
        report
            .opportunities
            .windows(2)
            .all(|w| w[0].edge >= w[1].edge)
    );
}
