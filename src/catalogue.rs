use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::settings::{EdgeWindow, ReconcileSettings, Settings, StakeSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportKind {
    Football,
    IceHockey,
    Basketball,
    Tennis,
}

impl SportKind {
    pub fn default_model(self) -> RatingModelKind {
        match self {
            SportKind::Tennis => RatingModelKind::WinRateBased,
            _ => RatingModelKind::GoalBased,
        }
    }

    pub fn default_total_line(self) -> f64 {
        match self {
            SportKind::Football => 2.5,
            SportKind::IceHockey => 5.5,
            SportKind::Basketball => 220.5,
            SportKind::Tennis => 0.0,
        }
    }

    /// Starting grid size K; the predictor grows it if the tail is too heavy.
    pub fn default_max_goals(self) -> usize {
        match self {
            SportKind::Football => 10,
            SportKind::IceHockey => 15,
            SportKind::Basketball => 180,
            SportKind::Tennis => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingModelKind {
    GoalBased,
    WinRateBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeAdvantage {
    /// Goals added to the home expected rate.
    Additive(f64),
    /// Factor applied to the home expected rate.
    Multiplicative(f64),
}

impl HomeAdvantage {
    pub fn apply(self, rate: f64) -> f64 {
        match self {
            HomeAdvantage::Additive(goals) => rate + goals,
            HomeAdvantage::Multiplicative(factor) => rate * factor,
        }
    }
}

impl Default for HomeAdvantage {
    fn default() -> Self {
        HomeAdvantage::Additive(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionConfig {
    pub key: String,
    pub name: String,
    pub sport: SportKind,
    #[serde(default)]
    pub model: Option<RatingModelKind>,
    #[serde(default)]
    pub home_advantage: HomeAdvantage,
    #[serde(default)]
    pub total_line: Option<f64>,
    #[serde(default)]
    pub max_goals: Option<usize>,
    #[serde(default)]
    pub min_match_score: Option<u8>,
    #[serde(default)]
    pub edge_window: Option<EdgeWindow>,
    #[serde(default)]
    pub kelly_fraction: Option<f64>,
}

impl CompetitionConfig {
    pub fn new(key: &str, name: &str, sport: SportKind) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            sport,
            model: None,
            home_advantage: HomeAdvantage::default(),
            total_line: None,
            max_goals: None,
            min_match_score: None,
            edge_window: None,
            kelly_fraction: None,
        }
    }

    pub fn with_home_advantage(mut self, advantage: HomeAdvantage) -> Self {
        self.home_advantage = advantage;
        self
    }

    pub fn model(&self) -> RatingModelKind {
        self.model.unwrap_or_else(|| self.sport.default_model())
    }

    pub fn total_line(&self) -> f64 {
        self.total_line
            .unwrap_or_else(|| self.sport.default_total_line())
    }

    pub fn max_goals(&self) -> usize {
        self.max_goals
            .unwrap_or_else(|| self.sport.default_max_goals())
            .max(1)
    }

    pub fn reconcile(&self, settings: &Settings) -> ReconcileSettings {
        ReconcileSettings {
            min_score: self.min_match_score.unwrap_or(settings.reconcile.min_score),
        }
    }

    pub fn edge_window(&self, settings: &Settings) -> EdgeWindow {
        self.edge_window.unwrap_or(settings.edge_window)
    }

    pub fn stake(&self, settings: &Settings) -> StakeSettings {
        let mut stake = settings.stake;
        if let Some(fraction) = self.kelly_fraction {
            stake.kelly_fraction = fraction;
        }
        stake
    }
}

pub static BUILTIN_CATALOGUE: Lazy<Vec<CompetitionConfig>> = Lazy::new(|| {
    let football: &[(&str, &str, f64)] = &[
        ("soccer_epl", "Premier League (ENG)", 0.25),
        ("soccer_efl_champ", "Championship (ENG)", 0.20),
        ("soccer_england_league1", "League 1 (ENG)", 0.18),
        ("soccer_england_league2", "League 2 (ENG)", 0.15),
        ("soccer_germany_bundesliga", "Bundesliga (GER)", 0.30),
        ("soccer_germany_bundesliga2", "Bundesliga 2 (GER)", 0.25),
        ("soccer_spain_la_liga", "La Liga (ESP)", 0.28),
        ("soccer_spain_segunda_division", "La Liga 2 (ESP)", 0.20),
        ("soccer_italy_serie_a", "Serie A (ITA)", 0.22),
        ("soccer_italy_serie_b", "Serie B (ITA)", 0.18),
        ("soccer_france_ligue_one", "Ligue 1 (FRA)", 0.25),
        ("soccer_france_ligue_two", "Ligue 2 (FRA)", 0.20),
        ("soccer_netherlands_eredivisie", "Eredivisie (NED)", 0.30),
        ("soccer_belgium_first_division", "Pro League (BEL)", 0.28),
        ("soccer_scotland_premier_league", "Premiership (SCO)", 0.35),
        ("soccer_turkey_super_league", "Super Lig (TUR)", 0.32),
    ];
    let hockey: &[(&str, &str, f64)] = &[
        ("icehockey_nhl", "NHL (USA)", 0.15),
        ("icehockey_czech_extraliga", "Extraliga (CZE)", 0.28),
        ("icehockey_slovakia_extraliga", "Extraliga (SVK)", 0.35),
        ("icehockey_germany_del", "DEL (GER)", 0.25),
        ("icehockey_sweden_shl", "SHL (SWE)", 0.22),
        ("icehockey_finland_liiga", "Liiga (FIN)", 0.20),
    ];

    let mut out = Vec::new();
    for (key, name, ha) in football {
        out.push(
            CompetitionConfig::new(key, name, SportKind::Football)
                .with_home_advantage(HomeAdvantage::Additive(*ha)),
        );
    }
    for (key, name, ha) in hockey {
        let mut cfg = CompetitionConfig::new(key, name, SportKind::IceHockey)
            .with_home_advantage(HomeAdvantage::Additive(*ha));
        // Hockey team names differ more between feeds (city vs. nickname).
        cfg.min_match_score = Some(65);
        out.push(cfg);
    }

    let mut nba = CompetitionConfig::new("basketball_nba", "NBA (USA)", SportKind::Basketball)
        .with_home_advantage(HomeAdvantage::Multiplicative(1.025));
    nba.min_match_score = Some(70);
    out.push(nba);

    let mut atp = CompetitionConfig::new("tennis_atp", "ATP Tour", SportKind::Tennis);
    atp.edge_window = Some(EdgeWindow {
        min_edge: 0.07,
        max_edge: 0.35,
    });
    atp.kelly_fraction = Some(0.15);
    out.push(atp);

    out
});

pub fn builtin_catalogue() -> Vec<CompetitionConfig> {
    BUILTIN_CATALOGUE.clone()
}

pub fn load_catalogue(path: &Path) -> Result<Vec<CompetitionConfig>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read catalogue {}", path.display()))?;
    serde_json::from_str::<Vec<CompetitionConfig>>(&raw)
        .with_context(|| format!("invalid catalogue json in {}", path.display()))
}

pub fn save_catalogue(path: &Path, catalogue: &[CompetitionConfig]) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(catalogue).context("serialize catalogue")?;
    fs::write(&tmp, json).context("write catalogue")?;
    fs::rename(&tmp, path).context("swap catalogue")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_defaults_select_model_path() {
        assert_eq!(SportKind::Football.default_model(), RatingModelKind::GoalBased);
        assert_eq!(SportKind::IceHockey.default_model(), RatingModelKind::GoalBased);
        assert_eq!(SportKind::Tennis.default_model(), RatingModelKind::WinRateBased);
        assert_eq!(SportKind::IceHockey.default_total_line(), 5.5);
    }

    #[test]
    fn overrides_fall_back_to_global_settings() {
        let settings = Settings::default();
        let epl = builtin_catalogue()
            .into_iter()
            .find(|c| c.key == "soccer_epl")
            .expect("epl in catalogue");
        assert_eq!(epl.reconcile(&settings).min_score, 75);
        assert_eq!(epl.edge_window(&settings), settings.edge_window);
        assert_eq!(epl.home_advantage, HomeAdvantage::Additive(0.25));

        let atp = builtin_catalogue()
            .into_iter()
            .find(|c| c.key == "tennis_atp")
            .expect("atp in catalogue");
        assert_eq!(atp.model(), RatingModelKind::WinRateBased);
        assert!((atp.stake(&settings).kelly_fraction - 0.15).abs() < 1e-12);
        assert!((atp.edge_window(&settings).min_edge - 0.07).abs() < 1e-12);
    }

    #[test]
    fn catalogue_json_accepts_minimal_entries() {
        let raw = r#"[{"key":"x","name":"X League","sport":"ice_hockey","home_advantage":{"multiplicative":1.1}}]"#;
        let parsed: Vec<CompetitionConfig> = serde_json::from_str(raw).expect("valid json");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].max_goals(), 15);
        assert!((parsed[0].home_advantage.apply(2.0) - 2.2).abs() < 1e-12);
    }

    #[test]
    fn builtin_keys_are_unique() {
        let cat = builtin_catalogue();
        let mut keys: Vec<&str> = cat.iter().map(|c| c.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), cat.len());
    }
}
