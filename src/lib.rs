pub mod aggregate;
pub mod catalogue;
pub mod edge;
pub mod error;
pub mod feed_files;
pub mod history;
pub mod logging;
pub mod model;
pub mod odds;
pub mod pipeline;
pub mod predict;
pub mod ratings;
pub mod reconcile;
pub mod settings;
pub mod synthetic;
pub mod win_rate;

pub use aggregate::{Opportunity, aggregate};
pub use catalogue::{CompetitionConfig, HomeAdvantage, RatingModelKind, SportKind};
pub use edge::{EdgeVerdict, Evaluation, evaluate};
pub use error::ScanError;
pub use pipeline::{CompetitionFeed, ScanReport, scan_all, scan_competition};
pub use settings::Settings;
