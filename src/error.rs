use thiserror::Error;

/// Local, non-fatal failures raised by the scanning core.
///
/// Every variant describes something that makes one competition, one event or
/// one offer unusable. Callers skip the affected unit and keep going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("insufficient data: {results} results, need at least {required}")]
    InsufficientData { results: usize, required: usize },

    /// League means of zero cannot normalise team rates.
    #[error("degenerate baseline: home mean {home_mean:.3}, away mean {away_mean:.3}")]
    DegenerateBaseline { home_mean: f64, away_mean: f64 },

    #[error("no candidate for {name:?} (best {best:?} scored {score})")]
    UnmatchedEntity {
        name: String,
        best: Option<String>,
        score: u8,
    },

    #[error("invalid decimal price {price}")]
    InvalidPrice { price: f64 },
}

impl ScanError {
    /// Both flavours of "not enough evidence to rate this competition".
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            ScanError::InsufficientData { .. } | ScanError::DegenerateBaseline { .. }
        )
    }
}
