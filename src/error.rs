use std::io;

use thiserror::Error;

/// Failures raised by the load, index, scale and join stages.
#[derive(Debug, Error)]
pub enum ChoroplethError {
    #[error("failed to fetch {source_name}: {reason}")]
    Fetch { source_name: String, reason: String },
    #[error("{source_name} responded with HTTP status {status}")]
    HttpStatus { source_name: String, status: u16 },
    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
    #[error("county {fips} has a non-numeric bachelor's percentage: {raw:?}")]
    InvalidPercentage { fips: u32, raw: String },
    #[error("the color palette is empty")]
    EmptyPalette,
    #[error("the statistics dataset contains no counties")]
    EmptyStatistics,
    #[error("all counties share the same percentage ({value}); a quantile scale needs a non-empty range")]
    DegenerateRange { value: f64 },
    #[error("topology has no object named '{0}'")]
    MissingObject(String),
    #[error("geometry references arc {index}, which does not exist")]
    InvalidArc { index: i64 },
    #[error("no statistics found for county {fips}")]
    MissingStatistics { fips: u32 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ChoroplethError>;
