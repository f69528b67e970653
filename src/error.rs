use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid period format: {0}")]
    PeriodParse(String),

    #[error("Invalid period range: {0}")]
    InvalidPeriod(String),

    #[error("Invalid bucket key: {0}")]
    BucketParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
