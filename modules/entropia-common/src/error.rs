use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntropiaError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("blocked by robots.txt: {0}")]
    RobotsDisallowed(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("scan deadline exceeded")]
    DeadlineExceeded,

    #[error("scan cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),
}
