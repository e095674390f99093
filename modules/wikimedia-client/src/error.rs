use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikimediaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("MediaWiki API returned status {status}")]
    Api { status: u16 },

    #[error("not a Wikipedia article URL: {0}")]
    InvalidPageUrl(String),
}

pub type Result<T> = std::result::Result<T, WikimediaError>;
