//! Entropia core engine: fetch, extract, validate, score, orchestrate.
//!
//! The pipeline never judges truth. It measures how well a page's claims are
//! supported by the sources it cites and reports the arithmetic behind every
//! number it produces.

pub mod batch;
pub mod cache;
pub mod cancel;
pub mod extract;
pub mod fetcher;
pub mod limiter;
pub mod pipeline;
pub mod retry;
pub mod robots;
pub mod score;
pub mod summarize;
pub mod testing;
pub mod tls;
pub mod validate;
pub mod wiki;

pub use batch::{read_urls_file, BatchProcessor, ScanOutcome};
pub use cancel::CancelToken;
pub use pipeline::{Pipeline, UrlScanner};
