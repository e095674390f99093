//! Batch engine: a worker pool multiplexing the single-URL pipeline over an
//! input list. One outcome per accepted job, always — errors and
//! cancellations are outcomes, not omissions.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use entropia_common::{EntropiaError, Report};

use crate::cancel::CancelToken;
use crate::pipeline::UrlScanner;

/// Result of one URL's scan within a batch.
#[derive(Debug)]
pub struct ScanOutcome {
    pub url: String,
    pub report: Option<Report>,
    pub error: Option<String>,
}

pub struct BatchProcessor {
    scanner: Arc<dyn UrlScanner>,
    concurrency: usize,
    cancel: CancelToken,
}

impl BatchProcessor {
    pub fn new(scanner: Arc<dyn UrlScanner>, concurrency: usize) -> Self {
        BatchProcessor {
            scanner,
            concurrency: concurrency.max(1),
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cancel the shared token: in-flight jobs observe it and produce
    /// cancelled outcomes, pending submissions are dropped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub async fn process_file(&self, path: &Path) -> Result<Vec<ScanOutcome>, EntropiaError> {
        let urls = read_urls_file(path)?;
        info!(count = urls.len(), file = %path.display(), "Loaded URLs");
        Ok(self.process_urls(urls).await)
    }

    pub async fn process_urls(&self, urls: Vec<String>) -> Vec<ScanOutcome> {
        if urls.is_empty() {
            return Vec::new();
        }

        let queue_size = self.concurrency * 2;
        let (job_tx, job_rx) = mpsc::channel::<String>(queue_size);
        let (result_tx, mut result_rx) = mpsc::channel::<ScanOutcome>(queue_size);
        let job_rx = Arc::new(Mutex::new(job_rx));

        for _ in 0..self.concurrency {
            let scanner = self.scanner.clone();
            let cancel = self.cancel.clone();
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            tokio::spawn(worker(scanner, cancel, jobs, results));
        }
        // The collector must see the channel close when the workers finish.
        drop(result_tx);

        // Submit from a side task so workers drain while we feed the queue.
        let submit_cancel = self.cancel.clone();
        let submitter = tokio::spawn(async move {
            for url in urls {
                tokio::select! {
                    sent = job_tx.send(url) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                    _ = submit_cancel.cancelled() => {
                        // Remaining submissions are silently dropped.
                        break;
                    }
                }
            }
            // job_tx drops here, closing the queue.
        });

        let mut outcomes = Vec::new();
        while let Some(outcome) = result_rx.recv().await {
            outcomes.push(outcome);
        }

        let _ = submitter.await;
        info!(
            total = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.error.is_some()).count(),
            "Batch complete"
        );
        outcomes
    }
}

async fn worker(
    scanner: Arc<dyn UrlScanner>,
    cancel: CancelToken,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<ScanOutcome>,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                job = rx.recv() => job,
                // After cancellation, drain what was already queued so every
                // accepted job still gets an outcome.
                _ = cancel.cancelled() => rx.try_recv().ok(),
            }
        };
        let Some(url) = job else {
            break;
        };

        let outcome = if cancel.is_cancelled() {
            ScanOutcome {
                url,
                report: None,
                error: Some("scan cancelled".to_string()),
            }
        } else {
            match scanner.scan(&cancel, &url).await {
                Ok(report) => ScanOutcome {
                    url,
                    report: Some(report),
                    error: None,
                },
                Err(e) => ScanOutcome {
                    url,
                    report: None,
                    error: Some(e.to_string()),
                },
            }
        };

        if results.send(outcome).await.is_err() {
            break;
        }
    }
}

/// URLs from a file, one per line: trimmed, comments and blanks skipped,
/// deduplicated preserving first occurrence.
pub fn read_urls_file(path: &Path) -> Result<Vec<String>, EntropiaError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EntropiaError::Config(format!("read {}: {e}", path.display())))?;

    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if seen.insert(line.to_string()) {
            urls.push(line.to_string());
        }
    }

    if urls.is_empty() {
        warn!(file = %path.display(), "No URLs found in input file");
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use entropia_common::{Confidence, FetchMeta, Principles, Score};

    fn tiny_report(url: &str) -> Report {
        Report {
            subject: url.to_string(),
            source_url: url.to_string(),
            fetched_at: Utc::now(),
            fetch_meta: FetchMeta::default(),
            claims: vec![],
            evidence: vec![],
            validation: vec![],
            score: Score {
                index: 10,
                confidence: Confidence::Low,
                conflict: false,
                signals: vec![],
            },
            principles: Principles::default(),
            llm: None,
        }
    }

    /// Scanner that succeeds unless the URL contains "fail", tracking
    /// concurrent callers.
    struct MockScanner {
        current: AtomicUsize,
        peak: AtomicUsize,
        delay: std::time::Duration,
    }

    impl MockScanner {
        fn new() -> Self {
            MockScanner {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay: std::time::Duration::from_millis(10),
            }
        }

        fn slow() -> Self {
            MockScanner {
                delay: std::time::Duration::from_secs(3600),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl UrlScanner for MockScanner {
        async fn scan(&self, cancel: &CancelToken, url: &str) -> Result<Report, EntropiaError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let finished = cancel.sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            if !finished {
                return Err(EntropiaError::Cancelled);
            }
            if url.contains("fail") {
                return Err(EntropiaError::Fetch("unexpected status: 503".to_string()));
            }
            Ok(tiny_report(url))
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://site{i}.test/")).collect()
    }

    #[tokio::test]
    async fn every_url_gets_exactly_one_outcome() {
        let processor = BatchProcessor::new(Arc::new(MockScanner::new()), 4);
        let input = urls(20);
        let outcomes = processor.process_urls(input.clone()).await;

        assert_eq!(outcomes.len(), input.len());
        let seen: HashSet<_> = outcomes.iter().map(|o| o.url.clone()).collect();
        assert_eq!(seen.len(), input.len());
    }

    #[tokio::test]
    async fn per_url_failures_do_not_abort_the_batch() {
        let processor = BatchProcessor::new(Arc::new(MockScanner::new()), 2);
        let outcomes = processor
            .process_urls(vec![
                "https://ok.test/".to_string(),
                "https://fail.test/".to_string(),
                "https://ok2.test/".to_string(),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.as_deref().unwrap().contains("503"));
        assert_eq!(outcomes.iter().filter(|o| o.report.is_some()).count(), 2);
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_worker_count() {
        let scanner = Arc::new(MockScanner::new());
        let processor = BatchProcessor::new(scanner.clone(), 3);
        processor.process_urls(urls(12)).await;
        assert!(scanner.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn shutdown_flushes_cancelled_outcomes() {
        let processor = Arc::new(BatchProcessor::new(Arc::new(MockScanner::slow()), 2));
        let input = urls(4);

        let runner = processor.clone();
        let handle = {
            let input = input.clone();
            tokio::spawn(async move { runner.process_urls(input).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        processor.shutdown();

        let outcomes = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("batch should drain after shutdown")
            .unwrap();

        // Every accepted job produced an outcome, all of them cancellations.
        assert_eq!(outcomes.len(), input.len());
        for outcome in &outcomes {
            assert!(outcome.report.is_none());
            assert!(outcome.error.is_some());
        }
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let processor = BatchProcessor::new(Arc::new(MockScanner::new()), 2);
        assert!(processor.process_urls(vec![]).await.is_empty());
    }

    #[test]
    fn url_file_is_trimmed_deduped_and_comment_free() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://a.test/").unwrap();
        writeln!(file, "  https://b.test/  ").unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "https://a.test/").unwrap();
        writeln!(file, "https://c.test/").unwrap();

        let urls = read_urls_file(file.path()).unwrap();
        assert_eq!(
            urls,
            vec!["https://a.test/", "https://b.test/", "https://c.test/"]
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_urls_file(Path::new("/nonexistent/urls.txt")).is_err());
    }
}
