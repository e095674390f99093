//! Single-URL scan orchestration: cache, robots gate, rate-limited fetch,
//! adapter dispatch, concurrent validation, scoring, TLS and Wikipedia
//! signals, cache write, optional LLM summary.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use scraper::Html;
use tracing::{debug, info, warn};

use entropia_common::{
    Claim, Config, EntropiaError, Evidence, LlmSummary, Principles, Report, Severity, Signal,
    SignalType, TlsInfo,
};
use wikimedia_client::RevisionsClient;

use crate::cache::{cache_key, Cache, LayeredCache};
use crate::cancel::CancelToken;
use crate::extract::text::visible_text;
use crate::extract::Registry;
use crate::fetcher::{FetchResult, Fetcher, PageFetcher};
use crate::limiter::HostLimiter;
use crate::robots::RobotsChecker;
use crate::score::Scorer;
use crate::summarize::Summarizer;
use crate::validate::{AuthorityClassifier, Validator};
use crate::wiki::{
    detect_historical_entities, edit_war_signal, historical_entity_signals, EditWarDetector,
    RevisionSource,
};

const WIKI_DEADLINE: Duration = Duration::from_secs(30);
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Seam for the batch engine; tests scan through mocks.
#[async_trait]
pub trait UrlScanner: Send + Sync {
    async fn scan(&self, cancel: &CancelToken, url: &str) -> Result<Report, EntropiaError>;
}

pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    registry: Registry,
    validator: Validator,
    scorer: Scorer,
    cache: Option<Arc<dyn Cache>>,
    robots: Option<Arc<RobotsChecker>>,
    limiter: Arc<HostLimiter>,
    summarizer: Option<Summarizer>,
    revisions: Option<Arc<dyn RevisionSource>>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(HostLimiter::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst_size,
        ));
        let classifier = Arc::new(AuthorityClassifier::new(&config.authority));
        let validator = Validator::new(
            &config.http,
            classifier,
            config.concurrency.validation_workers,
        )
        .with_limiter(limiter.clone());

        let cache: Option<Arc<dyn Cache>> = if config.cache.enabled {
            Some(Arc::new(LayeredCache::new(
                config.cache.memory_entries,
                Duration::from_secs(config.cache.ttl_secs),
                config.cache.resolved_dir(),
            )))
        } else {
            None
        };

        let summarizer = match Summarizer::from_config(&config.llm) {
            Ok(summarizer) => summarizer,
            Err(e) => {
                warn!(error = %e, "LLM provider unavailable, summaries disabled");
                None
            }
        };

        let revisions: Arc<dyn RevisionSource> = Arc::new(RevisionsClient::new(
            &config.http.user_agent,
            WIKI_DEADLINE,
        ));

        Pipeline {
            fetcher: Arc::new(Fetcher::new(&config.http)),
            registry: Registry::new(),
            validator,
            scorer: Scorer::new(config.scoring.conflict_terms.clone()),
            cache,
            robots: Some(Arc::new(RobotsChecker::new(
                &config.http.user_agent,
                ROBOTS_TIMEOUT,
            ))),
            limiter,
            summarizer,
            revisions: Some(revisions),
            config,
        }
    }

    // Builder-style overrides, used by embedders and tests.

    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<dyn Cache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn without_robots(mut self) -> Self {
        self.robots = None;
        self
    }

    pub fn with_revision_source(mut self, source: Option<Arc<dyn RevisionSource>>) -> Self {
        self.revisions = source;
        self
    }

    /// Scan one URL under the overall deadline.
    pub async fn scan(&self, cancel: &CancelToken, url: &str) -> Result<Report, EntropiaError> {
        let deadline = Duration::from_secs(self.config.http.timeout_secs);
        match tokio::time::timeout(deadline, self.scan_inner(cancel, url)).await {
            Ok(result) => result,
            Err(_) => Err(EntropiaError::DeadlineExceeded),
        }
    }

    async fn scan_inner(&self, cancel: &CancelToken, url: &str) -> Result<Report, EntropiaError> {
        if cancel.is_cancelled() {
            return Err(EntropiaError::Cancelled);
        }

        let key = cache_key(url);
        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(&key) {
                if let Ok(report) = serde_json::from_slice::<Report>(&bytes) {
                    info!(url, "Cache hit");
                    return Ok(report);
                }
            }
        }

        if let Some(robots) = &self.robots {
            let (allowed, crawl_delay) = robots.can_fetch(url).await?;
            if !allowed {
                return Err(EntropiaError::RobotsDisallowed(url.to_string()));
            }
            if let Some(delay) = crawl_delay {
                if let Some(host) = url::Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                {
                    let rps = 1.0 / delay.as_secs_f64().max(0.001);
                    self.limiter.set_host(&host, rps, 1).await;
                }
            }
        }

        self.limiter.wait(cancel, url).await?;

        let fetch = self
            .fetcher
            .fetch_page(url)
            .await
            .map_err(|e| EntropiaError::Fetch(e.to_string()))?;

        let tls_signals = tls_signals(&fetch.final_url, &fetch.meta.tls);

        let (claims, mut evidence, page_text) = self.extract(&fetch);
        info!(
            url,
            claims = claims.len(),
            evidence = evidence.len(),
            "Extraction complete"
        );

        let validation = self.validator.validate(cancel, &evidence).await;
        for (ev, result) in evidence.iter_mut().zip(&validation) {
            ev.authority = Some(result.authority);
        }

        let mut score = self.scorer.calculate(&claims, &evidence, &validation);
        score.signals.extend(tls_signals);

        if is_wikipedia(&fetch.final_url) {
            if let Some(source) = &self.revisions {
                let wiki = self.wiki_signals(source.clone(), &fetch.final_url, &page_text);
                match tokio::time::timeout(WIKI_DEADLINE, wiki).await {
                    Ok(signals) => score.signals.extend(signals),
                    Err(_) => debug!(url, "Wikipedia conflict detection timed out"),
                }
            }
        }

        let mut report = Report {
            subject: fetch.subject.clone(),
            source_url: fetch.final_url.clone(),
            fetched_at: Utc::now(),
            fetch_meta: fetch.meta.clone(),
            claims,
            evidence,
            validation,
            score,
            principles: Principles::default(),
            llm: None,
        };

        // The cached artifact is the pre-LLM report; a write failure never
        // fails the scan.
        if let Some(cache) = &self.cache {
            match serde_json::to_vec(&report) {
                Ok(bytes) => {
                    let ttl = Duration::from_secs(self.config.cache.ttl_secs);
                    if let Err(e) = cache.set(&key, &bytes, ttl) {
                        warn!(url, error = %e, "Cache write failed");
                    }
                }
                Err(e) => warn!(url, error = %e, "Report serialization for cache failed"),
            }
        }

        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize(&report).await {
                Ok(summary) => report.llm = Some(summary),
                Err(e) => {
                    warn!(url, error = %e, "LLM summary failed");
                    report.llm = Some(LlmSummary {
                        enabled: false,
                        provider: summarizer.provider_name().to_string(),
                        model: summarizer.model_name().to_string(),
                        strict_evidence: true,
                        warnings: vec![format!("summary generation failed: {e}")],
                        ..Default::default()
                    });
                }
            }
        }

        info!(
            url,
            index = report.score.index,
            confidence = %report.score.confidence,
            "Scan complete"
        );
        Ok(report)
    }

    /// Adapter dispatch and extraction. Synchronous on purpose: the parsed
    /// DOM must not live across an await.
    fn extract(&self, fetch: &FetchResult) -> (Vec<Claim>, Vec<Evidence>, String) {
        let doc = Html::parse_document(&fetch.html);
        let adapter = self
            .registry
            .find(&fetch.final_url, &fetch.meta.content_type);
        debug!(adapter = adapter.name(), url = %fetch.final_url, "Adapter dispatched");

        let claims = adapter.extract_claims(&doc, &fetch.final_url);
        let evidence = adapter.extract_evidence(&doc, &fetch.final_url);
        let page_text = visible_text(&doc);

        (claims, evidence, page_text)
    }

    async fn wiki_signals(
        &self,
        source: Arc<dyn RevisionSource>,
        page_url: &str,
        page_text: &str,
    ) -> Vec<Signal> {
        let mut signals = Vec::new();

        let detector = EditWarDetector::with_source(source);
        if let Some(indicators) = detector.detect(page_url).await {
            if let Some(signal) = edit_war_signal(&indicators) {
                signals.push(signal);
            }
        }

        let matches = detect_historical_entities(page_text, Utc::now().year());
        signals.extend(historical_entity_signals(&matches));

        signals
    }
}

#[async_trait]
impl UrlScanner for Pipeline {
    async fn scan(&self, cancel: &CancelToken, url: &str) -> Result<Report, EntropiaError> {
        Pipeline::scan(self, cancel, url).await
    }
}

fn is_wikipedia(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with("wikipedia.org")))
        .unwrap_or(false)
}

/// Signals derived from the page's TLS posture. Informational for the report;
/// they never adjust the index. Order: no_tls, expired, self_signed, mismatch.
pub fn tls_signals(url: &str, tls: &TlsInfo) -> Vec<Signal> {
    let mut signals = Vec::new();

    if !tls.enabled {
        let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        data.insert("url".into(), url.into());
        signals.push(Signal {
            kind: SignalType::NoTls,
            severity: Severity::Warning,
            description: "Page served over HTTP without encryption".to_string(),
            data,
        });
        return signals;
    }

    if tls.expired {
        let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        data.insert("subject".into(), tls.subject.clone().into());
        data.insert("not_before".into(), tls.not_before.clone().into());
        data.insert("not_after".into(), tls.not_after.clone().into());
        signals.push(Signal {
            kind: SignalType::ExpiredCertificate,
            severity: Severity::Critical,
            description: "TLS certificate expired or not yet valid".to_string(),
            data,
        });
    }

    if tls.self_signed {
        let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        data.insert("subject".into(), tls.subject.clone().into());
        data.insert("issuer".into(), tls.issuer.clone().into());
        signals.push(Signal {
            kind: SignalType::SelfSignedCertificate,
            severity: Severity::Warning,
            description: "TLS certificate is self-signed".to_string(),
            data,
        });
    }

    if tls.domain_mismatch {
        let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        data.insert("url".into(), url.into());
        data.insert("dns_names".into(), serde_json::json!(tls.dns_names));
        signals.push(Signal {
            kind: SignalType::CertificateMismatch,
            severity: Severity::Critical,
            description: "TLS certificate domain doesn't match URL".to_string(),
            data,
        });
    }

    signals
}
