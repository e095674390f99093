use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

use entropia_common::config::AuthorityConfig;
use entropia_common::AuthorityTier;

/// Maps a URL to an authority tier using configured domain lists, path
/// patterns and TLD heuristics. Pure and deterministic; an invalid URL is
/// tertiary, never an error.
pub struct AuthorityClassifier {
    domain_map: BTreeMap<String, AuthorityTier>,
    primary_domains: Vec<String>,
    secondary_domains: Vec<String>,
    path_patterns: Vec<(Regex, AuthorityTier)>,
}

impl AuthorityClassifier {
    pub fn new(config: &AuthorityConfig) -> Self {
        let domain_map = config
            .domain_map
            .iter()
            .map(|(host, tier)| (host.clone(), parse_tier(tier)))
            .collect();

        let mut path_patterns = Vec::new();
        for entry in &config.path_patterns {
            match Regex::new(&entry.pattern) {
                Ok(regex) => path_patterns.push((regex, parse_tier(&entry.tier))),
                Err(e) => warn!(pattern = %entry.pattern, error = %e, "Skipping bad path pattern"),
            }
        }

        AuthorityClassifier {
            domain_map,
            primary_domains: config.primary_domains.clone(),
            secondary_domains: config.secondary_domains.clone(),
            path_patterns,
        }
    }

    /// Ordered rules; first match wins.
    pub fn classify(&self, raw_url: &str) -> AuthorityTier {
        let Ok(parsed) = url::Url::parse(raw_url) else {
            return AuthorityTier::Tertiary;
        };
        let Some(host) = parsed.host_str() else {
            return AuthorityTier::Tertiary;
        };

        if let Some(tier) = self.domain_map.get(host) {
            return *tier;
        }

        if host_matches_any(host, &self.primary_domains) {
            return AuthorityTier::Primary;
        }
        if host_matches_any(host, &self.secondary_domains) {
            return AuthorityTier::Secondary;
        }

        let path = parsed.path();
        for (regex, tier) in &self.path_patterns {
            if regex.is_match(path) {
                return *tier;
            }
        }

        if host.ends_with(".gov") || host.ends_with(".edu") || host.ends_with(".ac.uk") {
            return AuthorityTier::Primary;
        }

        AuthorityTier::Tertiary
    }
}

fn host_matches_any(host: &str, domains: &[String]) -> bool {
    domains
        .iter()
        .any(|d| host == d || host.ends_with(&format!(".{d}")))
}

fn parse_tier(tier: &str) -> AuthorityTier {
    match tier.to_lowercase().as_str() {
        "primary" | "1" => AuthorityTier::Primary,
        "secondary" | "2" => AuthorityTier::Secondary,
        _ => AuthorityTier::Tertiary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entropia_common::config::PathPattern;

    fn classifier() -> AuthorityClassifier {
        AuthorityClassifier::new(&AuthorityConfig::default())
    }

    #[test]
    fn invalid_url_is_tertiary() {
        assert_eq!(classifier().classify("not a url"), AuthorityTier::Tertiary);
        assert_eq!(classifier().classify(""), AuthorityTier::Tertiary);
    }

    #[test]
    fn domain_map_wins_over_lists() {
        let mut config = AuthorityConfig::default();
        config
            .domain_map
            .insert("wikipedia.org".to_string(), "primary".to_string());
        let classifier = AuthorityClassifier::new(&config);
        assert_eq!(
            classifier.classify("https://wikipedia.org/wiki/X"),
            AuthorityTier::Primary
        );
    }

    #[test]
    fn primary_domains_match_exact_and_subdomains() {
        let c = classifier();
        assert_eq!(c.classify("https://gov.uk/guidance"), AuthorityTier::Primary);
        assert_eq!(
            c.classify("https://www.legislation.gov.uk/ukpga/2018/12"),
            AuthorityTier::Primary
        );
        assert_eq!(
            c.classify("https://www.nature.com/articles/x"),
            AuthorityTier::Primary
        );
    }

    #[test]
    fn secondary_domains_match() {
        let c = classifier();
        assert_eq!(
            c.classify("https://en.wikipedia.org/wiki/Laksa"),
            AuthorityTier::Secondary
        );
        assert_eq!(
            c.classify("https://www.bbc.co.uk/news/article"),
            AuthorityTier::Secondary
        );
    }

    #[test]
    fn suffix_matching_requires_label_boundary() {
        // "notgov.uk" must not match "gov.uk".
        let c = classifier();
        assert_eq!(c.classify("https://notgov.uk/page"), AuthorityTier::Tertiary);
    }

    #[test]
    fn path_patterns_apply_after_domain_lists() {
        let config = AuthorityConfig {
            path_patterns: vec![PathPattern {
                pattern: r"^/statutes/".to_string(),
                tier: "primary".to_string(),
            }],
            ..Default::default()
        };
        let classifier = AuthorityClassifier::new(&config);
        assert_eq!(
            classifier.classify("https://random.example/statutes/ch1"),
            AuthorityTier::Primary
        );
        assert_eq!(
            classifier.classify("https://random.example/blog/ch1"),
            AuthorityTier::Tertiary
        );
    }

    #[test]
    fn tld_heuristics() {
        let c = classifier();
        assert_eq!(c.classify("https://www.usda.gov/food"), AuthorityTier::Primary);
        assert_eq!(c.classify("https://www.mit.edu/研究"), AuthorityTier::Primary);
        assert_eq!(c.classify("https://www.ox.ac.uk/about"), AuthorityTier::Primary);
    }

    #[test]
    fn unknown_hosts_default_to_tertiary() {
        assert_eq!(
            classifier().classify("https://myfoodblog.example/laksa"),
            AuthorityTier::Tertiary
        );
    }

    #[test]
    fn bad_path_patterns_are_skipped_not_fatal() {
        let config = AuthorityConfig {
            path_patterns: vec![PathPattern {
                pattern: "([unclosed".to_string(),
                tier: "primary".to_string(),
            }],
            ..Default::default()
        };
        let classifier = AuthorityClassifier::new(&config);
        assert_eq!(
            classifier.classify("https://x.example/page"),
            AuthorityTier::Tertiary
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let c = classifier();
        let url = "https://en.wikipedia.org/wiki/Borscht";
        assert_eq!(c.classify(url), c.classify(url));
    }
}
