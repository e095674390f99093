//! Report rendering: JSON for machines, Markdown for humans, a short stdout
//! summary for the terminal. The LLM summary always renders to its own file,
//! never inline with the scored report.

use std::path::Path;

use anyhow::{Context, Result};

use entropia_common::{LlmSummary, Report, Severity};

pub fn render_json(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn render_markdown(report: &Report, path: &Path, include_footer: bool) -> Result<()> {
    let md = markdown(report, include_footer);
    std::fs::write(path, md).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn render_llm_markdown(summary: &LlmSummary, path: &Path) -> Result<()> {
    let mut md = String::new();
    md.push_str("# LLM Summary\n\n");
    md.push_str(&format!(
        "> Generated by {}/{} — informational only, does not affect the support index.\n\n",
        summary.provider, summary.model
    ));
    md.push_str(&summary.summary_md);
    md.push('\n');
    if !summary.warnings.is_empty() {
        md.push_str("\n## Warnings\n\n");
        for warning in &summary.warnings {
            md.push_str(&format!("- {warning}\n"));
        }
    }
    std::fs::write(path, md).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn markdown(report: &Report, include_footer: bool) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Evidence Support Report: {}\n\n", report.subject));
    md.push_str(&format!("- **Source**: {}\n", report.source_url));
    md.push_str(&format!(
        "- **Scanned**: {}\n",
        report.fetched_at.format("%Y-%m-%d %H:%M UTC")
    ));
    md.push_str(&format!(
        "- **Support index**: {}/100 (confidence: {})\n",
        report.score.index, report.score.confidence
    ));
    md.push_str(&format!(
        "- **Claims**: {} · **Evidence links**: {}\n\n",
        report.claims.len(),
        report.evidence.len()
    ));

    md.push_str("## Signals\n\n");
    md.push_str("| Severity | Signal | Detail |\n|---|---|---|\n");
    for signal in &report.score.signals {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            severity_marker(signal.severity),
            serde_json::to_value(signal.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            signal.description.replace('|', "\\|")
        ));
    }
    md.push('\n');

    if !report.validation.is_empty() {
        let accessible = report.validation.iter().filter(|v| v.is_accessible).count();
        let dead = report.validation.iter().filter(|v| v.is_dead).count();
        let stale = report.validation.iter().filter(|v| v.is_stale).count();
        md.push_str("## Evidence validation\n\n");
        md.push_str(&format!(
            "{} checked: {} accessible, {} dead, {} stale.\n\n",
            report.validation.len(),
            accessible,
            dead,
            stale
        ));

        let dead_links: Vec<_> = report.validation.iter().filter(|v| v.is_dead).collect();
        if !dead_links.is_empty() {
            md.push_str("Dead links:\n\n");
            for v in dead_links.iter().take(20) {
                md.push_str(&format!("- {}\n", v.url));
            }
            md.push('\n');
        }
    }

    if !report.claims.is_empty() {
        md.push_str("## Extracted claims\n\n");
        for claim in report.claims.iter().take(25) {
            md.push_str(&format!("- {}\n", claim.text));
        }
        if report.claims.len() > 25 {
            md.push_str(&format!("- … and {} more\n", report.claims.len() - 25));
        }
        md.push('\n');
    }

    if include_footer {
        md.push_str("---\n\n");
        md.push_str(
            "*Non-normative: this report measures how well claims are supported by cited \
             sources. It does not determine what is true.*\n",
        );
    }

    md
}

/// One-screen summary on stdout after a scan.
pub fn print_summary(report: &Report) {
    println!();
    println!("  {} — {}", report.subject, report.source_url);
    println!(
        "  Support index: {}/100 (confidence: {})",
        report.score.index, report.score.confidence
    );
    println!(
        "  Claims: {}  Evidence: {}  Validated: {}",
        report.claims.len(),
        report.evidence.len(),
        report.validation.len()
    );
    for signal in &report.score.signals {
        if signal.severity != Severity::Info {
            println!(
                "  [{}] {}",
                signal.severity, signal.description
            );
        }
    }
    println!();
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "⚠ warning",
        Severity::Critical => "✗ critical",
    }
}

/// Make a report subject safe to use as a file name.
pub fn sanitize_filename(subject: &str) -> String {
    let mut name: String = subject
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ' ' => '-',
            other => other,
        })
        .collect();
    if name.len() > 100 {
        name.truncate(100);
    }
    if name.is_empty() {
        name.push_str("report");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use entropia_common::{Confidence, FetchMeta, Principles, Score};

    fn report() -> Report {
        Report {
            subject: "Laksa".to_string(),
            source_url: "https://en.wikipedia.org/wiki/Laksa".to_string(),
            fetched_at: Utc::now(),
            fetch_meta: FetchMeta::default(),
            claims: vec![],
            evidence: vec![],
            validation: vec![],
            score: Score {
                index: 42,
                confidence: Confidence::Low,
                conflict: false,
                signals: vec![],
            },
            principles: Principles::default(),
            llm: None,
        }
    }

    #[test]
    fn json_rendering_writes_stable_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        render_json(&report(), &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["score"]["index"], 42);
        assert_eq!(value["score"]["confidence"], "low");
        assert_eq!(value["principles"]["non_normative"], true);
    }

    #[test]
    fn markdown_contains_index_and_footer() {
        let md = markdown(&report(), true);
        assert!(md.contains("42/100"));
        assert!(md.contains("Non-normative"));

        let without = markdown(&report(), false);
        assert!(!without.contains("Non-normative"));
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("Laksa Origin"), "Laksa-Origin");
        assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_filename(""), "report");
        assert!(sanitize_filename(&"x".repeat(300)).len() <= 100);
    }
}
