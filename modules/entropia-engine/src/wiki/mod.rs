//! Wikipedia conflict detection: edit-war analysis over the revisions API and
//! historical-entity scanning over the page text. Both run only for Wikipedia
//! sources, under their own sub-deadline, and fail silently (no signal).

mod edit_war;
mod historical;

pub use edit_war::{
    analyze_revisions, article_lang, article_title, edit_war_signal, ConflictSeverity,
    EditWarDetector, EditWarIndicators, RevisionSource,
};
pub use historical::{detect_historical_entities, historical_entity_signals, HistoricalEntityMatch};
