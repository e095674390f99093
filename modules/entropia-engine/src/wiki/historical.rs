use std::collections::BTreeMap;

use entropia_common::{Severity, Signal, SignalType};

/// Entities must have been gone strictly longer than this to be flagged.
const MIN_YEARS_DEFUNCT: i32 = 30;

/// Half-width of the context window captured around each mention.
const CONTEXT_CHARS: usize = 50;

/// A state that no longer exists. Mentions of these in origin narratives are
/// a common source of identity disputes.
#[derive(Debug, Clone)]
pub struct HistoricalEntity {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub end_year: i32,
    pub description: &'static str,
}

/// Fixed catalog. Additions need matching fixture updates.
pub static HISTORICAL_ENTITIES: [HistoricalEntity; 8] = [
    HistoricalEntity {
        name: "Kyivan Rus",
        aliases: &["Киевская Русь", "Kievan Rus", "Kievan Rus'", "Kiev Rus"],
        end_year: 1240,
        description: "Medieval East Slavic state (9th-13th century)",
    },
    HistoricalEntity {
        name: "USSR",
        aliases: &["Soviet Union", "СССР", "Советский Союз", "CCCP"],
        end_year: 1991,
        description: "Soviet Union (1922-1991)",
    },
    HistoricalEntity {
        name: "Yugoslavia",
        aliases: &["Jugoslavija", "Југославија", "SFRY", "SFR Yugoslavia"],
        end_year: 1992,
        description: "Socialist Federal Republic of Yugoslavia (1945-1992)",
    },
    HistoricalEntity {
        name: "Czechoslovakia",
        aliases: &["Československo", "ČSSR"],
        end_year: 1993,
        description: "Czechoslovakia (1918-1993)",
    },
    HistoricalEntity {
        name: "Ottoman Empire",
        aliases: &["Osmanlı", "Османская империя"],
        end_year: 1922,
        description: "Ottoman Empire (1299-1922)",
    },
    HistoricalEntity {
        name: "Austria-Hungary",
        aliases: &["Austro-Hungarian Empire", "Österreich-Ungarn"],
        end_year: 1918,
        description: "Austria-Hungary (1867-1918)",
    },
    HistoricalEntity {
        name: "Polish-Lithuanian Commonwealth",
        aliases: &["Commonwealth", "Rzeczpospolita Obojga Narodów"],
        end_year: 1795,
        description: "Polish-Lithuanian Commonwealth (1569-1795)",
    },
    HistoricalEntity {
        name: "Grand Duchy of Lithuania",
        aliases: &["Lietuvos Didžioji Kunigaikštystė"],
        end_year: 1795,
        description: "Grand Duchy of Lithuania (1236-1795)",
    },
];

#[derive(Debug, Clone)]
pub struct HistoricalEntityMatch {
    pub entity: &'static HistoricalEntity,
    /// How many of the entity's names (primary + aliases) appear.
    pub occurrences: usize,
    /// Short context windows around the first mention of each matched name.
    pub contexts: Vec<String>,
}

/// Scan page text for defunct states gone strictly more than 30 years as of
/// `current_year`. Case-insensitive.
pub fn detect_historical_entities(text: &str, current_year: i32) -> Vec<HistoricalEntityMatch> {
    let text_lower = text.to_lowercase();
    let mut matches = Vec::new();

    for entity in &HISTORICAL_ENTITIES {
        if current_year - entity.end_year <= MIN_YEARS_DEFUNCT {
            continue;
        }

        let mut occurrences = 0;
        let mut contexts = Vec::new();

        for name in std::iter::once(entity.name).chain(entity.aliases.iter().copied()) {
            let name_lower = name.to_lowercase();
            if let Some(idx) = text_lower.find(&name_lower) {
                occurrences += 1;
                contexts.push(context_window(text, idx, name_lower.len()));
            }
        }

        if occurrences > 0 {
            matches.push(HistoricalEntityMatch {
                entity,
                occurrences,
                contexts,
            });
        }
    }

    matches
}

/// Signals for the matches: one per entity, carrying the record, match count
/// and contexts.
pub fn historical_entity_signals(matches: &[HistoricalEntityMatch]) -> Vec<Signal> {
    matches
        .iter()
        .map(|m| {
            let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
            data.insert("entity".into(), m.entity.name.into());
            data.insert("end_year".into(), m.entity.end_year.into());
            data.insert("description".into(), m.entity.description.into());
            data.insert("occurrences".into(), m.occurrences.into());
            data.insert("contexts".into(), serde_json::json!(m.contexts));

            Signal {
                kind: SignalType::HistoricalEntity,
                severity: Severity::Warning,
                description: format!(
                    "References {} (dissolved {})",
                    m.entity.name, m.entity.end_year
                ),
                data,
            }
        })
        .collect()
}

/// Up to 50 chars either side of the mention, clamped to char boundaries.
fn context_window(text: &str, byte_idx: usize, name_len: usize) -> String {
    let start = floor_char_boundary(text, byte_idx.saturating_sub(CONTEXT_CHARS));
    let end = ceil_char_boundary(text, (byte_idx + name_len + CONTEXT_CHARS).min(text.len()));
    text[start..end].trim().to_string()
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
