//! Rule-based text signal extractors.
//!
//! Pure functions from free text to candidate signals. Callers pass text
//! already lowercased where the function name says `lowered`.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)eu sou ([^.]+)").expect("identity pattern is valid"));

static ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)me chama de ([^.,!]+)").expect("alias pattern is valid"));

/// Minimum token length (in characters) considered for topic detection.
pub const MIN_KEYWORD_LEN: usize = 4;

const EMOTION_TABLE: &[(&str, &str)] = &[
    ("ansiedade", "ansiedade"),
    ("medo", "medo"),
    ("feliz", "ânimo positivo"),
    ("triste", "tristeza"),
    ("animado", "motivação"),
];

const DOMAIN_MENTIONS: &[&str] = &[
    "carreira",
    "trabalho",
    "saúde",
    "relacionamento",
    "estudo",
    "finanças",
    "dinheiro",
];

/// Phrases that mark a recurring behaviour.
pub const HABIT_MARKERS: &[&str] = &["todo dia", "todos os dias", "diariamente", "sempre", "costumo"];

/// Phrases that mark a stated preference.
pub const PREFERENCE_MARKERS: &[&str] = &["prefiro", "gosto", "amo", "curto", "favorito"];

/// Split lowercased text on anything that is not a letter.
pub fn tokenize(lowered: &str) -> Vec<&str> {
    lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Most frequent long token, reported only when it appears more than once.
///
/// Ties go to the token seen first.
pub fn top_keyword(tokens: &[&str]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for token in tokens {
        if token.chars().count() < MIN_KEYWORD_LEN {
            continue;
        }
        match counts.iter_mut().find(|(t, _)| t == token) {
            Some((_, count)) => *count += 1,
            None => counts.push((token, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (token, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((token, count));
        }
    }

    best.filter(|(_, count)| *count > 1)
        .map(|(token, _)| token.to_string())
}

/// Mood label for the first emotion keyword found.
pub fn detect_emotion(lowered: &str) -> Option<&'static str> {
    EMOTION_TABLE
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, label)| *label)
}

/// Habit label when the text mentions a daily habit or a routine.
pub fn detect_habit(lowered: &str) -> Option<&'static str> {
    if lowered.contains("todo dia") || lowered.contains("diariamente") {
        return Some("Hábito diário mencionado");
    }
    if lowered.contains("rotina") {
        return Some("Rotina desejada");
    }
    None
}

/// Preference label for explicit preference or interest phrasing.
pub fn detect_preference(lowered: &str) -> Option<&'static str> {
    if lowered.contains("prefiro") {
        return Some("Preferência explicitada");
    }
    if lowered.contains("gosto") {
        return Some("Interesse declarado");
    }
    None
}

/// The first life-area word mentioned in the text.
pub fn detect_domain_mention(lowered: &str) -> Option<&'static str> {
    DOMAIN_MENTIONS
        .iter()
        .find(|word| lowered.contains(*word))
        .copied()
}

/// Habit markers present in the text, in table order.
pub fn habit_markers(lowered: &str) -> Vec<&'static str> {
    HABIT_MARKERS
        .iter()
        .filter(|marker| lowered.contains(*marker))
        .copied()
        .collect()
}

/// Preference markers present in the text, in table order.
pub fn preference_markers(lowered: &str) -> Vec<&'static str> {
    PREFERENCE_MARKERS
        .iter()
        .filter(|marker| lowered.contains(*marker))
        .copied()
        .collect()
}

/// Self-descriptions introduced by "eu sou".
pub fn extract_identity_statements(message: &str) -> Vec<String> {
    IDENTITY_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .into_iter()
        .collect()
}

/// Nicknames introduced by "me chama de".
pub fn extract_aliases(message: &str) -> Vec<String> {
    ALIAS_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .into_iter()
        .collect()
}

/// Cut text to `size` characters, appending "..." when something was cut.
pub fn truncate_chars(value: &str, size: usize) -> String {
    if value.chars().count() > size {
        let head: String = value.chars().take(size).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}
