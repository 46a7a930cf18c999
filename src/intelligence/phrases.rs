//! Phrase membership shared by every rule-based detector.
//!
//! Haystacks are lowercased once by the caller via [`normalize`]. Two
//! matching modes exist:
//!
//! - [`contains_substring`]: plain containment. Emergency phrases,
//!   contradiction indicators and symptom vocabularies use it, so "chest
//!   pains" still hits "chest pain".
//! - [`contains_phrase`]: a phrase whose first (or last) character is ASCII
//!   alphanumeric must sit on a word boundary at that edge, so "no" does not
//!   fire inside "know". Phrases in scripts without word spacing (Chinese)
//!   match as plain substrings.

/// Lowercase the text for matching.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Whether `phrase` occurs in the normalized `haystack`.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let needs_left = phrase.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let needs_right = phrase
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric());

    haystack.match_indices(phrase).any(|(start, matched)| {
        let end = start + matched.len();
        let left_ok = !needs_left
            || haystack[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = !needs_right
            || haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
        left_ok && right_ok
    })
}

/// First phrase (in list order) present in the haystack.
pub fn first_match<'a>(haystack: &str, phrases: &[&'a str]) -> Option<&'a str> {
    phrases.iter().copied().find(|p| contains_phrase(haystack, p))
}

pub fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    first_match(haystack, phrases).is_some()
}

/// Whether `phrase` occurs anywhere in the normalized `haystack`.
pub fn contains_substring(haystack: &str, phrase: &str) -> bool {
    !phrase.is_empty() && haystack.contains(phrase)
}

/// First phrase (in list order) contained in the haystack.
pub fn first_substring<'a>(haystack: &str, phrases: &[&'a str]) -> Option<&'a str> {
    phrases.iter().copied().find(|p| contains_substring(haystack, p))
}

pub fn contains_any_substring(haystack: &str, phrases: &[&str]) -> bool {
    first_substring(haystack, phrases).is_some()
}
