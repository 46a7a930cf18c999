use std::collections::BTreeMap;

use crate::intelligence::phrases::{contains_any, normalize};
use crate::models::enums::ConfidenceLevel;

/// Bucket scores and level cut-offs.
pub mod thresholds {
    /// Empty or whitespace-only value.
    pub const EMPTY: f32 = 0.0;

    /// Value hedged with an uncertainty marker.
    pub const UNCERTAIN: f32 = 0.6;

    /// Short plain value.
    pub const SHORT: f32 = 0.7;

    /// Plain value of at least `MIN_DETAILED_CHARS` characters.
    pub const DETAILED: f32 = 0.85;

    /// Value carrying a certainty marker.
    pub const CERTAIN: f32 = 0.9;

    pub const MIN_DETAILED_CHARS: usize = 5;

    /// At or above: high confidence.
    pub const HIGH: f32 = 0.8;

    /// At or above: medium confidence.
    pub const MEDIUM: f32 = 0.5;
}

const CERTAIN_MARKERS: &[&str] = &[
    "already",
    "definitely",
    "certainly",
    "always",
    "for sure",
    "constantly",
    "确实",
    "已经",
    "一直",
    "肯定",
    "一定",
];

const UNCERTAIN_MARKERS: &[&str] = &[
    "maybe",
    "perhaps",
    "probably",
    "seems",
    "might",
    "not sure",
    "i think",
    "可能",
    "大概",
    "好像",
    "似乎",
    "不太确定",
];

/// Rates how firmly a field value was stated.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score in [0, 1]. Certainty markers beat uncertainty markers, which beat length.
    pub fn score(&self, text: &str, _field_name: &str) -> f32 {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return thresholds::EMPTY;
        }

        let normalized = normalize(trimmed);
        if contains_any(&normalized, CERTAIN_MARKERS) {
            return thresholds::CERTAIN;
        }
        if contains_any(&normalized, UNCERTAIN_MARKERS) {
            return thresholds::UNCERTAIN;
        }

        if trimmed.chars().count() >= thresholds::MIN_DETAILED_CHARS {
            thresholds::DETAILED
        } else {
            thresholds::SHORT
        }
    }

    pub fn score_batch(&self, values: &BTreeMap<String, String>) -> BTreeMap<String, f32> {
        values
            .iter()
            .map(|(field, value)| (field.clone(), self.score(value, field)))
            .collect()
    }

    pub fn level_of(score: f32) -> ConfidenceLevel {
        if score >= thresholds::HIGH {
            ConfidenceLevel::High
        } else if score >= thresholds::MEDIUM {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}
