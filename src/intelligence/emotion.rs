use chrono::{DateTime, Utc};

use super::phrases::{contains_any, normalize};
use crate::models::enums::EmotionLevel;

const SEVERE_PHRASES: &[&str] = &[
    "terrified",
    "so scared",
    "panicking",
    "can't stop crying",
    "crying all",
    "haven't slept all night",
    "breaking down",
    "falling apart",
    "太害怕了",
    "恐惧",
    "整晚睡不着",
    "一直在哭",
    "崩溃",
];

const MODERATE_PHRASES: &[&str] = &[
    "scared",
    "afraid",
    "anxious",
    "uneasy",
    "really worried",
    "very worried",
    "害怕",
    "焦虑",
    "不安",
    "很担心",
];

const MILD_PHRASES: &[&str] = &[
    "worried",
    "nervous",
    "concerned",
    "a little tense",
    "担心",
    "有点怕",
    "紧张",
];

/// Mean reply interval (seconds) below which the patient is answering too fast.
pub const SLOW_PACING_THRESHOLD_SECS: f64 = 1.0;

/// Silence (seconds) after which the patient should be nudged.
pub const IDLE_PROMPT_THRESHOLD_SECS: i64 = 120;

/// Per-turn affect screen. Advisory only: never changes phase or collected data.
#[derive(Debug, Clone, Default)]
pub struct EmotionDetector;

impl EmotionDetector {
    pub fn new() -> Self {
        Self
    }

    /// Most severe tier first.
    pub fn detect_level(&self, text: &str) -> EmotionLevel {
        let normalized = normalize(text);
        if contains_any(&normalized, SEVERE_PHRASES) {
            EmotionLevel::Severe
        } else if contains_any(&normalized, MODERATE_PHRASES) {
            EmotionLevel::Moderate
        } else if contains_any(&normalized, MILD_PHRASES) {
            EmotionLevel::Mild
        } else {
            EmotionLevel::Normal
        }
    }

    /// Empathy line for the level; empty for Normal.
    pub fn generate_response(&self, level: EmotionLevel, context: &str) -> String {
        let about = if context.trim().is_empty() {
            String::new()
        } else {
            format!(" about your {}", context.trim())
        };
        match level {
            EmotionLevel::Severe => format!(
                "I can hear how distressing this is for you{about}. Let's take a breath and go one step at a time. \
                 Would you tell me a little more?"
            ),
            EmotionLevel::Moderate => format!(
                "It's understandable to feel worried{about}; many people do when they feel unwell. \
                 Let's go through things together."
            ),
            EmotionLevel::Mild => {
                "I understand this is a concern. A few more details will help your doctor help you.".to_string()
            }
            EmotionLevel::Normal => String::new(),
        }
    }

    /// True when the mean of `recent_intervals` (seconds) is under the threshold.
    pub fn should_slow_pacing(&self, recent_intervals: &[f64]) -> bool {
        if recent_intervals.is_empty() {
            return false;
        }
        let mean = recent_intervals.iter().sum::<f64>() / recent_intervals.len() as f64;
        mean < SLOW_PACING_THRESHOLD_SECS
    }

    pub fn should_prompt_user(&self, last_response: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last_response).num_seconds() > IDLE_PROMPT_THRESHOLD_SECS
    }
}
