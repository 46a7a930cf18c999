use super::phrases::{contains_any, normalize};
use crate::models::enums::Intent;

fn has_emotional_pattern(text: &str) -> bool {
    let patterns = [
        // English
        "scared",
        "afraid",
        "worried",
        "anxious",
        "frightened",
        "nervous",
        "upset",
        "sad",
        // Chinese
        "害怕",
        "担心",
        "焦虑",
        "恐惧",
        "紧张",
        "难过",
    ];
    contains_any(text, &patterns)
}

fn has_complaint_pattern(text: &str) -> bool {
    let patterns = [
        // English
        "annoying",
        "so slow",
        "too slow",
        "too many questions",
        "so many questions",
        "hurry up",
        "waste of time",
        "tedious",
        // Chinese
        "烦",
        "太慢",
        "麻烦",
        "啰嗦",
    ];
    contains_any(text, &patterns)
}

fn has_question_pattern(text: &str) -> bool {
    let patterns = [
        // English
        "why",
        "how do",
        "how does",
        "how can",
        "what is",
        "what's",
        "can you",
        "could you",
        "?",
        // Chinese
        "为什么",
        "怎么",
        "什么",
        "请问",
        "能否",
        "？",
    ];
    contains_any(text, &patterns)
}

fn has_irrelevant_pattern(text: &str) -> bool {
    let patterns = [
        // English
        "weather",
        "movie",
        "weekend",
        "football",
        "lunch",
        "dinner",
        "holiday",
        // Chinese
        "天气",
        "吃饭",
        "睡觉",
        "周末",
        "电影",
    ];
    contains_any(text, &patterns)
}

/// Keyword intent classifier. Categories are checked in priority order:
/// Emotional, Complaint, Question, IrrelevantChat; anything else is RelevantInfo.
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        let lower = normalize(text);

        if has_emotional_pattern(&lower) {
            return Intent::Emotional;
        }

        if has_complaint_pattern(&lower) {
            return Intent::Complaint;
        }

        if has_question_pattern(&lower) {
            return Intent::Question;
        }

        if has_irrelevant_pattern(&lower) {
            return Intent::IrrelevantChat;
        }

        Intent::RelevantInfo
    }
}
