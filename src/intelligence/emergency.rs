use serde::{Deserialize, Serialize};

use super::phrases::{first_substring, normalize};
use crate::models::enums::EmergencyLevel;

/// Acute, life-threatening presentations. Checked first.
const RED_FLAGS: &[&str] = &[
    // English
    "chest pain",
    "chest tightness",
    "palpitations",
    "trouble breathing",
    "difficulty breathing",
    "shortness of breath",
    "short of breath",
    "can't breathe",
    "cannot breathe",
    "confused",
    "unconscious",
    "passed out",
    "fainted",
    "heavy bleeding",
    "severe bleeding",
    "bleeding a lot",
    "unbearable pain",
    "excruciating",
    // Chinese
    "胸痛",
    "胸闷",
    "心慌",
    "呼吸困难",
    "呼吸急促",
    "喘不上气",
    "意识模糊",
    "昏迷",
    "昏厥",
    "大出血",
    "大量出血",
    "剧烈疼痛",
    "无法忍受",
];

/// Urgent but not acute presentations.
const YELLOW_FLAGS: &[&str] = &[
    // English
    "high fever",
    "fever of 39",
    "fever of 40",
    "severe dehydration",
    "collapsed",
    "keep vomiting",
    "persistent vomiting",
    "can't keep anything down",
    "unable to eat",
    // Chinese
    "高热",
    "高烧",
    "发烧40度",
    "发烧39度",
    "严重脱水",
    "虚脱",
    "持续呕吐",
    "无法进食",
];

const RED_RECOMMENDATION: &str = "The symptoms you describe need immediate medical attention. \
     Please go to the nearest emergency department now, or call your local emergency number.";

const YELLOW_RECOMMENDATION: &str = "The symptoms you describe should be seen by a doctor soon. \
     Please arrange to be seen today rather than waiting.";

/// Outcome of an emergency screen on one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub is_emergency: bool,
    pub level: EmergencyLevel,
    /// Empty when `level` is Green.
    pub recommendation: String,
    /// Phrase that triggered the escalation.
    pub matched: Option<String>,
}

/// Red/Yellow phrase screen by plain containment. Red always wins over
/// Yellow; first match wins.
#[derive(Debug, Clone)]
pub struct EmergencyDetector {
    red_flags: &'static [&'static str],
    yellow_flags: &'static [&'static str],
}

impl EmergencyDetector {
    pub fn new() -> Self {
        Self {
            red_flags: RED_FLAGS,
            yellow_flags: YELLOW_FLAGS,
        }
    }

    pub fn detect(&self, text: &str) -> DetectionResult {
        let normalized = normalize(text);

        if let Some(phrase) = first_substring(&normalized, self.red_flags) {
            return DetectionResult {
                is_emergency: true,
                level: EmergencyLevel::Red,
                recommendation: RED_RECOMMENDATION.to_string(),
                matched: Some(phrase.to_string()),
            };
        }

        if let Some(phrase) = first_substring(&normalized, self.yellow_flags) {
            return DetectionResult {
                is_emergency: true,
                level: EmergencyLevel::Yellow,
                recommendation: YELLOW_RECOMMENDATION.to_string(),
                matched: Some(phrase.to_string()),
            };
        }

        DetectionResult {
            is_emergency: false,
            level: EmergencyLevel::Green,
            recommendation: String::new(),
            matched: None,
        }
    }
}

impl Default for EmergencyDetector {
    fn default() -> Self {
        Self::new()
    }
}
