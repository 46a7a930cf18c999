use super::phrases::{contains_any_substring, normalize};
use crate::models::enums::ConflictRisk;
use crate::models::session::{value_as_text, CollectedData, Conflict};

/// Safety-critical fields: any contradiction must be confirmed.
const HIGH_RISK_FIELDS: &[&str] = &["allergies", "past_history", "medications"];

/// Field-name fragments for symptom identity and duration.
const MEDIUM_RISK_FRAGMENTS: &[&str] = &["symptom", "duration"];

/// Negations and corrections, matched as plain substrings. Presence of any
/// one counts as a contradiction, whatever it refers to.
const CONTRADICTION_INDICATORS: &[&str] = &[
    // English
    "not",
    "no",
    "never",
    "isn't",
    "wasn't",
    "don't",
    "didn't",
    "actually",
    "correction",
    "i meant",
    "that's wrong",
    "should be",
    "to be precise",
    "to be exact",
    // Chinese
    "不是",
    "不对",
    "没有",
    "无",
    "否",
    "其实",
    "应该是",
    "准确说是",
];

/// Heuristic contradiction check between collected data and a new statement.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    high_risk_fields: &'static [&'static str],
    indicators: &'static [&'static str],
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self {
            high_risk_fields: HIGH_RISK_FIELDS,
            indicators: CONTRADICTION_INDICATORS,
        }
    }

    /// `None` when the field was never collected or the text carries no indicator.
    pub fn detect(
        &self,
        existing: &CollectedData,
        new_text: &str,
        field_name: &str,
    ) -> Option<Conflict> {
        let existing_value = existing.get(field_name).map(value_as_text)?;

        if !contains_any_substring(&normalize(new_text), self.indicators) {
            return None;
        }

        Some(Conflict {
            field: field_name.to_string(),
            existing_value,
            new_value: new_text.trim().to_string(),
            risk: self.risk_for(field_name),
        })
    }

    fn risk_for(&self, field_name: &str) -> ConflictRisk {
        if self.high_risk_fields.contains(&field_name) {
            ConflictRisk::High
        } else if MEDIUM_RISK_FRAGMENTS.iter().any(|f| field_name.contains(f)) {
            ConflictRisk::Medium
        } else {
            ConflictRisk::Low
        }
    }

    /// Confirmation prompt quoting both statements. Empty for Low risk.
    pub fn backtrack_message(&self, conflict: &Conflict) -> String {
        match conflict.risk {
            ConflictRisk::High => format!(
                "Sorry, I need to double-check something. Earlier you told me \"{}\", \
                 and now you said \"{}\". Which one is correct? This matters for your safety.",
                conflict.existing_value, conflict.new_value
            ),
            ConflictRisk::Medium => format!(
                "I noticed something that doesn't quite match. Before it was \"{}\", \
                 now it's \"{}\". Could you help me confirm which is right?",
                conflict.existing_value, conflict.new_value
            ),
            ConflictRisk::Low => String::new(),
        }
    }

    /// High and Medium conflicts pause the intake until clarified.
    pub fn should_interrupt(&self, conflict: &Conflict) -> bool {
        matches!(conflict.risk, ConflictRisk::High | ConflictRisk::Medium)
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}
