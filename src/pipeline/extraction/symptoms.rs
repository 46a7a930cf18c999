use crate::intelligence::phrases::{contains_substring, normalize};
use crate::models::session::Session;

/// Symptom → urgency (lower is more urgent). Table order is the scan order.
const SYMPTOM_PRIORITY: &[(&str, u32)] = &[
    // English
    ("chest pain", 1),
    ("difficulty breathing", 1),
    ("confusion", 1),
    ("heavy bleeding", 1),
    ("headache", 2),
    ("abdominal pain", 2),
    ("fever", 3),
    ("cough", 3),
    ("nausea", 3),
    ("vomiting", 3),
    ("diarrhea", 4),
    ("dizziness", 4),
    ("sore throat", 4),
    ("back pain", 4),
    ("rash", 4),
    // Chinese
    ("胸痛", 1),
    ("呼吸困难", 1),
    ("意识模糊", 1),
    ("大出血", 1),
    ("头痛", 2),
    ("腹痛", 2),
    ("发热", 3),
    ("咳嗽", 3),
    ("恶心", 3),
    ("呕吐", 3),
    ("腹泻", 4),
];

/// Unknown symptoms always sort after every known one.
pub const DEFAULT_PRIORITY: u32 = 99;

/// Colloquial phrase → canonical symptom name.
const SYMPTOM_SYNONYMS: &[(&str, &str)] = &[
    ("stomach ache", "abdominal pain"),
    ("tummy ache", "abdominal pain"),
    ("belly pain", "abdominal pain"),
    ("belly ache", "abdominal pain"),
    ("short of breath", "difficulty breathing"),
    ("trouble breathing", "difficulty breathing"),
    ("running a temperature", "fever"),
    ("high temperature", "fever"),
    ("throwing up", "vomiting"),
    ("the runs", "diarrhea"),
    ("dizzy", "dizziness"),
    ("肚子不舒服", "腹痛"),
    ("肚子痛", "腹痛"),
    ("拉肚子", "腹泻"),
    ("发烧", "发热"),
];

/// Splits one utterance's symptoms into a ranked primary/secondary fork.
#[derive(Debug, Clone, Default)]
pub struct SymptomPrioritizer;

impl SymptomPrioritizer {
    pub fn new() -> Self {
        Self
    }

    /// Known symptoms in table order, then synonym hits not already found.
    pub fn extract_symptoms(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut symptoms: Vec<String> = SYMPTOM_PRIORITY
            .iter()
            .filter(|(name, _)| contains_substring(&normalized, name))
            .map(|(name, _)| name.to_string())
            .collect();

        for (synonym, canonical) in SYMPTOM_SYNONYMS {
            if contains_substring(&normalized, synonym) && !symptoms.iter().any(|s| s == canonical) {
                symptoms.push(canonical.to_string());
            }
        }
        symptoms
    }

    pub fn priority_of(&self, symptom: &str) -> u32 {
        SYMPTOM_PRIORITY
            .iter()
            .find(|(name, _)| *name == symptom)
            .map_or(DEFAULT_PRIORITY, |(_, priority)| *priority)
    }

    /// Stable sort by urgency.
    pub fn prioritize(&self, symptoms: &[String]) -> Vec<String> {
        let mut ordered = symptoms.to_vec();
        ordered.sort_by_key(|s| self.priority_of(s));
        ordered
    }

    /// Write `primary_symptom` and `secondary_symptoms`. No-op for an empty list.
    pub fn create_fork(&self, session: &mut Session, symptoms: &[String], confidence: f32) {
        let ordered = self.prioritize(symptoms);
        let Some((primary, rest)) = ordered.split_first() else {
            return;
        };
        session.set_field("primary_symptom", serde_json::json!(primary), confidence);
        session.set_field("secondary_symptoms", serde_json::json!(rest), confidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_known_symptoms_and_synonyms() {
        let p = SymptomPrioritizer::new();
        let found = p.extract_symptoms("Headache, a cough, and I've been throwing up");
        assert_eq!(found, strings(&["headache", "cough", "vomiting"]));
    }

    #[test]
    fn plural_forms_are_found() {
        let p = SymptomPrioritizer::new();
        let found = p.extract_symptoms("chest pains, fevers and headaches");
        assert_eq!(found, strings(&["chest pain", "headache", "fever"]));
    }

    #[test]
    fn synonyms_deduplicate_against_canonical() {
        let p = SymptomPrioritizer::new();
        let found = p.extract_symptoms("abdominal pain, basically a stomach ache");
        assert_eq!(found, strings(&["abdominal pain"]));

        let found = p.extract_symptoms("我发烧，肚子痛");
        assert_eq!(found, strings(&["腹痛", "发热"]));
    }

    #[test]
    fn prioritize_by_urgency() {
        let p = SymptomPrioritizer::new();
        let ordered = p.prioritize(&strings(&["cough", "headache", "chest pain"]));
        assert_eq!(ordered, strings(&["chest pain", "headache", "cough"]));
    }

    #[test]
    fn prioritize_is_stable_and_unknown_last() {
        let p = SymptomPrioritizer::new();
        let ordered = p.prioritize(&strings(&["itchy ears", "nausea", "fever", "sneezing", "cough"]));
        assert_eq!(
            ordered,
            strings(&["nausea", "fever", "cough", "itchy ears", "sneezing"])
        );
        assert_eq!(p.priority_of("itchy ears"), DEFAULT_PRIORITY);
    }

    #[test]
    fn fork_writes_primary_and_secondary() {
        let p = SymptomPrioritizer::new();
        let mut session = Session::new("s".into(), Utc::now());
        p.create_fork(&mut session, &strings(&["fever", "headache"]), 0.85);
        assert_eq!(session.collected["primary_symptom"], "headache");
        assert_eq!(session.collected["secondary_symptoms"], serde_json::json!(["fever"]));
        assert_eq!(session.confidence_scores["primary_symptom"], 0.85);
    }

    #[test]
    fn fork_of_nothing_is_noop() {
        let p = SymptomPrioritizer::new();
        let mut session = Session::new("s".into(), Utc::now());
        p.create_fork(&mut session, &[], 0.85);
        assert!(session.collected.is_empty());
    }
}
