//! Rule-based field extraction from patient utterances.
//!
//! Every extractor is total: absent information comes back as `None` or an
//! empty list, never inferred. Terms pass through [`standardize`] so the
//! record carries clinical vocabulary.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::terminology::standardize;
use crate::intelligence::phrases::{contains_any, contains_phrase, first_substring, normalize};
use crate::models::enums::FieldType;
use crate::models::record::{
    ChiefComplaint, FamilyHistory, PastHistory, PersonalHistory, PresentIllness,
    ReproductiveHistory,
};

/// Value recorded when the patient denies any allergy.
pub const NO_KNOWN_ALLERGIES: &str = "no known allergies";

// ═══════════════════════════════════════════════════════════
// Vocabularies
// ═══════════════════════════════════════════════════════════

/// Chief complaint keywords, most urgent first. First match wins.
const COMPLAINT_KEYWORDS: &[&str] = &[
    // English
    "chest pain",
    "difficulty breathing",
    "shortness of breath",
    "abdominal pain",
    "stomach ache",
    "tummy ache",
    "belly ache",
    "headache",
    "migraine",
    "back pain",
    "sore throat",
    "fever",
    "running a temperature",
    "high temperature",
    "cough",
    "nausea",
    "vomiting",
    "throwing up",
    "diarrhea",
    "the runs",
    "constipated",
    "dizziness",
    "rash",
    "fatigue",
    "flu",
    "common cold",
    "cold",
    // Chinese
    "胸痛",
    "呼吸困难",
    "腹痛",
    "头痛",
    "发烧",
    "咳嗽",
    "恶心",
    "呕吐",
    "拉肚子",
    "便秘",
    "头晕",
    "感冒",
];

const DISEASE_KEYWORDS: &[&str] = &[
    "hypertension",
    "high blood pressure",
    "diabetes",
    "asthma",
    "heart disease",
    "copd",
    "hepatitis",
    "epilepsy",
    "高血压",
    "糖尿病",
    "哮喘",
    "心脏病",
    "冠心病",
    "乙肝",
];

/// Diseases worth recording when they run in the family, beyond the chronic list.
const HEREDITARY_KEYWORDS: &[&str] = &["cancer", "stroke", "heart attack", "癌症", "中风"];

const MEDICATION_KEYWORDS: &[&str] = &[
    "metformin",
    "lisinopril",
    "amlodipine",
    "aspirin",
    "insulin",
    "atorvastatin",
    "simvastatin",
    "ibuprofen",
    "paracetamol",
    "acetaminophen",
    "warfarin",
    "levothyroxine",
    "omeprazole",
    "salbutamol",
    "二甲双胍",
    "阿司匹林",
    "胰岛素",
    "布洛芬",
];

const NO_ALLERGY_PHRASES: &[&str] = &[
    "no known allergies",
    "no known drug allergies",
    "no allergies",
    "nkda",
    "not allergic to anything",
    "not allergic to any",
    "don't have any allergies",
    "没有过敏",
    "无过敏",
    "不过敏",
];

/// (phrase, label); first match wins.
const PROGRESSION_PHRASES: &[(&str, &str)] = &[
    ("getting worse", "worsening"),
    ("worsening", "worsening"),
    ("worse", "worsening"),
    ("加重", "worsening"),
    ("越来越", "worsening"),
    ("getting better", "improving"),
    ("improving", "improving"),
    ("better", "improving"),
    ("好转", "improving"),
    ("减轻", "improving"),
    ("comes and goes", "intermittent"),
    ("on and off", "intermittent"),
    ("反复", "intermittent"),
    ("时好时坏", "intermittent"),
    ("the same", "stable"),
    ("unchanged", "stable"),
    ("no change", "stable"),
    ("没变化", "stable"),
];

/// (phrase, status) for smoking, checked in order so denials beat mentions.
const SMOKING_PHRASES: &[(&str, &str)] = &[
    ("never smoked", "never"),
    ("don't smoke", "never"),
    ("do not smoke", "never"),
    ("non-smoker", "never"),
    ("不抽烟", "never"),
    ("不吸烟", "never"),
    ("quit smoking", "former"),
    ("used to smoke", "former"),
    ("former smoker", "former"),
    ("戒烟", "former"),
    ("smoke", "current"),
    ("smokes", "current"),
    ("smoking", "current"),
    ("smoker", "current"),
    ("cigarettes", "current"),
    ("抽烟", "current"),
    ("吸烟", "current"),
];

const DRINKING_PHRASES: &[(&str, &str)] = &[
    ("don't drink", "never"),
    ("do not drink", "never"),
    ("never drink", "never"),
    ("no alcohol", "never"),
    ("不喝酒", "never"),
    ("quit drinking", "former"),
    ("used to drink", "former"),
    ("戒酒", "former"),
    ("drink", "current"),
    ("drinks", "current"),
    ("drinking", "current"),
    ("alcohol", "current"),
    ("beer", "current"),
    ("wine", "current"),
    ("喝酒", "current"),
    ("饮酒", "current"),
];

const REPRODUCTIVE_PHRASES: &[&str] = &[
    "pregnant",
    "pregnancy",
    "period",
    "periods",
    "menstrual",
    "menopause",
    "miscarriage",
    "children",
    "怀孕",
    "月经",
    "绝经",
    "流产",
    "生育",
];

const NOT_APPLICABLE_PHRASES: &[&str] = &["not applicable", "n/a", "i'm male", "i am male", "不适用"];

const FUTURE_INDICATORS: &[&str] = &[
    "tomorrow",
    "next week",
    "next month",
    "next year",
    "from now",
    "in the future",
    "明天",
    "后天",
    "下周",
    "下个月",
    "以后",
];

// ═══════════════════════════════════════════════════════════
// Patterns
// ═══════════════════════════════════════════════════════════

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:(?:hour|day|week|month|year)s?\b|小时|天|周|个月|年)")
        .expect("Invalid duration regex")
});

static SEVERITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(10|[1-9])\s*(?:/|out\s+of)\s*10\b").expect("Invalid severity regex")
});

static ONSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:since|started|began|starting)\b[^,.;!?\n]*|(?:自从|从)[^，。,.；\n]*开始|\d+\s*(?:天|周|个月|年)前",
    )
    .expect("Invalid onset regex")
});

static ALLERGIC_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\ballergic\s+to\s+([^,.;!?\n]+)").expect("Invalid allergy regex")
});

static ALLERGY_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]+)\s+allerg(?:y|ies)\b").expect("Invalid allergy regex")
});

static ALLERGY_ZH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"对([\p{Han}A-Za-z]+?)过敏").expect("Invalid allergy regex"));

static SURGERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z]+(?:ectomy|otomy|ostomy|plasty)\b").expect("Invalid surgery regex")
});

static SURGERY_ZH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:做过|动过)(\p{Han}{1,6}?)手术").expect("Invalid surgery regex"));

static OCCUPATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:work(?:s|ing)?\s+as|my\s+(?:job|occupation)\s+is)\s+(?:an?\s+)?([^,.;!?\n]+)",
    )
    .expect("Invalid occupation regex")
});

static OCCUPATION_ZH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:职业是|工作是|我是一名)(\p{Han}{1,8})").expect("Invalid occupation regex")
});

static AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,3})\s*(?:years?\s+old|yrs?\s+old|y/o)\b|\bage(?:d)?\s*(?:is\s*)?(\d{1,3})\b|(\d{1,3})\s*岁",
    )
    .expect("Invalid age regex")
});

// Words captured by ALLERGY_NOUN_RE that are not allergens.
const ALLERGY_NOUN_STOPWORDS: &[&str] = &["no", "known", "any", "an", "my", "the", "drug", "food"];

// ═══════════════════════════════════════════════════════════
// Output types
// ═══════════════════════════════════════════════════════════

/// One extracted record section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum ExtractedSection {
    ChiefComplaint(ChiefComplaint),
    PresentIllness(PresentIllness),
    PastHistory(PastHistory),
    PersonalHistory(PersonalHistory),
    FamilyHistory(FamilyHistory),
    ReproductiveHistory(ReproductiveHistory),
}

impl ExtractedSection {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::ChiefComplaint(_) => FieldType::ChiefComplaint,
            Self::PresentIllness(_) => FieldType::PresentIllness,
            Self::PastHistory(_) => FieldType::PastHistory,
            Self::PersonalHistory(_) => FieldType::PersonalHistory,
            Self::FamilyHistory(_) => FieldType::FamilyHistory,
            Self::ReproductiveHistory(_) => FieldType::ReproductiveHistory,
        }
    }

    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::ChiefComplaint(s) => {
                s.symptom.is_none() && s.duration.is_none() && s.severity.is_none()
            }
            Self::PresentIllness(s) => {
                s.notes.is_none()
                    && s.onset.is_none()
                    && s.progression.is_none()
                    && s.associated_symptoms.is_empty()
            }
            Self::PastHistory(s) => {
                s.notes.is_none()
                    && s.chronic_diseases.is_empty()
                    && s.surgeries.is_empty()
                    && s.allergies.is_empty()
                    && s.medications.is_empty()
            }
            Self::PersonalHistory(s) => {
                s.smoking.is_none() && s.drinking.is_none() && s.occupation.is_none() && s.notes.is_none()
            }
            Self::FamilyHistory(s) => s.hereditary_diseases.is_empty() && s.notes.is_none(),
            Self::ReproductiveHistory(s) => !s.applicable && s.details.is_none(),
        }
    }

    /// JSON form of the inner section, as stored in collected data.
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            Self::ChiefComplaint(s) => serde_json::to_value(s),
            Self::PresentIllness(s) => serde_json::to_value(s),
            Self::PastHistory(s) => serde_json::to_value(s),
            Self::PersonalHistory(s) => serde_json::to_value(s),
            Self::FamilyHistory(s) => serde_json::to_value(s),
            Self::ReproductiveHistory(s) => serde_json::to_value(s),
        };
        value.unwrap_or_default()
    }
}

/// The three required sections extracted from one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub chief_complaint: ChiefComplaint,
    pub present_illness: PresentIllness,
    pub past_history: PastHistory,
}

// ═══════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ExtractionEngine;

impl ExtractionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str, field_type: FieldType) -> ExtractedSection {
        match field_type {
            FieldType::ChiefComplaint => {
                ExtractedSection::ChiefComplaint(self.extract_chief_complaint(text))
            }
            FieldType::PresentIllness => {
                ExtractedSection::PresentIllness(self.extract_present_illness(text))
            }
            FieldType::PastHistory => ExtractedSection::PastHistory(self.extract_past_history(text)),
            FieldType::PersonalHistory => {
                ExtractedSection::PersonalHistory(self.extract_personal_history(text))
            }
            FieldType::FamilyHistory => {
                ExtractedSection::FamilyHistory(self.extract_family_history(text))
            }
            FieldType::ReproductiveHistory => {
                ExtractedSection::ReproductiveHistory(self.extract_reproductive_history(text))
            }
        }
    }

    pub fn extract_batch(&self, text: &str) -> ExtractionBatch {
        ExtractionBatch {
            chief_complaint: self.extract_chief_complaint(text),
            present_illness: self.extract_present_illness(text),
            past_history: self.extract_past_history(text),
        }
    }

    // ── Required sections ──

    pub fn extract_chief_complaint(&self, text: &str) -> ChiefComplaint {
        let normalized = normalize(text);
        ChiefComplaint {
            symptom: first_substring(&normalized, COMPLAINT_KEYWORDS).map(standardize),
            duration: extract_duration(text),
            severity: extract_severity(text),
        }
    }

    pub fn extract_present_illness(&self, text: &str) -> PresentIllness {
        let normalized = normalize(text);
        let onset = ONSET_RE
            .find(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|onset| validate_time(onset));
        let progression = PROGRESSION_PHRASES
            .iter()
            .find(|(phrase, _)| contains_phrase(&normalized, phrase))
            .map(|(_, label)| label.to_string());

        PresentIllness {
            notes: non_empty(text),
            onset,
            progression,
            associated_symptoms: all_matches(&normalized, COMPLAINT_KEYWORDS),
        }
    }

    pub fn extract_past_history(&self, text: &str) -> PastHistory {
        let normalized = normalize(text);
        PastHistory {
            notes: non_empty(text),
            chronic_diseases: all_matches(&normalized, DISEASE_KEYWORDS),
            surgeries: extract_surgeries(text),
            allergies: self.extract_allergies(text),
            medications: all_matches(&normalized, MEDICATION_KEYWORDS),
        }
    }

    /// Allergens named in the text, or `[NO_KNOWN_ALLERGIES]` on an explicit denial.
    pub fn extract_allergies(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        if contains_any(&normalized, NO_ALLERGY_PHRASES) {
            return vec![NO_KNOWN_ALLERGIES.to_string()];
        }

        let mut allergens = Vec::new();
        for caps in ALLERGIC_TO_RE.captures_iter(&normalized) {
            for item in caps[1].split(" and ").flat_map(|s| s.split(" or ")) {
                push_unique(&mut allergens, item.trim());
            }
        }
        for caps in ALLERGY_NOUN_RE.captures_iter(&normalized) {
            let word = &caps[1];
            if !ALLERGY_NOUN_STOPWORDS.contains(&word) {
                push_unique(&mut allergens, word);
            }
        }
        for caps in ALLERGY_ZH_RE.captures_iter(text) {
            push_unique(&mut allergens, &caps[1]);
        }
        allergens
    }

    pub fn extract_medications(&self, text: &str) -> Vec<String> {
        all_matches(&normalize(text), MEDICATION_KEYWORDS)
    }

    // ── Extended sections ──

    pub fn extract_personal_history(&self, text: &str) -> PersonalHistory {
        let normalized = normalize(text);
        let occupation = OCCUPATION_RE
            .captures(&normalized)
            .map(|c| first_clause(&c[1]))
            .or_else(|| OCCUPATION_ZH_RE.captures(text).map(|c| c[1].to_string()))
            .filter(|o| !o.is_empty());

        PersonalHistory {
            smoking: lookup_status(&normalized, SMOKING_PHRASES),
            drinking: lookup_status(&normalized, DRINKING_PHRASES),
            occupation,
            notes: non_empty(text),
        }
    }

    pub fn extract_family_history(&self, text: &str) -> FamilyHistory {
        let normalized = normalize(text);
        let mut diseases = all_matches(&normalized, DISEASE_KEYWORDS);
        for disease in all_matches(&normalized, HEREDITARY_KEYWORDS) {
            push_unique(&mut diseases, &disease);
        }
        FamilyHistory {
            hereditary_diseases: diseases,
            notes: non_empty(text),
        }
    }

    pub fn extract_reproductive_history(&self, text: &str) -> ReproductiveHistory {
        let normalized = normalize(text);
        let applicable = contains_any(&normalized, REPRODUCTIVE_PHRASES)
            && !contains_any(&normalized, NOT_APPLICABLE_PHRASES);
        ReproductiveHistory {
            applicable,
            details: non_empty(text),
        }
    }

    /// Stated age, only when it passes [`validate_age`].
    pub fn extract_age(&self, text: &str) -> Option<u32> {
        let caps = AGE_RE.captures(text)?;
        let digits = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))?
            .as_str();
        if !validate_age(digits) {
            return None;
        }
        digits.parse().ok()
    }
}

// ═══════════════════════════════════════════════════════════
// Validators
// ═══════════════════════════════════════════════════════════

/// Integer in [0, 150].
pub fn validate_age(age: &str) -> bool {
    age.trim()
        .parse::<i64>()
        .is_ok_and(|age| (0..=150).contains(&age))
}

/// Rejects time expressions that point into the future.
pub fn validate_time(time: &str) -> bool {
    !contains_any(&normalize(time), FUTURE_INDICATORS)
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

fn extract_duration(text: &str) -> Option<String> {
    DURATION_RE.find(text).map(|m| m.as_str().to_string())
}

fn extract_severity(text: &str) -> Option<u8> {
    SEVERITY_RE
        .captures(text)
        .and_then(|c| c[1].parse().ok())
}

fn extract_surgeries(text: &str) -> Vec<String> {
    let mut surgeries = Vec::new();
    for m in SURGERY_RE.find_iter(&normalize(text)) {
        push_unique(&mut surgeries, m.as_str());
    }
    for caps in SURGERY_ZH_RE.captures_iter(text) {
        push_unique(&mut surgeries, &format!("{}手术", &caps[1]));
    }
    surgeries
}

/// Every keyword present, standardized and deduplicated, in table order.
fn all_matches(normalized: &str, keywords: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for keyword in keywords {
        if contains_phrase(normalized, keyword) {
            push_unique(&mut found, &standardize(keyword));
        }
    }
    found
}

fn lookup_status(normalized: &str, table: &[(&str, &str)]) -> Option<String> {
    table
        .iter()
        .find(|(phrase, _)| contains_phrase(normalized, phrase))
        .map(|(_, status)| status.to_string())
}

fn first_clause(text: &str) -> String {
    text.split(" and ")
        .next()
        .unwrap_or_default()
        .split(" but ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !item.is_empty() && !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ExtractionEngine {
        ExtractionEngine::new()
    }

    #[test]
    fn chief_complaint_symptom_and_duration() {
        let cc = engine().extract_chief_complaint("I've had a headache for 3 days");
        assert_eq!(cc.symptom.as_deref(), Some("headache"));
        assert_eq!(cc.duration.as_deref(), Some("3 days"));
        assert_eq!(cc.severity, None);
    }

    #[test]
    fn chief_complaint_is_standardized() {
        let cc = engine().extract_chief_complaint("bad stomach ache since 2 weeks");
        assert_eq!(cc.symptom.as_deref(), Some("abdominal pain"));
        assert_eq!(cc.duration.as_deref(), Some("2 weeks"));

        let cc = engine().extract_chief_complaint("我发烧3天了");
        assert_eq!(cc.symptom.as_deref(), Some("发热"));
        assert_eq!(cc.duration.as_deref(), Some("3天"));
    }

    #[test]
    fn chief_complaint_matches_inflected_keywords() {
        let cc = engine().extract_chief_complaint("terrible headaches for 2 days");
        assert_eq!(cc.symptom.as_deref(), Some("headache"));
        assert_eq!(cc.duration.as_deref(), Some("2 days"));
    }

    #[test]
    fn chief_complaint_prefers_more_urgent_keyword() {
        let cc = engine().extract_chief_complaint("headache and now abdominal pain");
        assert_eq!(cc.symptom.as_deref(), Some("abdominal pain"));
    }

    #[test]
    fn severity_scale() {
        let e = engine();
        assert_eq!(e.extract_chief_complaint("it's about 7/10").severity, Some(7));
        assert_eq!(e.extract_chief_complaint("10 out of 10").severity, Some(10));
        assert_eq!(e.extract_chief_complaint("11/10 honestly").severity, None);
    }

    #[test]
    fn absent_information_is_not_inferred() {
        let batch = engine().extract_batch("");
        assert_eq!(batch, ExtractionBatch::default());
        let cc = engine().extract(":)", FieldType::ChiefComplaint);
        assert!(cc.is_empty());
    }

    #[test]
    fn duration_ignores_bare_numbers() {
        assert_eq!(extract_duration("I'm 45"), None);
        assert_eq!(extract_duration("for 12 hours"), Some("12 hours".to_string()));
        assert_eq!(extract_duration("持续2周"), Some("2周".to_string()));
    }

    #[test]
    fn present_illness_fields() {
        let pi = engine().extract_present_illness(
            "It started yesterday morning, getting worse, with some nausea",
        );
        assert_eq!(pi.onset.as_deref(), Some("started yesterday morning"));
        assert_eq!(pi.progression.as_deref(), Some("worsening"));
        assert_eq!(pi.associated_symptoms, vec!["nausea"]);
        assert!(pi.notes.is_some());
    }

    #[test]
    fn future_onset_is_dropped() {
        let pi = engine().extract_present_illness("it started tomorrow apparently");
        assert_eq!(pi.onset, None);
        assert!(pi.notes.is_some());
    }

    #[test]
    fn past_history_fields() {
        let ph = engine().extract_past_history(
            "I have high blood pressure and diabetes, take metformin and aspirin, \
             had an appendectomy, and I'm allergic to penicillin",
        );
        assert_eq!(ph.chronic_diseases, vec!["hypertension", "diabetes"]);
        assert_eq!(ph.medications, vec!["metformin", "aspirin"]);
        assert_eq!(ph.surgeries, vec!["appendectomy"]);
        assert_eq!(ph.allergies, vec!["penicillin"]);
    }

    #[test]
    fn chinese_past_history() {
        let ph = engine().extract_past_history("有高血压，做过阑尾手术，对青霉素过敏");
        assert_eq!(ph.chronic_diseases, vec!["高血压"]);
        assert_eq!(ph.surgeries, vec!["阑尾手术"]);
        assert_eq!(ph.allergies, vec!["青霉素"]);
    }

    #[test]
    fn allergy_forms() {
        let e = engine();
        assert_eq!(e.extract_allergies("No known allergies"), vec![NO_KNOWN_ALLERGIES]);
        assert_eq!(e.extract_allergies("I have a peanut allergy"), vec!["peanut"]);
        assert_eq!(
            e.extract_allergies("allergic to penicillin and shellfish"),
            vec!["penicillin", "shellfish"]
        );
        assert!(e.extract_allergies("no history of that").is_empty());
    }

    #[test]
    fn personal_history_statuses() {
        let p = engine().extract_personal_history("I don't smoke, I drink wine sometimes, I work as a teacher");
        assert_eq!(p.smoking.as_deref(), Some("never"));
        assert_eq!(p.drinking.as_deref(), Some("current"));
        assert_eq!(p.occupation.as_deref(), Some("teacher"));

        let p = engine().extract_personal_history("I quit smoking last year");
        assert_eq!(p.smoking.as_deref(), Some("former"));
        assert_eq!(p.drinking, None);
    }

    #[test]
    fn family_history_diseases() {
        let f = engine().extract_family_history("My father had a stroke and my mother has diabetes");
        assert_eq!(f.hereditary_diseases, vec!["diabetes", "stroke"]);
    }

    #[test]
    fn reproductive_applicability() {
        let e = engine();
        assert!(e.extract_reproductive_history("my periods are regular").applicable);
        assert!(!e.extract_reproductive_history("not applicable").applicable);
    }

    #[test]
    fn age_validation() {
        assert!(validate_age("45"));
        assert!(validate_age("0"));
        assert!(validate_age("150"));
        assert!(!validate_age("151"));
        assert!(!validate_age("-1"));
        assert!(!validate_age("forty"));
        assert!(!validate_age(""));
    }

    #[test]
    fn age_extraction() {
        let e = engine();
        assert_eq!(e.extract_age("I am 45 years old"), Some(45));
        assert_eq!(e.extract_age("age 7"), Some(7));
        assert_eq!(e.extract_age("我今年45岁"), Some(45));
        assert_eq!(e.extract_age("I am 200 years old"), None);
        assert_eq!(e.extract_age("headache for 3 days"), None);
    }

    #[test]
    fn time_validation() {
        assert!(validate_time("3 days ago"));
        assert!(validate_time("yesterday"));
        assert!(!validate_time("tomorrow"));
        assert!(!validate_time("next week"));
        assert!(!validate_time("明天开始"));
    }

    #[test]
    fn section_value_shape() {
        let section = engine().extract("headache for 3 days", FieldType::ChiefComplaint);
        assert_eq!(section.field_type(), FieldType::ChiefComplaint);
        let value = section.to_value();
        assert_eq!(value["symptom"], "headache");
        assert_eq!(value["duration"], "3 days");
        assert!(value["severity"].is_null());
    }
}
