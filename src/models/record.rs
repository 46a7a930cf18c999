use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{CollectedData, ConflictRecord, Session};

// ═══════════════════════════════════════════════════════════
// Record sections
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChiefComplaint {
    pub symptom: Option<String>,
    pub duration: Option<String>,
    /// Patient-reported 1–10 rating.
    pub severity: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentIllness {
    pub notes: Option<String>,
    pub onset: Option<String>,
    pub progression: Option<String>,
    pub associated_symptoms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PastHistory {
    pub notes: Option<String>,
    pub chronic_diseases: Vec<String>,
    pub surgeries: Vec<String>,
    pub allergies: Vec<String>,
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalHistory {
    /// never / former / current
    pub smoking: Option<String>,
    pub drinking: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyHistory {
    pub hereditary_diseases: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReproductiveHistory {
    pub applicable: bool,
    pub details: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// MedicalRecord
// ═══════════════════════════════════════════════════════════

/// Structured pre-consultation record, available once a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub session_id: String,
    pub completed_at: DateTime<Utc>,
    pub fields: CollectedData,
    pub confidence_scores: BTreeMap<String, f32>,
    pub conflicts: Vec<ConflictRecord>,
    pub emergency_flag: bool,
    pub emergency_recommendation: Option<String>,
}

impl MedicalRecord {
    /// Build the record for a completed session; `None` while intake is still running.
    pub fn from_session(session: &Session) -> Option<Self> {
        if !session.phase.is_terminal() {
            return None;
        }
        Some(Self {
            session_id: session.id.clone(),
            completed_at: session.completed_at.unwrap_or(session.last_activity),
            fields: session.collected.clone(),
            confidence_scores: session.confidence_scores.clone(),
            conflicts: session.conflict_history.clone(),
            emergency_flag: session.emergency_flag,
            emergency_recommendation: session.emergency_recommendation.clone(),
        })
    }

    /// Typed view of the chief complaint section, when present and well-formed.
    pub fn chief_complaint(&self) -> Option<ChiefComplaint> {
        self.section("chief_complaint")
    }

    pub fn past_history(&self) -> Option<PastHistory> {
        self.section("past_history")
    }

    fn section<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.fields
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Phase;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn no_record_before_completion() {
        let mut s = Session::new("s1".into(), now());
        s.advance_to(Phase::PastHistory, now());
        assert!(MedicalRecord::from_session(&s).is_none());
    }

    #[test]
    fn record_carries_fields_and_scores() {
        let mut s = Session::new("s1".into(), now());
        let cc = ChiefComplaint {
            symptom: Some("headache".into()),
            duration: Some("3 days".into()),
            severity: None,
        };
        s.set_field("chief_complaint", serde_json::to_value(&cc).unwrap(), 0.85);
        s.advance_to(Phase::Complete, now());

        let record = MedicalRecord::from_session(&s).unwrap();
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.completed_at, now());
        assert_eq!(record.chief_complaint(), Some(cc));
        assert_eq!(record.confidence_scores.get("chief_complaint"), Some(&0.85));
        assert!(record.past_history().is_none());
    }

    #[test]
    fn malformed_section_reads_as_absent() {
        let mut s = Session::new("s1".into(), now());
        s.set_field("past_history", json!("free text"), 0.7);
        s.advance_to(Phase::Complete, now());
        let record = MedicalRecord::from_session(&s).unwrap();
        assert!(record.past_history().is_none());
        assert_eq!(record.fields["past_history"], json!("free text"));
    }
}
