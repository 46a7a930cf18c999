use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ConflictRisk, EmotionLevel, FieldType, Phase, Speaker};

/// Field name → extracted value. Structured sections and plain strings share one map.
pub type CollectedData = BTreeMap<String, serde_json::Value>;

/// One line of the intake conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// A contradiction between a collected field and a new statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub field: String,
    pub existing_value: String,
    pub new_value: String,
    pub risk: ConflictRisk,
}

/// A conflict that was surfaced to the patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub conflict: Conflict,
    pub phase: Phase,
    pub detected_at: DateTime<Utc>,
}

/// Per-conversation intake state. Owned by the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub phase: Phase,
    pub collected: CollectedData,
    pub confidence_scores: BTreeMap<String, f32>,
    /// Append-only.
    pub conflict_history: Vec<ConflictRecord>,
    /// Conflict awaiting the patient's clarification on the next turn.
    pub pending_conflict: Option<Conflict>,
    pub emotion_state: EmotionLevel,
    pub emergency_flag: bool,
    pub emergency_recommendation: Option<String>,
    pub conversation: Vec<ConversationEntry>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped on every store write; used for compare-and-swap saves.
    pub revision: u64,
}

impl Session {
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phase: Phase::Greeting,
            collected: CollectedData::new(),
            confidence_scores: BTreeMap::new(),
            conflict_history: Vec::new(),
            pending_conflict: None,
            emotion_state: EmotionLevel::Normal,
            emergency_flag: false,
            emergency_recommendation: None,
            conversation: Vec::new(),
            created_at: now,
            last_activity: now,
            completed_at: None,
            revision: 0,
        }
    }

    /// Complete, or escalated as an emergency.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal() || self.emergency_flag
    }

    /// Move forward to `target`. Backward moves are ignored; returns whether the phase changed.
    pub fn advance_to(&mut self, target: Phase, now: DateTime<Utc>) -> bool {
        if target <= self.phase {
            return false;
        }
        self.phase = target;
        if target.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        true
    }

    /// Emergency escalation: jump to the terminal phase from anywhere.
    pub fn escalate(&mut self, recommendation: String, now: DateTime<Utc>) {
        self.emergency_flag = true;
        self.emergency_recommendation = Some(recommendation);
        self.pending_conflict = None;
        self.phase = Phase::Complete;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    pub fn push_entry(&mut self, speaker: Speaker, text: impl Into<String>, at: DateTime<Utc>) {
        self.conversation.push(ConversationEntry {
            speaker,
            text: text.into(),
            at,
        });
    }

    /// All patient utterances, one per line.
    pub fn patient_transcript(&self) -> String {
        self.conversation
            .iter()
            .filter(|e| e.speaker == Speaker::Patient)
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Seconds between consecutive patient replies, most recent `limit` intervals.
    pub fn reply_intervals(&self, limit: usize) -> Vec<f64> {
        let times: Vec<DateTime<Utc>> = self
            .conversation
            .iter()
            .filter(|e| e.speaker == Speaker::Patient)
            .map(|e| e.at)
            .collect();
        let intervals: Vec<f64> = times
            .windows(2)
            .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
            .collect();
        let skip = intervals.len().saturating_sub(limit);
        intervals.into_iter().skip(skip).collect()
    }

    pub fn last_patient_entry_at(&self) -> Option<DateTime<Utc>> {
        self.conversation
            .iter()
            .rev()
            .find(|e| e.speaker == Speaker::Patient)
            .map(|e| e.at)
    }

    pub fn set_field(&mut self, name: &str, value: serde_json::Value, confidence: f32) {
        self.collected.insert(name.to_string(), value);
        self.confidence_scores.insert(name.to_string(), confidence);
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.collected.contains_key(name)
    }

    pub fn collected_field_names(&self) -> Vec<String> {
        self.collected.keys().cloned().collect()
    }

    /// Required sections not yet collected, in canonical order.
    pub fn missing_field_names(&self) -> Vec<String> {
        FieldType::REQUIRED
            .iter()
            .filter(|f| !self.collected.contains_key(f.as_str()))
            .map(|f| f.as_str().to_string())
            .collect()
    }

    /// String form of a collected value: strings verbatim, everything else as JSON.
    pub fn field_as_text(&self, name: &str) -> Option<String> {
        self.collected.get(name).map(value_as_text)
    }
}

pub fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
