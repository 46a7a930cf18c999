use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::{EmotionLevel, Phase};
use crate::models::record::MedicalRecord;
use crate::session_store::StoreError;

#[derive(Debug, Error)]
pub enum ConsultationError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Medical record not ready for session {0}")]
    RecordNotReady(String),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

impl ConsultationError {
    /// Both "no such session" and "not complete yet" surface as not available.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::RecordNotReady(_))
    }
}

/// What the engine did with a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    /// Red/Yellow escalation; the session is now terminal.
    Emergency,
    /// The session was already terminal; nothing collected.
    AlreadyComplete,
    /// A contradiction with collected data needs confirming.
    ConflictRaised,
    /// The previous conflict was resolved with this turn's statement.
    Clarified,
    /// Question, complaint or off-topic turn; phase unchanged.
    Redirected,
    /// Phase moved forward.
    Advanced,
    /// Intake reached its final phase on this turn.
    Completed,
    /// Nothing usable for the current phase yet.
    NeedMoreInfo,
}

/// Everything a caller needs after one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub session_id: String,
    pub response_text: String,
    pub current_phase: Phase,
    pub collected_fields: Vec<String>,
    /// Required sections still absent.
    pub missing_fields: Vec<String>,
    pub is_complete: bool,
    pub emergency_flag: bool,
    /// Present once the session is terminal.
    pub medical_record: Option<MedicalRecord>,
    pub action: TurnAction,
    pub emotion: EmotionLevel,
    pub empathy: Option<String>,
    /// Patient is replying faster than is comfortable to read.
    pub slow_pacing: bool,
}
