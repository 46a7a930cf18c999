//! The intake state machine.
//!
//! One turn runs in a fixed order: emergency screen, terminal check,
//! pending clarification, conflict guards, intent redirect, phase
//! collection, then the advisory emotion pass. Each step can end the turn.
//! The whole turn executes under the session's store lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::phases::{self, PhaseContext, PhaseOutcome};
use super::responses;
use super::types::{ConsultationError, TurnAction, TurnResult};
use crate::config::ConsultationConfig;
use crate::intelligence::{ConflictDetector, EmergencyDetector, EmotionDetector, IntentClassifier};
use crate::models::enums::Speaker;
use crate::models::record::MedicalRecord;
use crate::models::session::{ConflictRecord, Session};
use crate::pipeline::extraction::{ConfidenceScorer, ExtractionEngine, SymptomPrioritizer};
use crate::session_store::{SessionStore, StoreError};

/// Reply intervals averaged for the pacing hint.
const PACING_WINDOW: usize = 3;

/// Stateless detectors and extractors shared by every session.
#[derive(Debug, Clone, Default)]
pub struct Services {
    pub emergency: EmergencyDetector,
    pub conflict: ConflictDetector,
    pub emotion: EmotionDetector,
    pub intent: IntentClassifier,
    pub extraction: ExtractionEngine,
    pub prioritizer: SymptomPrioritizer,
    pub scorer: ConfidenceScorer,
}

impl Services {
    fn phase_context(&self) -> PhaseContext<'_> {
        PhaseContext {
            extraction: &self.extraction,
            prioritizer: &self.prioritizer,
            scorer: &self.scorer,
        }
    }
}

pub struct Orchestrator {
    store: Arc<SessionStore>,
    services: Services,
    config: ConsultationConfig,
}

/// Response and action decided by the collection steps.
struct Step {
    response: String,
    action: TurnAction,
}

impl Step {
    fn new(response: impl Into<String>, action: TurnAction) -> Self {
        Self {
            response: response.into(),
            action,
        }
    }
}

impl Orchestrator {
    pub fn new(config: ConsultationConfig) -> Self {
        let store = Arc::new(SessionStore::new(config.session_timeout));
        Self::with_services(store, Services::default(), config)
    }

    pub fn with_services(
        store: Arc<SessionStore>,
        services: Services,
        config: ConsultationConfig,
    ) -> Self {
        Self {
            store,
            services,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &ConsultationConfig {
        &self.config
    }

    // ── Turns ───────────────────────────────────────────────

    /// Process one patient utterance. An absent, unknown or expired id
    /// starts a new session; the result carries the id to use next time.
    pub fn handle_turn(
        &self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<TurnResult, ConsultationError> {
        self.handle_turn_at(session_id, text, Utc::now())
    }

    pub fn handle_turn_at(
        &self,
        session_id: Option<&str>,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnResult, ConsultationError> {
        let result = self
            .store
            .with_session_at(session_id, now, |session| self.run_turn(session, text, now))?;
        Ok(result)
    }

    fn run_turn(&self, session: &mut Session, text: &str, now: DateTime<Utc>) -> TurnResult {
        session.push_entry(Speaker::Patient, text, now);

        let detection = self.services.emergency.detect(text);
        if detection.is_emergency {
            tracing::warn!(
                session_id = %session.id,
                level = detection.level.as_str(),
                phase = session.phase.as_str(),
                "Emergency escalation"
            );
            session.escalate(detection.recommendation.clone(), now);
            let step = Step::new(detection.recommendation, TurnAction::Emergency);
            return self.finish(session, step, None, false, now);
        }

        let step = self.collect(session, text, now);

        let emotion = self.services.emotion.detect_level(text);
        session.emotion_state = emotion;
        let context = session.field_as_text("primary_symptom").unwrap_or_default();
        let empathy = self.services.emotion.generate_response(emotion, &context);
        let slow_pacing = self
            .services
            .emotion
            .should_slow_pacing(&session.reply_intervals(PACING_WINDOW));

        let step = if empathy.is_empty() {
            step
        } else {
            Step::new(format!("{empathy} {}", step.response), step.action)
        };
        let empathy = (!empathy.is_empty()).then_some(empathy);
        self.finish(session, step, empathy, slow_pacing, now)
    }

    fn collect(&self, session: &mut Session, text: &str, now: DateTime<Utc>) -> Step {
        if session.is_terminal() {
            let message = session
                .emergency_recommendation
                .clone()
                .unwrap_or_else(|| responses::CLOSING.to_string());
            return Step::new(message, TurnAction::AlreadyComplete);
        }

        let ctx = self.services.phase_context();

        if let Some(conflict) = session.pending_conflict.take() {
            phases::apply_clarification(session, &conflict, text, &ctx);
            tracing::info!(
                session_id = %session.id,
                field = %conflict.field,
                "Conflict clarified"
            );
            return Step::new(responses::clarified(session.phase), TurnAction::Clarified);
        }

        let detector = &self.services.conflict;
        for field in phases::guarded_fields(session.phase) {
            let Some(conflict) = detector.detect(&session.collected, text, field) else {
                continue;
            };
            if !detector.should_interrupt(&conflict) {
                tracing::debug!(session_id = %session.id, field, "Low-risk conflict not raised");
                continue;
            }
            tracing::warn!(
                session_id = %session.id,
                field,
                risk = conflict.risk.as_str(),
                "Conflict with collected data"
            );
            let message = detector.backtrack_message(&conflict);
            session.conflict_history.push(ConflictRecord {
                conflict: conflict.clone(),
                phase: session.phase,
                detected_at: now,
            });
            session.pending_conflict = Some(conflict);
            return Step::new(message, TurnAction::ConflictRaised);
        }

        let intent = self.services.intent.classify(text);
        if intent.is_redirect() {
            tracing::debug!(
                session_id = %session.id,
                intent = intent.as_str(),
                "Redirecting turn"
            );
            return Step::new(responses::redirect(intent, session.phase), TurnAction::Redirected);
        }

        // First stated age wins; later turns may quote relatives' ages.
        if !session.has_field("age") {
            if let Some(age) = self.services.extraction.extract_age(text) {
                session.set_field("age", json!(age), self.services.scorer.score(text, "age"));
            }
        }

        let start = session.phase;
        self.run_phase_handlers(session, text, &ctx, now);

        if session.phase == start {
            Step::new(responses::need_more(session.phase), TurnAction::NeedMoreInfo)
        } else if session.phase.is_terminal() {
            tracing::info!(session_id = %session.id, "Intake complete");
            Step::new(responses::CLOSING, TurnAction::Completed)
        } else {
            Step::new(responses::advanced_to(session.phase), TurnAction::Advanced)
        }
    }

    fn run_phase_handlers(
        &self,
        session: &mut Session,
        text: &str,
        ctx: &PhaseContext<'_>,
        now: DateTime<Utc>,
    ) {
        loop {
            let phase = session.phase;
            let outcome = phases::handler_for(phase)(session, text, ctx);
            if outcome == PhaseOutcome::Stay {
                return;
            }

            let next = phases::next_phase(phase, self.config.collect_extended_history);
            session.advance_to(next, now);
            tracing::debug!(
                session_id = %session.id,
                from = phase.as_str(),
                to = next.as_str(),
                "Phase advanced"
            );
            if outcome != PhaseOutcome::AdvanceAndContinue || next.is_terminal() {
                return;
            }
        }
    }

    fn finish(
        &self,
        session: &mut Session,
        step: Step,
        empathy: Option<String>,
        slow_pacing: bool,
        now: DateTime<Utc>,
    ) -> TurnResult {
        session.push_entry(Speaker::Assistant, step.response.clone(), now);
        TurnResult {
            session_id: session.id.clone(),
            response_text: step.response,
            current_phase: session.phase,
            collected_fields: session.collected_field_names(),
            missing_fields: session.missing_field_names(),
            is_complete: session.is_terminal(),
            emergency_flag: session.emergency_flag,
            medical_record: MedicalRecord::from_session(session),
            action: step.action,
            emotion: session.emotion_state,
            empathy,
            slow_pacing,
        }
    }

    // ── Out-of-band reads ───────────────────────────────────

    /// The structured record of a completed session.
    pub fn fetch_record(&self, session_id: &str) -> Result<MedicalRecord, ConsultationError> {
        self.fetch_record_at(session_id, Utc::now())
    }

    pub fn fetch_record_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<MedicalRecord, ConsultationError> {
        let session = self.lookup(session_id, now)?;
        MedicalRecord::from_session(&session)
            .ok_or_else(|| ConsultationError::RecordNotReady(session_id.to_string()))
    }

    /// Whether the patient has been silent long enough to be nudged.
    pub fn idle_prompt_due(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, ConsultationError> {
        let session = self.lookup(session_id, now)?;
        if session.is_terminal() {
            return Ok(false);
        }
        let last = session
            .last_patient_entry_at()
            .unwrap_or(session.last_activity);
        Ok(self.services.emotion.should_prompt_user(last, now))
    }

    fn lookup(&self, session_id: &str, now: DateTime<Utc>) -> Result<Session, ConsultationError> {
        self.store.get_at(session_id, now).map_err(|e| match e {
            StoreError::NotFound(id) => ConsultationError::SessionNotFound(id),
            other => ConsultationError::Store(other),
        })
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(ConsultationConfig::default())
    }
}
