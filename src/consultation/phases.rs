//! Per-phase field collection.
//!
//! Each phase maps to one handler through an exhaustive match, so adding a
//! phase without a handler does not compile. Handlers write fields into the
//! session and report whether the phase's information is now present; the
//! orchestrator owns the actual transition.

use serde_json::json;

use crate::models::enums::{FieldType, Phase};
use crate::models::record::{ChiefComplaint, PastHistory};
use crate::models::session::{Conflict, Session};
use crate::pipeline::extraction::{
    ConfidenceScorer, ExtractedSection, ExtractionEngine, SymptomPrioritizer,
};

/// Services a handler may use.
pub(crate) struct PhaseContext<'a> {
    pub extraction: &'a ExtractionEngine,
    pub prioritizer: &'a SymptomPrioritizer,
    pub scorer: &'a ConfidenceScorer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseOutcome {
    /// Information still missing; stay in the phase.
    Stay,
    /// Phase satisfied; move to the next one.
    Advance,
    /// Move on and offer the same utterance to the next phase.
    AdvanceAndContinue,
}

pub(crate) type PhaseHandler = fn(&mut Session, &str, &PhaseContext<'_>) -> PhaseOutcome;

pub(crate) fn handler_for(phase: Phase) -> PhaseHandler {
    match phase {
        Phase::Greeting => greet,
        Phase::ChiefComplaint => collect_chief_complaint,
        Phase::PresentIllness => collect_present_illness,
        Phase::PastHistory => collect_past_history,
        Phase::PersonalHistory => collect_personal_history,
        Phase::FamilyHistory => collect_family_history,
        Phase::ReproductiveHistory => collect_reproductive_history,
        Phase::Review => review,
        Phase::Complete => terminal,
    }
}

/// Collected fields a new statement in `phase` may contradict, checked in order.
pub(crate) fn guarded_fields(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::PresentIllness => &["primary_symptom", "duration"],
        Phase::PastHistory => &["allergies", "medications"],
        Phase::PersonalHistory
        | Phase::FamilyHistory
        | Phase::ReproductiveHistory
        | Phase::Review => &["past_history", "allergies", "medications"],
        Phase::Greeting | Phase::ChiefComplaint | Phase::Complete => &[],
    }
}

/// Next phase in canonical order, skipping optional phases unless extended
/// history is enabled.
pub(crate) fn next_phase(current: Phase, extended: bool) -> Phase {
    let mut next = current.next();
    while next.is_optional() && !extended {
        next = next.next();
    }
    next
}

// ── Handlers ──

fn greet(_session: &mut Session, _text: &str, _ctx: &PhaseContext<'_>) -> PhaseOutcome {
    PhaseOutcome::AdvanceAndContinue
}

fn collect_chief_complaint(session: &mut Session, text: &str, ctx: &PhaseContext<'_>) -> PhaseOutcome {
    // Earlier turns may have named the symptom and this one the duration.
    let transcript = session.patient_transcript();
    let mut complaint = ctx.extraction.extract_chief_complaint(&transcript);
    let symptoms = ctx.prioritizer.extract_symptoms(&transcript);
    if complaint.symptom.is_none() {
        complaint.symptom = ctx.prioritizer.prioritize(&symptoms).into_iter().next();
    }
    let Some(symptom) = complaint.symptom.clone() else {
        return PhaseOutcome::Stay;
    };

    let score = ctx.scorer.score(text, FieldType::ChiefComplaint.as_str());
    if symptoms.is_empty() {
        session.set_field("primary_symptom", json!(symptom), score);
        session.set_field("secondary_symptoms", json!([]), score);
    } else {
        ctx.prioritizer.create_fork(session, &symptoms, score);
    }
    if let Some(duration) = &complaint.duration {
        session.set_field("duration", json!(duration), ctx.scorer.score(text, "duration"));
    }
    session.set_field(
        FieldType::ChiefComplaint.as_str(),
        ExtractedSection::ChiefComplaint(complaint).to_value(),
        score,
    );
    PhaseOutcome::Advance
}

fn collect_present_illness(session: &mut Session, text: &str, ctx: &PhaseContext<'_>) -> PhaseOutcome {
    let mut illness = ctx.extraction.extract_present_illness(text);
    if let Some(primary) = session.field_as_text("primary_symptom") {
        illness.associated_symptoms.retain(|s| *s != primary);
    }
    store_section(session, text, ctx, ExtractedSection::PresentIllness(illness))
}

fn collect_past_history(session: &mut Session, text: &str, ctx: &PhaseContext<'_>) -> PhaseOutcome {
    let history = ctx.extraction.extract_past_history(text);
    if !history.allergies.is_empty() {
        session.set_field(
            "allergies",
            json!(history.allergies.join(", ")),
            ctx.scorer.score(text, "allergies"),
        );
    }
    if !history.medications.is_empty() {
        session.set_field(
            "medications",
            json!(history.medications.join(", ")),
            ctx.scorer.score(text, "medications"),
        );
    }
    store_section(session, text, ctx, ExtractedSection::PastHistory(history))
}

fn collect_personal_history(session: &mut Session, text: &str, ctx: &PhaseContext<'_>) -> PhaseOutcome {
    let section = ctx.extraction.extract(text, FieldType::PersonalHistory);
    store_section(session, text, ctx, section)
}

fn collect_family_history(session: &mut Session, text: &str, ctx: &PhaseContext<'_>) -> PhaseOutcome {
    let section = ctx.extraction.extract(text, FieldType::FamilyHistory);
    store_section(session, text, ctx, section)
}

fn collect_reproductive_history(
    session: &mut Session,
    text: &str,
    ctx: &PhaseContext<'_>,
) -> PhaseOutcome {
    let section = ctx.extraction.extract(text, FieldType::ReproductiveHistory);
    store_section(session, text, ctx, section)
}

fn review(_session: &mut Session, text: &str, _ctx: &PhaseContext<'_>) -> PhaseOutcome {
    if text.trim().is_empty() {
        PhaseOutcome::Stay
    } else {
        PhaseOutcome::Advance
    }
}

fn terminal(_session: &mut Session, _text: &str, _ctx: &PhaseContext<'_>) -> PhaseOutcome {
    PhaseOutcome::Stay
}

fn store_section(
    session: &mut Session,
    text: &str,
    ctx: &PhaseContext<'_>,
    section: ExtractedSection,
) -> PhaseOutcome {
    if section.is_empty() {
        return PhaseOutcome::Stay;
    }
    let name = section.field_type().as_str();
    session.set_field(name, section.to_value(), ctx.scorer.score(text, name));
    PhaseOutcome::Advance
}

// ── Clarification ──

/// Take `text` as the patient's answer to `conflict` and overwrite the field.
/// The structured past-history section is merged instead, so unrelated
/// entries survive.
pub(crate) fn apply_clarification(
    session: &mut Session,
    conflict: &Conflict,
    text: &str,
    ctx: &PhaseContext<'_>,
) {
    let field = conflict.field.as_str();
    let statement = text.trim();
    let score = ctx.scorer.score(text, field);

    let value = match field {
        "allergies" => {
            let allergens = ctx.extraction.extract_allergies(text);
            json!(or_statement(allergens.join(", "), statement))
        }
        "medications" => {
            let medications = ctx.extraction.extract_medications(text);
            json!(or_statement(medications.join(", "), statement))
        }
        "primary_symptom" => {
            let symptoms = ctx.prioritizer.prioritize(&ctx.prioritizer.extract_symptoms(text));
            let symptom = or_statement(symptoms.into_iter().next().unwrap_or_default(), statement);
            update_chief_complaint(session, score, |cc| cc.symptom = Some(symptom.clone()));
            json!(symptom)
        }
        "duration" => {
            let duration = ctx.extraction.extract_chief_complaint(text).duration;
            let duration = or_statement(duration.unwrap_or_default(), statement);
            update_chief_complaint(session, score, |cc| cc.duration = Some(duration.clone()));
            json!(duration)
        }
        "past_history" => {
            let existing: PastHistory = session
                .collected
                .get(field)
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            let merged = merge_past_history(existing, ctx.extraction.extract_past_history(text));
            ExtractedSection::PastHistory(merged).to_value()
        }
        _ => json!(statement),
    };
    session.set_field(field, value, score);
}

/// Rewrite the stored chief complaint section, if any, so it agrees with a
/// clarified top-level field.
fn update_chief_complaint(session: &mut Session, score: f32, update: impl FnOnce(&mut ChiefComplaint)) {
    let name = FieldType::ChiefComplaint.as_str();
    let Some(mut complaint) = session
        .collected
        .get(name)
        .and_then(|v| serde_json::from_value::<ChiefComplaint>(v.clone()).ok())
    else {
        return;
    };
    update(&mut complaint);
    session.set_field(name, ExtractedSection::ChiefComplaint(complaint).to_value(), score);
}

fn or_statement(extracted: String, statement: &str) -> String {
    if extracted.is_empty() {
        statement.to_string()
    } else {
        extracted
    }
}

fn merge_past_history(mut existing: PastHistory, update: PastHistory) -> PastHistory {
    fn extend(into: &mut Vec<String>, from: Vec<String>) {
        for item in from {
            if !into.contains(&item) {
                into.push(item);
            }
        }
    }
    existing.notes = match (existing.notes.take(), update.notes) {
        (Some(old), Some(new)) => Some(format!("{old}\n{new}")),
        (old, new) => old.or(new),
    };
    extend(&mut existing.chronic_diseases, update.chronic_diseases);
    extend(&mut existing.surgeries, update.surgeries);
    extend(&mut existing.allergies, update.allergies);
    extend(&mut existing.medications, update.medications);
    existing
}
