//! Patient-facing copy. Wording only; no decisions are made here.

use crate::models::enums::{Intent, Phase};

pub const CLOSING: &str = "Thank you, that's everything I need for now. \
     Your doctor will review this summary before your visit.";

/// Question that collects the given phase's information.
pub fn prompt_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Greeting => {
            "Hello, I'll ask a few questions to prepare for your visit. What brings you in today?"
        }
        Phase::ChiefComplaint => {
            "What is the main symptom bothering you, and how long have you had it?"
        }
        Phase::PresentIllness => {
            "When did it start, and has it been getting better or worse? \
             Have you noticed any other symptoms along with it?"
        }
        Phase::PastHistory => {
            "Do you have any long-term conditions or past surgeries? \
             Please also tell me about any allergies and medicines you take regularly."
        }
        Phase::PersonalHistory => "Do you smoke or drink alcohol? What kind of work do you do?",
        Phase::FamilyHistory => {
            "Does anyone in your close family have conditions such as diabetes, heart disease or cancer?"
        }
        Phase::ReproductiveHistory => {
            "If it applies to you, is there anything about periods or pregnancy your doctor should know?"
        }
        Phase::Review => "Is there anything else you would like your doctor to know?",
        Phase::Complete => CLOSING,
    }
}

/// Acknowledge the answer and move to the phase now current.
pub fn advanced_to(phase: Phase) -> String {
    if phase.is_terminal() {
        return CLOSING.to_string();
    }
    format!("Thank you. {}", prompt_for(phase))
}

/// Nothing usable was found for the current phase.
pub fn need_more(phase: Phase) -> String {
    match phase {
        Phase::ChiefComplaint => format!(
            "I want to make sure I understand what's wrong. {}",
            prompt_for(phase)
        ),
        _ => format!("Could you tell me a little more? {}", prompt_for(phase)),
    }
}

/// Steer a question, complaint or off-topic remark back to the current phase.
pub fn redirect(intent: Intent, phase: Phase) -> String {
    let lead = match intent {
        Intent::Question => "That's a good question to raise with your doctor during the visit.",
        Intent::Complaint => "I'm sorry this is taking a while. There are only a few questions left.",
        Intent::IrrelevantChat => "Let's stay focused on your health so your visit goes smoothly.",
        Intent::Emotional | Intent::RelevantInfo => "",
    };
    if lead.is_empty() {
        return prompt_for(phase).to_string();
    }
    format!("{lead} {}", prompt_for(phase))
}

pub fn clarified(phase: Phase) -> String {
    format!("Thanks for clarifying, I've updated that. {}", prompt_for(phase))
}
