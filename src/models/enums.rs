use serde::{Deserialize, Serialize};

/// Unknown string for a string-backed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Variant declaration order is the `Ord` order.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Intake phases in canonical order.
    Phase {
        Greeting => "greeting",
        ChiefComplaint => "chief_complaint",
        PresentIllness => "present_illness",
        PastHistory => "past_history",
        PersonalHistory => "personal_history",
        FamilyHistory => "family_history",
        ReproductiveHistory => "reproductive_history",
        Review => "review",
        Complete => "complete",
    }
);

impl Phase {
    pub const ORDER: [Phase; 9] = [
        Phase::Greeting,
        Phase::ChiefComplaint,
        Phase::PresentIllness,
        Phase::PastHistory,
        Phase::PersonalHistory,
        Phase::FamilyHistory,
        Phase::ReproductiveHistory,
        Phase::Review,
        Phase::Complete,
    ];

    /// The next phase in canonical order. `Complete` is its own successor.
    pub fn next(self) -> Phase {
        let idx = Self::ORDER.iter().position(|p| *p == self).unwrap_or(0);
        Self::ORDER
            .get(idx + 1)
            .copied()
            .unwrap_or(Phase::Complete)
    }

    /// Phases only visited when extended history collection is enabled.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Phase::PersonalHistory
                | Phase::FamilyHistory
                | Phase::ReproductiveHistory
                | Phase::Review
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Complete
    }
}

str_enum!(
    /// Who produced a conversation entry.
    Speaker {
        Patient => "patient",
        Assistant => "assistant",
    }
);

str_enum!(
    /// Emergency triage tier. Red is acute, Yellow urgent, Green routine.
    EmergencyLevel {
        Red => "red",
        Yellow => "yellow",
        Green => "green",
    }
);

str_enum!(
    ConflictRisk {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
);

str_enum!(
    /// Affect level detected on a single turn.
    EmotionLevel {
        Normal => "normal",
        Mild => "mild",
        Moderate => "moderate",
        Severe => "severe",
    }
);

str_enum!(
    /// What the patient is doing with a turn, in classification priority order.
    Intent {
        Emotional => "emotional",
        Complaint => "complaint",
        Question => "question",
        IrrelevantChat => "irrelevant_chat",
        RelevantInfo => "relevant_info",
    }
);

impl Intent {
    /// Turns with these intents are redirected instead of mined for fields.
    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            Intent::Complaint | Intent::Question | Intent::IrrelevantChat
        )
    }
}

str_enum!(
    ConfidenceLevel {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
);

str_enum!(
    /// Record sections the extraction engine knows how to fill.
    FieldType {
        ChiefComplaint => "chief_complaint",
        PresentIllness => "present_illness",
        PastHistory => "past_history",
        PersonalHistory => "personal_history",
        FamilyHistory => "family_history",
        ReproductiveHistory => "reproductive_history",
    }
);

impl FieldType {
    /// Sections every completed record must contain.
    pub const REQUIRED: [FieldType; 3] = [
        FieldType::ChiefComplaint,
        FieldType::PresentIllness,
        FieldType::PastHistory,
    ];
}
