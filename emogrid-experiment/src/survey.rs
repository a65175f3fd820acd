//! Survey instruments: intake fields, pre-session VAS questions and the
//! Food Neophobia Scale.

/// One Likert item. Reverse-scored items count disagreement toward the
/// neophobia total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyItem {
    pub prompt: &'static str,
    pub reverse_scored: bool,
}

/// The ten-item Food Neophobia Scale (Pliner & Hobden).
pub const FOOD_NEOPHOBIA_ITEMS: [SurveyItem; 10] = [
    SurveyItem {
        prompt: "I am constantly sampling new and different foods.",
        reverse_scored: true,
    },
    SurveyItem {
        prompt: "I don't trust new foods.",
        reverse_scored: false,
    },
    SurveyItem {
        prompt: "If I don't know what is in a food, I won't try it.",
        reverse_scored: false,
    },
    SurveyItem {
        prompt: "I like foods from different countries.",
        reverse_scored: true,
    },
    SurveyItem {
        prompt: "Ethnic food looks too weird to eat.",
        reverse_scored: false,
    },
    SurveyItem {
        prompt: "At dinner parties, I will try a new food.",
        reverse_scored: true,
    },
    SurveyItem {
        prompt: "I am afraid to eat things I have never had before.",
        reverse_scored: false,
    },
    SurveyItem {
        prompt: "I am very particular about the foods I will eat.",
        reverse_scored: false,
    },
    SurveyItem {
        prompt: "I will eat almost anything.",
        reverse_scored: true,
    },
    SurveyItem {
        prompt: "I like to try new ethnic restaurants.",
        reverse_scored: true,
    },
];

/// Agreement ratings run -3..=3; reversed items negate before the shift onto
/// the published 1..=7 scale.
pub fn neophobia_score(rating: i32, reverse_scored: bool) -> i32 {
    let rating = if reverse_scored { -rating } else { rating };
    rating + 4
}

/// Pre-session VAS questions with their labeled extremes, left to right.
pub const GENERAL_QUESTIONS: [(&str, [&str; 2]); 3] = [
    ("How hungry are you right now?", ["Not at all", "Extremely"]),
    ("How full do you feel right now?", ["Not at all", "Extremely"]),
    (
        "How familiar are you with Asian food?",
        ["Not at all", "Extremely"],
    ),
];

/// Raw VAS slider positions run over [-VAS_TICK_MAX, VAS_TICK_MAX].
pub const VAS_TICK_MAX: f64 = 15.0;

/// Normalizes a raw slider position to [-1, 1].
pub fn normalize_vas(raw: f64) -> f64 {
    raw / VAS_TICK_MAX
}

/// Intake fields the operator fills in before the session.
pub const INTAKE_FIELDS: [&str; 5] = [
    "Age",
    "Gender",
    "Height [cm]",
    "Weight [kg]",
    "Time since last meal [hours]",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_map_onto_one_to_seven() {
        assert_eq!(neophobia_score(-3, false), 1);
        assert_eq!(neophobia_score(3, false), 7);
        assert_eq!(neophobia_score(0, false), 4);
        // strong agreement with a reversed item is low neophobia
        assert_eq!(neophobia_score(3, true), 1);
        assert_eq!(neophobia_score(-3, true), 7);
    }

    #[test]
    fn scale_has_five_reversed_items() {
        let reversed = FOOD_NEOPHOBIA_ITEMS
            .iter()
            .filter(|i| i.reverse_scored)
            .count();
        assert_eq!(reversed, 5);
    }

    #[test]
    fn vas_normalization_covers_the_extremes() {
        assert_eq!(normalize_vas(VAS_TICK_MAX), 1.0);
        assert_eq!(normalize_vas(-VAS_TICK_MAX), -1.0);
        assert_eq!(normalize_vas(0.0), 0.0);
    }
}
