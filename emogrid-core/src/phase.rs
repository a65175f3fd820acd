/// Session segments, in protocol order.
///
/// Phase 1 and Phase 3 present the counterbalanced image sets; the Movie
/// segment sits between them.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Welcome,
    GeneralQuestions,
    Neophobia,
    Practice,
    Phase1,
    Movie,
    Phase3,
    Debrief,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Welcome
    }
}

impl SessionPhase {
    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Welcome => GeneralQuestions,
            GeneralQuestions => Neophobia,
            Neophobia => Practice,
            Practice => Phase1,
            Phase1 => Movie,
            Movie => Phase3,
            Phase3 => Debrief,
            Debrief => return None,
        })
    }

    /// Segments that show images and collect EmojiGrid ratings.
    pub fn presents_images(&self) -> bool {
        matches!(
            self,
            SessionPhase::Practice | SessionPhase::Phase1 | SessionPhase::Phase3
        )
    }

    /// Segments whose image order is counterbalanced per participant.
    pub fn is_counterbalanced(&self) -> bool {
        matches!(self, SessionPhase::Phase1 | SessionPhase::Phase3)
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, SessionPhase::Practice)
    }

    /// Label used in per-participant output filenames, where one exists.
    pub fn file_label(&self) -> Option<&'static str> {
        match self {
            SessionPhase::Practice => Some("Practice_EmojiGrid"),
            SessionPhase::Phase1 => Some("P1_EmojiGrid"),
            SessionPhase::Phase3 => Some("P3_EmojiGrid"),
            _ => None,
        }
    }
}
