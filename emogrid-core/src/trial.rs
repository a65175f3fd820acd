use serde::{Deserialize, Serialize};

/// Sub-steps of a single rating trial, in order.
///
/// `ResponseWait` is the only state without a fixed frame budget: it holds
/// until a qualifying pointer press lands inside the grid (or an optional
/// configured timeout elapses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Fixation,
    StimulusOnset,
    StimulusHold,
    ResponseWait,
    ResponseConfirm,
    Complete,
}

/// EmojiGrid click mapped onto the grid surface.
///
/// Valence and arousal run over [-1, 1] with the origin at the grid center;
/// (1, 1) is the top-right corner. Reaction time is measured from the moment
/// the response window opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridResponse {
    pub valence: f64,
    pub arousal: f64,
    pub reaction_secs: f64,
}

/// One completed trial, as handed to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub row: usize,
    pub category: usize,
    pub image_id: String,
    /// `None` when the response window timed out.
    pub response: Option<GridResponse>,
}
