//! Error types for session preparation and recording.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable entry {token:?} in participant ledger {path}")]
    LedgerParse { path: PathBuf, token: String },

    #[error("group assignment {0} already exists; refusing to regenerate a pre-registered assignment")]
    GroupFileExists(PathBuf),

    #[error("unreadable entry {token:?} in group assignment {path}")]
    GroupFileParse { path: PathBuf, token: String },

    #[error("participant ordinal {ordinal} outside the assigned population of {population}")]
    OrdinalOutOfRange { ordinal: u32, population: usize },

    #[error("unequal stimulus counts across categories and/or phases")]
    UnequalStimulusCounts,

    #[error("category {category:?} holds {available} stimuli, but both phases need {needed}")]
    PhaseSplit {
        category: String,
        available: usize,
        needed: usize,
    },

    #[error("trial row {row} outside response table of {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
