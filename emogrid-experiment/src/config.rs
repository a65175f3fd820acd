use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Session parameters. Defaults reproduce the study protocol; a JSON file
/// can override any subset of fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed study population the group assignment is generated for.
    pub population_size: usize,
    /// Seed for the one-off balanced group assignment.
    pub group_seed: u64,
    /// Added to the participant id to seed the Phase 3 randomization, so the
    /// two phases draw from distinct streams. Must exceed `population_size`.
    pub phase3_seed_offset: u64,
    pub category_names: Vec<String>,
    /// Images shown per category in each of the two image phases.
    pub images_per_phase: usize,
    pub fixation_secs: f64,
    pub stimulus_secs: f64,
    pub confirm_secs: f64,
    /// `None` blocks indefinitely on the participant, matching the original
    /// protocol; `Some(t)` completes the trial unanswered after `t` seconds.
    pub response_timeout_secs: Option<f64>,
    /// Rehearsal runs use participant id 0, skip ledger writes and disable
    /// cautious saving.
    pub rehearsal: bool,
    pub cautious_save: bool,
    pub data_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub groups_path: PathBuf,
    pub image_root: PathBuf,
    pub movie_root: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            population_size: 40,
            group_seed: 0,
            phase3_seed_offset: 1000,
            category_names: vec!["Asian".into(), "Dutch".into(), "Molded".into()],
            images_per_phase: 3,
            fixation_secs: 0.2,
            stimulus_secs: 3.0,
            confirm_secs: 0.5,
            response_timeout_secs: None,
            rehearsal: false,
            cautious_save: true,
            data_dir: "ExpData".into(),
            ledger_path: "LoP.txt".into(),
            groups_path: "Groups.txt".into(),
            image_root: "Images".into(),
            movie_root: "Movies".into(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Participant id used when the ledger is missing or empty.
    pub fn fallback_participant_id(&self) -> u32 {
        if self.rehearsal { 0 } else { 1 }
    }

    /// Trials per image phase: every category once per presentation position.
    pub fn trials_per_phase(&self) -> usize {
        self.images_per_phase * self.category_names.len()
    }
}
