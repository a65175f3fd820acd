//! Participant ids and group membership.
//!
//! Ids come from a whitespace-delimited ledger of completed participants
//! (`#` starts a comment). Groups come from a one-off seeded, balanced
//! shuffle persisted next to the ledger; the assignment file is generated
//! once for the whole study and never regenerated implicitly.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::SessionError;

/// Experimental group, encoded 0/1 in the assignment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Engaged,
    Disengaged,
}

impl Group {
    pub fn code(self) -> u8 {
        match self {
            Group::Engaged => 0,
            Group::Disengaged => 1,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Group::Engaged),
            1 => Some(Group::Disengaged),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Group::Engaged => "Engaged",
            Group::Disengaged => "Disengaged",
        }
    }
}

/// Precomputed ordinal -> group mapping for the whole study population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    groups: Vec<Group>,
}

impl GroupAssignment {
    /// Seeded, balanced split of ordinals 1..=n.
    ///
    /// The ordinals are shuffled once; the first floor(n/2) land in the
    /// Disengaged group. For odd n a second draw from the same stream
    /// decides, with ~50/50 odds, which group takes the extra member.
    /// Identical (n, seed) reproduces the identical mapping.
    pub fn generate(n: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ordinals: Vec<usize> = (1..=n).collect();
        ordinals.shuffle(&mut rng);

        let half = n / 2;
        let disengaged = if n % 2 == 0 {
            half
        } else if rng.random_range(0..100) <= 50 {
            half
        } else {
            half + 1
        };

        let mut groups = vec![Group::Engaged; n];
        for &ordinal in &ordinals[..disengaged] {
            groups[ordinal - 1] = Group::Disengaged;
        }
        Self { groups }
    }

    pub fn population(&self) -> usize {
        self.groups.len()
    }

    /// (engaged, disengaged) member counts.
    pub fn counts(&self) -> (usize, usize) {
        let disengaged = self
            .groups
            .iter()
            .filter(|g| **g == Group::Disengaged)
            .count();
        (self.groups.len() - disengaged, disengaged)
    }

    pub fn group_of(&self, ordinal: u32) -> Result<Group, SessionError> {
        if ordinal == 0 || ordinal as usize > self.groups.len() {
            return Err(SessionError::OrdinalOutOfRange {
                ordinal,
                population: self.groups.len(),
            });
        }
        Ok(self.groups[ordinal as usize - 1])
    }

    /// Persists the assignment, one code per ordinal. Fails loudly if the
    /// file already exists: regenerating over a pre-registered assignment
    /// would silently break the study's balance.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if path.exists() {
            return Err(SessionError::GroupFileExists(path.to_path_buf()));
        }
        let mut out = String::new();
        for group in &self.groups {
            out.push_str(&format!("{}\n", group.code()));
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Reads an assignment back. Codes may be written as integers or floats.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = fs::read_to_string(path)?;
        let mut groups = Vec::new();
        for token in text.split_whitespace() {
            let parse_err = || SessionError::GroupFileParse {
                path: path.to_path_buf(),
                token: token.to_string(),
            };
            let value: f64 = token.parse().map_err(|_| parse_err())?;
            let group = Group::from_code(value as i64).ok_or_else(parse_err)?;
            groups.push(group);
        }
        Ok(Self { groups })
    }
}

/// Hands out sequential participant ids from the completion ledger.
#[derive(Debug, Clone)]
pub struct ParticipantAllocator {
    ledger_path: PathBuf,
    fallback_id: u32,
}

impl ParticipantAllocator {
    pub fn new(ledger_path: impl Into<PathBuf>, fallback_id: u32) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            fallback_id,
        }
    }

    /// `max(ledger) + 1`, or the configured fallback for a missing or empty
    /// ledger. A present-but-garbled entry is a fatal parse error.
    pub fn next_participant_id(&self) -> Result<u32, SessionError> {
        let ids = self.read_ledger()?;
        Ok(match ids.iter().max() {
            Some(&max) => max + 1,
            None => self.fallback_id,
        })
    }

    /// Appends a completed participant to the ledger. A fresh ledger gets a
    /// `0` sentinel row first; an id already present is not appended again.
    pub fn record_completion(&self, id: u32) -> Result<(), SessionError> {
        let ids = self.read_ledger()?;
        if ids.contains(&id) {
            println!(
                "[WARNING] - participant {} already recorded in {}",
                id,
                self.ledger_path.display()
            );
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)?;
        if ids.is_empty() {
            writeln!(file, "0")?;
        }
        writeln!(file, "{id}")?;
        Ok(())
    }

    fn read_ledger(&self) -> Result<Vec<u32>, SessionError> {
        if !self.ledger_path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.ledger_path)?;
        let mut ids = Vec::new();
        for line in text.lines() {
            let data = line.split('#').next().unwrap_or("");
            for token in data.split_whitespace() {
                let id: u32 = token.parse().map_err(|_| SessionError::LedgerParse {
                    path: self.ledger_path.clone(),
                    token: token.to_string(),
                })?;
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
