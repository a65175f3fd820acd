//! Per-trial response storage and CSV persistence.
//!
//! Tables are preallocated to the exact trial count and written once at
//! phase end. Cautious mode writes aside to a tagged filename instead of
//! overwriting an existing participant file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SessionError;

pub const RESPONSE_COLUMNS: [&str; 3] = ["Valence", "Arousal", "Reaction Time [s]"];

/// Fixed-shape response table: one row per trial, columns {valence, arousal,
/// reaction time}, plus the parallel list of stimulus identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTable {
    data: Vec<[f64; 3]>,
    image_ids: Vec<String>,
}

impl ResponseTable {
    pub fn new(rows: usize) -> Self {
        Self {
            data: vec![[0.0; 3]; rows],
            image_ids: vec![String::new(); rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.data.len()
    }

    /// Writes one trial. An out-of-range row is an error, never a silent
    /// no-op.
    pub fn record(
        &mut self,
        row: usize,
        image_id: &str,
        valence: f64,
        arousal: f64,
        reaction_secs: f64,
    ) -> Result<(), SessionError> {
        if row >= self.data.len() {
            return Err(SessionError::RowOutOfBounds {
                row,
                rows: self.data.len(),
            });
        }
        self.data[row] = [valence, arousal, reaction_secs];
        self.image_ids[row] = image_id.to_string();
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<(&str, [f64; 3])> {
        Some((self.image_ids.get(row)?.as_str(), *self.data.get(row)?))
    }
}

/// Writes participant CSV files under `<data_dir>/Participant_<id>/`.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    data_dir: PathBuf,
    cautious: bool,
}

impl ResponseRecorder {
    pub fn new(data_dir: impl Into<PathBuf>, cautious: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            cautious,
        }
    }

    pub fn participant_dir(&self, participant_id: u32) -> PathBuf {
        self.data_dir.join(format!("Participant_{participant_id}"))
    }

    /// Serializes a response table to `<id>_<label>.csv`, returning the path
    /// actually written.
    pub fn persist(
        &self,
        table: &ResponseTable,
        participant_id: u32,
        label: &str,
    ) -> Result<PathBuf, SessionError> {
        let mut out = String::from("Image ID");
        for column in RESPONSE_COLUMNS {
            out.push(',');
            out.push_str(&csv_field(column));
        }
        out.push('\n');
        for (image_id, values) in table.image_ids.iter().zip(&table.data) {
            out.push_str(&csv_field(image_id));
            for value in values {
                out.push_str(&format!(",{value}"));
            }
            out.push('\n');
        }
        self.write(participant_id, label, &out)
    }

    /// Two-column `Fields,Data` file for intake and survey instruments.
    pub fn persist_fields(
        &self,
        fields: &[String],
        values: &[String],
        participant_id: u32,
        label: &str,
    ) -> Result<PathBuf, SessionError> {
        let mut out = String::from("Fields,Data\n");
        for (field, value) in fields.iter().zip(values) {
            out.push_str(&format!("{},{}\n", csv_field(field), csv_field(value)));
        }
        self.write(participant_id, label, &out)
    }

    fn write(
        &self,
        participant_id: u32,
        label: &str,
        contents: &str,
    ) -> Result<PathBuf, SessionError> {
        let dir = self.participant_dir(participant_id);
        fs::create_dir_all(&dir)?;
        let path = self.resolve_target(&dir, participant_id, label);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// The target filename, or a tagged write-aside name when the target
    /// exists and cautious mode is on. The original file is never touched.
    fn resolve_target(&self, dir: &Path, participant_id: u32, label: &str) -> PathBuf {
        let target = dir.join(format!("{participant_id}_{label}.csv"));
        if !self.cautious || !target.exists() {
            return target;
        }
        println!(
            "[WARNING] - {} already exists. To keep data, I will save the current file under a different name.",
            target.display()
        );
        let aside = dir.join(format!(
            "{participant_id}_{label}_ID{}.csv",
            filename_tag()
        ));
        println!(
            "[INFO] - I have made a file called: {} with the current data",
            aside.display()
        );
        aside
    }
}

/// Tag for write-aside filenames, drawn from a stream seeded with the
/// current time so it does not perturb any experiment randomization.
fn filename_tag() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    StdRng::seed_from_u64(secs).random_range(0..1000)
}

/// Minimal CSV quoting: fields holding commas or quotes get wrapped, quotes
/// doubled. Survey prompts contain commas.
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn record_rejects_overflowing_rows() {
        let mut table = ResponseTable::new(2);
        table.record(0, "Asian_a", 0.5, -0.25, 1.2).unwrap();
        table.record(1, "Dutch_b", -1.0, 1.0, 0.8).unwrap();
        let err = table.record(2, "Molded_c", 0.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            SessionError::RowOutOfBounds { row: 2, rows: 2 }
        ));
        assert_eq!(table.row(0), Some(("Asian_a", [0.5, -0.25, 1.2])));
    }

    #[test]
    fn persist_writes_the_expected_csv() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path(), true);
        let mut table = ResponseTable::new(2);
        table.record(0, "Asian_rice", 0.5, 0.25, 1.5).unwrap();
        table.record(1, "Dutch_stamppot", -0.5, 0.75, 2.0).unwrap();

        let path = recorder.persist(&table, 7, "P1_EmojiGrid").unwrap();
        assert_eq!(
            path,
            dir.path().join("Participant_7").join("7_P1_EmojiGrid.csv")
        );
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Image ID,Valence,Arousal,Reaction Time [s]\n\
             Asian_rice,0.5,0.25,1.5\n\
             Dutch_stamppot,-0.5,0.75,2\n"
        );
    }

    #[test]
    fn cautious_save_never_touches_the_original() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path(), true);
        let mut table = ResponseTable::new(1);
        table.record(0, "Asian_soup", 1.0, 1.0, 0.5).unwrap();

        let first = recorder.persist(&table, 3, "P3_EmojiGrid").unwrap();
        let original = fs::read(&first).unwrap();

        let mut changed = ResponseTable::new(1);
        changed.record(0, "Asian_soup", -1.0, -1.0, 9.0).unwrap();
        let second = recorder.persist(&changed, 3, "P3_EmojiGrid").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), original, "byte-for-byte intact");
        let aside = fs::read_to_string(&second).unwrap();
        assert!(aside.contains("-1,-1,9"));
        let name = second.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("3_P3_EmojiGrid_ID") && name.ends_with(".csv"));
    }

    #[test]
    fn incautious_save_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path(), false);
        let table = ResponseTable::new(1);
        let first = recorder.persist(&table, 4, "Practice_EmojiGrid").unwrap();
        let second = recorder.persist(&table, 4, "Practice_EmojiGrid").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn survey_fields_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResponseRecorder::new(dir.path(), true);
        let fields = vec!["At dinner parties, I will try a new food.".to_string()];
        let values = vec!["6".to_string()];
        let path = recorder
            .persist_fields(&fields, &values, 2, "Neophobia")
            .unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Fields,Data\n\"At dinner parties, I will try a new food.\",6\n"
        );
    }
}
