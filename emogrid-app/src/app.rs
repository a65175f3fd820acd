use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use emogrid_core::{
    CategoryPool, ImageStimulus, Marker, MarkerOutlet, MarkerVocabulary, StimulusPool,
    StreamIdentity,
};
use emogrid_experiment::survey::{
    FOOD_NEOPHOBIA_ITEMS, GENERAL_QUESTIONS, INTAKE_FIELDS, VAS_TICK_MAX, neophobia_score,
    normalize_vas,
};
use emogrid_experiment::{
    Group, GroupAssignment, ParticipantAllocator, ResponseRecorder, ResponseTable, SequencerEvent,
    SessionConfig, TrialSequencer, TrialTiming, build_category_interleaving, check_num_stim,
    randomize_within_category, split_into_phases,
};
use emogrid_timing::{FrameClock, SessionTimer, Timer};

use crate::console::{Console, FileOutlet, PressPoll};

#[derive(Debug, Parser)]
#[command(name = "emogrid", about = "EmojiGrid food-affect experiment session driver")]
pub struct Args {
    /// Rehearsal mode: participant id 0, no ledger writes, cautious save off
    #[arg(long)]
    pub rehearsal: bool,
    /// Generate a fresh group assignment file (refuses to overwrite one)
    #[arg(long)]
    pub generate_groups: bool,
    /// JSON session configuration; defaults reproduce the study protocol
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Root directory holding the image folders, ledger and group files
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Display refresh rate in Hz
    #[arg(long, default_value_t = 60.0)]
    pub refresh_hz: f64,
}

pub struct Session {
    config: SessionConfig,
    root: PathBuf,
    clock: FrameClock,
    timer: SessionTimer,
    console: Console,
    allocator: ParticipantAllocator,
    recorder: ResponseRecorder,
    vocabulary: MarkerVocabulary,
    outlet: FileOutlet,
    participant_id: u32,
    group: Group,
}

impl Session {
    pub fn new(args: Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SessionConfig::default(),
        };
        config.rehearsal |= args.rehearsal;

        let root = args.root.clone();
        let groups_path = root.join(&config.groups_path);
        if args.generate_groups {
            let assignment = GroupAssignment::generate(config.population_size, config.group_seed);
            assignment.save(&groups_path)?;
            println!(
                "[INFO] - generated group assignment for {} participants in {}",
                config.population_size,
                groups_path.display()
            );
        }
        let assignment = GroupAssignment::load(&groups_path).with_context(|| {
            format!(
                "loading group assignment {} (run once with --generate-groups to create it)",
                groups_path.display()
            )
        })?;

        let allocator = ParticipantAllocator::new(
            root.join(&config.ledger_path),
            config.fallback_participant_id(),
        );
        let participant_id = allocator.next_participant_id()?;
        // id 0 is the rehearsal slot, outside the assigned population
        let group = if participant_id == 0 {
            Group::Engaged
        } else {
            assignment.group_of(participant_id)?
        };

        let cautious = config.cautious_save && !config.rehearsal;
        let recorder = ResponseRecorder::new(root.join(&config.data_dir), cautious);

        let vocabulary = MarkerVocabulary::new(&config.category_names);
        let participant_dir = recorder.participant_dir(participant_id);
        fs::create_dir_all(&participant_dir)?;
        let outlet = FileOutlet::create(&participant_dir.join("markers.tsv"), &StreamIdentity::default())?;

        Ok(Self {
            clock: FrameClock::new(args.refresh_hz),
            timer: SessionTimer::new(args.refresh_hz),
            console: Console::new(),
            allocator,
            recorder,
            vocabulary,
            outlet,
            participant_id,
            group,
            config,
            root,
        })
    }

    pub fn run(mut self) -> Result<()> {
        println!("=== EMOGRID EXPERIMENT SESSION ===");
        if self.config.rehearsal {
            println!("[INFO] - RUNNING IN REHEARSAL MODE, DEFAULTING TO PARTICIPANT ID = 0");
        }
        println!(
            "[INFO] - Running experiment for participant {} ({} group)",
            self.participant_id,
            self.group.name()
        );

        // Stimulus discovery and count validation come first: a bad pool
        // must abort before anything is shown or streamed.
        let pool = self.build_pool()?;
        let (shuffle_seed, phase1_seed, phase3_seed) =
            randomization_seeds(self.participant_id, self.config.phase3_seed_offset);
        let randomized = randomize_within_category(&pool, shuffle_seed);
        let (phase1, phase3) = split_into_phases(&randomized.pool, self.config.images_per_phase)?;
        let per_phase = check_num_stim(&[&phase1, &phase3]);
        if per_phase == 0 {
            bail!(emogrid_experiment::SessionError::UnequalStimulusCounts);
        }
        let num_categories = pool.num_categories();
        let mut order_rng = StdRng::seed_from_u64(phase1_seed);
        let phase1_order = build_category_interleaving(per_phase, num_categories, &mut order_rng);
        let mut order_rng = StdRng::seed_from_u64(phase3_seed);
        let phase3_order = build_category_interleaving(per_phase, num_categories, &mut order_rng);

        // Intake dialog; cancelling here aborts before any marker is sent.
        let fixed = vec![
            ("Participant ID".to_string(), self.participant_id.to_string()),
            ("Group".to_string(), self.group.name().to_string()),
        ];
        let Some(answers) = self.console.intake(&fixed, &INTAKE_FIELDS)? else {
            println!("[INFO] - User cancelled - Experiment aborted");
            return Ok(());
        };
        let mut fields: Vec<String> = fixed.iter().map(|(f, _)| f.clone()).collect();
        let mut values: Vec<String> = fixed.iter().map(|(_, v)| v.clone()).collect();
        for (field, value) in answers {
            fields.push(field);
            values.push(value);
        }

        // Persist the marker table so recordings can be decoded later.
        let codes: Vec<String> = (0..self.vocabulary.len()).map(|c| c.to_string()).collect();
        self.recorder.persist_fields(
            self.vocabulary.labels(),
            &codes,
            self.participant_id,
            "Markers",
        )?;

        self.push(Marker::Sound);
        println!("[INFO] - cue tone");

        // General VAS questions
        if !self
            .console
            .wait_continue("[GENERAL QUESTIONS] - Press Enter to begin general questions")?
        {
            return self.abort();
        }
        self.push(Marker::GeneralQuestions);
        self.push(Marker::Sound);
        for (question, labels) in GENERAL_QUESTIONS {
            let Some(raw) = self.console.vas(question, labels, VAS_TICK_MAX)? else {
                return self.abort();
            };
            fields.push(question.to_string());
            values.push(normalize_vas(raw).to_string());
        }
        self.recorder
            .persist_fields(&fields, &values, self.participant_id, "General_Data")?;

        // Food Neophobia Scale
        if !self
            .console
            .wait_continue("[NEOPHOBIA SURVEY] - Press Enter to begin the Food Neophobia Survey")?
        {
            return self.abort();
        }
        self.push(Marker::Neophobia);
        let mut fns_fields = Vec::with_capacity(FOOD_NEOPHOBIA_ITEMS.len());
        let mut fns_values = Vec::with_capacity(FOOD_NEOPHOBIA_ITEMS.len());
        for item in FOOD_NEOPHOBIA_ITEMS {
            let Some(rating) = self.console.likert(item.prompt)? else {
                return self.abort();
            };
            fns_fields.push(item.prompt.to_string());
            fns_values.push(neophobia_score(rating, item.reverse_scored).to_string());
        }
        self.recorder
            .persist_fields(&fns_fields, &fns_values, self.participant_id, "Neophobia")?;

        // Practice trials with the EmojiGrid
        if !self
            .console
            .wait_continue("[PRACTICE] - Press Enter to begin practice trials")?
        {
            return self.abort();
        }
        self.console
            .show_text("The Practice trials will begin shortly...");
        if !self.run_practice()? {
            return self.abort();
        }
        self.console
            .show_text("End of practice. The experiment will begin shortly...");

        // Phase 1: first counterbalanced image set
        if !self
            .console
            .wait_continue("[PHASE 1] - Press Enter to begin the experiment")?
        {
            return self.abort();
        }
        self.push(Marker::Start);
        if !self.run_image_phase(phase1, phase1_order, "P1_EmojiGrid")? {
            return self.abort();
        }
        self.console.show_text("Mobile AAT Phase");
        println!("[PHASE 1] - END");

        // Phase 2: movies
        if !self
            .console
            .wait_continue("[PHASE 2] - Press Enter to begin the movie")?
        {
            return self.abort();
        }
        self.push(Marker::Play);
        for movie in self.scan_movies()? {
            self.push(Marker::Movie);
            if !self.console.play_movie(&movie)? {
                return self.abort();
            }
        }
        self.push(Marker::Pause);
        println!("[PHASE 2] - END");

        // Phase 3: second counterbalanced image set
        if !self
            .console
            .wait_continue("[PHASE 3] - Press Enter to begin")?
        {
            return self.abort();
        }
        self.push(Marker::Play);
        if !self.run_image_phase(phase3, phase3_order, "P3_EmojiGrid")? {
            return self.abort();
        }
        self.console.show_text("Mobile AAT Phase");
        println!("[PHASE 3] - END");

        if !self.config.rehearsal {
            self.allocator.record_completion(self.participant_id)?;
        }
        println!("Dropped frames were {}", self.timer.dropped_frames());
        println!("Experiment end.");
        Ok(())
    }

    /// One counterbalanced image phase, frame by frame. Returns false when
    /// the operator quit mid-phase.
    fn run_image_phase(
        &mut self,
        pool: StimulusPool,
        order: Vec<Vec<usize>>,
        label: &str,
    ) -> Result<bool> {
        let timing = TrialTiming {
            fixation_secs: self.config.fixation_secs,
            stimulus_secs: self.config.stimulus_secs,
            confirm_secs: self.config.confirm_secs,
            response_timeout_secs: self.config.response_timeout_secs,
        };
        let mut sequencer = TrialSequencer::new(pool, order, timing, self.clock);
        let mut table = ResponseTable::new(sequencer.num_trials());
        let frame = self.clock.frame_duration();

        let mut response_open: Option<u64> = None;
        while !sequencer.is_finished() {
            let frame_start = self.timer.now();
            for event in sequencer.tick() {
                match event {
                    SequencerEvent::Marker(marker) => self.push(marker),
                    SequencerEvent::ShowFixation => self.console.show_fixation(),
                    SequencerEvent::ShowStimulus { image, .. } => self.console.show_image(&image),
                    SequencerEvent::OpenResponse => {
                        self.console.open_grid();
                        response_open = Some(self.timer.now());
                    }
                    SequencerEvent::ConfirmResponse(response) => {
                        self.console.show_confirmation(&response)
                    }
                    SequencerEvent::TrialFinished(record) => {
                        response_open = None;
                        match record.response {
                            Some(r) => table.record(
                                record.row,
                                &record.image_id,
                                r.valence,
                                r.arousal,
                                r.reaction_secs,
                            )?,
                            None => println!(
                                "[INFO] - trial {} timed out without a response",
                                record.row
                            ),
                        }
                    }
                    SequencerEvent::PhaseFinished => {}
                }
            }
            // during the response window the frame wait doubles as the input
            // poll, so a configured timeout keeps ticking down
            if let Some(opened) = response_open {
                match self.console.poll_press(&self.timer, opened, frame)? {
                    PressPoll::Press(response) => {
                        response_open = None;
                        sequencer.grid_press(response);
                    }
                    PressPoll::Pending => {}
                    PressPoll::Quit => return Ok(false),
                }
            } else {
                self.timer.sleep(frame);
            }
            let elapsed = self.timer.elapsed(frame_start);
            self.timer.record_frame(elapsed);
        }

        self.push(Marker::Pause);
        self.recorder.persist(&table, self.participant_id, label)?;
        Ok(true)
    }

    /// Practice trials run the same fixation/image/grid steps without
    /// per-trial markers; only the phase itself is marked.
    fn run_practice(&mut self) -> Result<bool> {
        let practice_dir = self.root.join(&self.config.image_root).join("Practice");
        let images = scan_images(&practice_dir)?;
        if images.is_empty() {
            println!("[WARNING] - no practice images found in {}", practice_dir.display());
        }
        self.push(Marker::Practice);

        let fixation = frame_quantized(self.clock, self.config.fixation_secs);
        let hold = frame_quantized(self.clock, self.config.stimulus_secs);
        let frame = self.clock.frame_duration();
        let mut table = ResponseTable::new(images.len());
        for (row, image) in images.iter().enumerate() {
            self.console.show_fixation();
            self.timer.sleep(fixation);
            self.console.show_image(image);
            self.timer.sleep(hold);
            self.console.open_grid();
            let opened = self.timer.now();
            let response = loop {
                match self.console.poll_press(&self.timer, opened, frame)? {
                    PressPoll::Press(response) => break response,
                    PressPoll::Pending => {}
                    PressPoll::Quit => return Ok(false),
                }
            };
            table.record(
                row,
                &format!("Practice_{}", image.id),
                response.valence,
                response.arousal,
                response.reaction_secs,
            )?;
        }
        self.recorder
            .persist(&table, self.participant_id, "Practice_EmojiGrid")?;
        Ok(true)
    }

    fn build_pool(&self) -> Result<StimulusPool> {
        let image_root = self.root.join(&self.config.image_root);
        let mut categories = Vec::with_capacity(self.config.category_names.len());
        for name in &self.config.category_names {
            let dir = image_root.join(name);
            let images = scan_images(&dir)
                .with_context(|| format!("scanning stimulus category {}", dir.display()))?;
            categories.push(CategoryPool {
                name: name.clone(),
                images,
            });
        }
        Ok(StimulusPool { categories })
    }

    fn scan_movies(&self) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(&self.config.movie_root);
        if !dir.is_dir() {
            println!("[WARNING] - no movie folder at {}", dir.display());
            return Ok(Vec::new());
        }
        let mut movies = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if has_extension(&path, &["mp4", "mov", "avi"]) {
                movies.push(path);
            }
        }
        movies.sort();
        Ok(movies)
    }

    fn push(&mut self, marker: Marker) {
        self.outlet.push_sample(self.vocabulary.code(marker));
    }

    fn abort(&self) -> Result<()> {
        println!("[INFO] - Experiment aborted");
        Ok(())
    }
}

/// Seeds for the three per-participant randomization streams: the
/// within-category shuffle, the phase-1 interleaving and the phase-3
/// interleaving. The shuffle seed sits in its own domain above the
/// id/offset range, so none of the generators share a stream.
fn randomization_seeds(participant_id: u32, phase3_offset: u64) -> (u64, u64, u64) {
    let id = participant_id as u64;
    ((1 << 32) | id, id, id + phase3_offset)
}

fn frame_quantized(clock: FrameClock, secs: f64) -> std::time::Duration {
    clock.frame_duration() * clock.frames_for(secs)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files in `dir`, sorted by id for deterministic pool order.
fn scan_images(dir: &Path) -> Result<Vec<ImageStimulus>> {
    let mut images = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("reading image folder {}", dir.display()))?
    {
        let path = entry?.path();
        if !has_extension(&path, &["jpg", "jpeg", "png"]) {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        images.push(ImageStimulus::new(id, path));
    }
    images.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randomization_streams_are_domain_separated() {
        for id in [0, 1, 7, 39] {
            for offset in [41, 1000, 5000] {
                let (shuffle, phase1, phase3) = randomization_seeds(id, offset);
                assert_ne!(shuffle, phase1);
                assert_ne!(shuffle, phase3);
                assert_ne!(phase1, phase3);
            }
        }
    }
}
