//! Frame-driven trial sequencing for one image phase.
//!
//! The sequencer walks the interleaving matrix row-major: presentation
//! position `i`, slot `c` shows category `order[i][c]`'s image `i`. Each
//! `tick()` advances one display refresh and returns the work for that
//! frame in emission order; a marker event always precedes the visual
//! change it annotates, so pushing samples in order keeps the stream
//! aligned with stimulus onset.

use emogrid_core::{GridResponse, ImageStimulus, Marker, StimulusPool, TrialRecord, TrialState};
use emogrid_timing::FrameClock;

/// Trial timing in seconds of display time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialTiming {
    pub fixation_secs: f64,
    pub stimulus_secs: f64,
    pub confirm_secs: f64,
    /// `None` waits indefinitely for a qualifying press.
    pub response_timeout_secs: Option<f64>,
}

/// What the driver must do this frame, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    Marker(Marker),
    ShowFixation,
    ShowStimulus {
        category: usize,
        image: ImageStimulus,
    },
    /// The response window is open; forward the next qualifying grid press
    /// via [`TrialSequencer::grid_press`].
    OpenResponse,
    /// Visual confirmation of the click location.
    ConfirmResponse(GridResponse),
    TrialFinished(TrialRecord),
    PhaseFinished,
}

pub struct TrialSequencer {
    pool: StimulusPool,
    order: Vec<Vec<usize>>,
    timing: TrialTiming,
    clock: FrameClock,

    position: usize,
    slot: usize,
    state: TrialState,
    frames_in_state: u32,
    pending_response: Option<GridResponse>,
    finished: bool,
}

impl TrialSequencer {
    /// `pool` holds the randomized per-category images for this phase;
    /// `order` is its interleaving matrix (`order.len()` presentation
    /// positions, each row a permutation of the category indices).
    pub fn new(
        pool: StimulusPool,
        order: Vec<Vec<usize>>,
        timing: TrialTiming,
        clock: FrameClock,
    ) -> Self {
        let finished = order.is_empty() || pool.num_categories() == 0;
        Self {
            pool,
            order,
            timing,
            clock,
            position: 0,
            slot: 0,
            state: if finished {
                TrialState::Complete
            } else {
                TrialState::Fixation
            },
            frames_in_state: 0,
            pending_response: None,
            finished,
        }
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn num_trials(&self) -> usize {
        self.order.len() * self.pool.num_categories()
    }

    /// Row index of the current trial in the response table.
    pub fn row(&self) -> usize {
        self.position * self.pool.num_categories() + self.slot
    }

    fn current_category(&self) -> usize {
        self.order[self.position][self.slot]
    }

    fn current_image(&self) -> &ImageStimulus {
        let category = self.current_category();
        &self.pool.categories[category].images[self.position]
    }

    /// `<Category>_<image id>`, the identifier written to the response file.
    fn current_image_id(&self) -> String {
        let category = self.current_category();
        format!(
            "{}_{}",
            self.pool.categories[category].name,
            self.current_image().id
        )
    }

    /// Advance one display refresh.
    pub fn tick(&mut self) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        match self.state {
            TrialState::Fixation => {
                if self.frames_in_state == 0 {
                    events.push(SequencerEvent::Marker(Marker::Fixation));
                    events.push(SequencerEvent::ShowFixation);
                }
                self.frames_in_state += 1;
                if self.frames_in_state >= self.clock.frames_for(self.timing.fixation_secs) {
                    self.enter(TrialState::StimulusOnset);
                }
            }
            TrialState::StimulusOnset => {
                let category = self.current_category();
                events.push(SequencerEvent::Marker(Marker::Image(category)));
                events.push(SequencerEvent::ShowStimulus {
                    category,
                    image: self.current_image().clone(),
                });
                self.enter(TrialState::StimulusHold);
                self.frames_in_state = 1;
            }
            TrialState::StimulusHold => {
                self.frames_in_state += 1;
                if self.frames_in_state >= self.clock.frames_for(self.timing.stimulus_secs) {
                    self.enter(TrialState::ResponseWait);
                    events.push(SequencerEvent::OpenResponse);
                }
            }
            TrialState::ResponseWait => {
                self.frames_in_state += 1;
                if let Some(timeout) = self.timing.response_timeout_secs {
                    if self.frames_in_state >= self.clock.frames_for(timeout) {
                        let record = TrialRecord {
                            row: self.row(),
                            category: self.current_category(),
                            image_id: self.current_image_id(),
                            response: None,
                        };
                        events.push(SequencerEvent::TrialFinished(record));
                        self.advance(&mut events);
                    }
                }
            }
            TrialState::ResponseConfirm => {
                if self.frames_in_state == 0 {
                    if let Some(response) = self.pending_response {
                        events.push(SequencerEvent::ConfirmResponse(response));
                    }
                }
                self.frames_in_state += 1;
                if self.frames_in_state >= self.clock.frames_for(self.timing.confirm_secs) {
                    let record = TrialRecord {
                        row: self.row(),
                        category: self.current_category(),
                        image_id: self.current_image_id(),
                        response: self.pending_response,
                    };
                    events.push(SequencerEvent::TrialFinished(record));
                    self.advance(&mut events);
                }
            }
            TrialState::Complete => {}
        }

        events
    }

    /// A qualifying pointer press inside the grid. Returns false (and drops
    /// the press) outside the response window.
    pub fn grid_press(&mut self, response: GridResponse) -> bool {
        if self.state != TrialState::ResponseWait {
            return false;
        }
        self.pending_response = Some(response);
        self.enter(TrialState::ResponseConfirm);
        true
    }

    fn enter(&mut self, state: TrialState) {
        self.state = state;
        self.frames_in_state = 0;
    }

    fn advance(&mut self, events: &mut Vec<SequencerEvent>) {
        self.pending_response = None;
        self.slot += 1;
        if self.slot >= self.pool.num_categories() {
            self.slot = 0;
            self.position += 1;
        }
        if self.position >= self.order.len() {
            self.finished = true;
            self.state = TrialState::Complete;
            events.push(SequencerEvent::PhaseFinished);
        } else {
            self.enter(TrialState::Fixation);
        }
    }
}

#[cfg(test)]
mod tests {
    use emogrid_core::CategoryPool;

    use super::*;

    fn pool() -> StimulusPool {
        StimulusPool {
            categories: (0..3)
                .map(|c| CategoryPool {
                    name: format!("cat{c}"),
                    images: (0..2)
                        .map(|i| ImageStimulus::new(format!("img{i}"), format!("{c}/{i}.jpg")))
                        .collect(),
                })
                .collect(),
        }
    }

    fn timing() -> TrialTiming {
        TrialTiming {
            fixation_secs: 0.2,
            stimulus_secs: 0.1,
            confirm_secs: 0.1,
            response_timeout_secs: None,
        }
    }

    fn press() -> GridResponse {
        GridResponse {
            valence: 0.5,
            arousal: -0.5,
            reaction_secs: 1.0,
        }
    }

    /// Runs one full trial, answering as soon as the window opens, and
    /// returns every event seen.
    fn run_one_trial(seq: &mut TrialSequencer) -> Vec<SequencerEvent> {
        let mut seen = Vec::new();
        for _ in 0..1000 {
            let events = seq.tick();
            let respond = events.contains(&SequencerEvent::OpenResponse);
            let done = events
                .iter()
                .any(|e| matches!(e, SequencerEvent::TrialFinished(_)));
            seen.extend(events);
            if respond {
                assert!(seq.grid_press(press()));
            }
            if done {
                return seen;
            }
        }
        panic!("trial did not finish");
    }

    #[test]
    fn markers_precede_their_visual_events() {
        let order = vec![vec![2, 0, 1], vec![1, 2, 0]];
        let mut seq = TrialSequencer::new(pool(), order, timing(), FrameClock::new(60.0));
        let events = run_one_trial(&mut seq);

        let fix_marker = events
            .iter()
            .position(|e| *e == SequencerEvent::Marker(Marker::Fixation))
            .unwrap();
        let fix_visual = events
            .iter()
            .position(|e| *e == SequencerEvent::ShowFixation)
            .unwrap();
        assert!(fix_marker < fix_visual);

        let image_marker = events
            .iter()
            .position(|e| *e == SequencerEvent::Marker(Marker::Image(2)))
            .unwrap();
        let image_visual = events
            .iter()
            .position(|e| matches!(e, SequencerEvent::ShowStimulus { category: 2, .. }))
            .unwrap();
        assert!(image_marker < image_visual);
        assert!(fix_visual < image_marker, "fixation comes first");
    }

    #[test]
    fn walks_the_interleaving_row_major() {
        let order = vec![vec![2, 0, 1], vec![1, 2, 0]];
        let mut seq = TrialSequencer::new(pool(), order.clone(), timing(), FrameClock::new(60.0));
        assert_eq!(seq.num_trials(), 6);

        let mut shown = Vec::new();
        while !seq.is_finished() {
            for event in run_one_trial(&mut seq) {
                if let SequencerEvent::TrialFinished(record) = event {
                    shown.push((record.row, record.category, record.image_id));
                }
            }
        }
        assert_eq!(
            shown,
            vec![
                (0, 2, "cat2_img0".to_string()),
                (1, 0, "cat0_img0".to_string()),
                (2, 1, "cat1_img0".to_string()),
                (3, 1, "cat1_img1".to_string()),
                (4, 2, "cat2_img1".to_string()),
                (5, 0, "cat0_img1".to_string()),
            ]
        );
    }

    #[test]
    fn timed_states_advance_by_frame_counts() {
        let order = vec![vec![0, 1, 2]];
        let mut seq = TrialSequencer::new(pool(), order, timing(), FrameClock::new(60.0));

        // fixation: 0.2 s at 60 Hz = 12 frames
        let first = seq.tick();
        assert!(first.contains(&SequencerEvent::ShowFixation));
        for _ in 0..11 {
            assert!(seq.tick().is_empty());
        }
        assert_eq!(seq.state(), TrialState::StimulusOnset);

        // onset frame emits the stimulus, hold runs 0.1 s = 6 frames total
        let onset = seq.tick();
        assert!(matches!(onset[1], SequencerEvent::ShowStimulus { .. }));
        for _ in 0..4 {
            assert!(seq.tick().is_empty());
        }
        assert_eq!(seq.tick(), vec![SequencerEvent::OpenResponse]);
        assert_eq!(seq.state(), TrialState::ResponseWait);
    }

    #[test]
    fn response_wait_blocks_without_timeout() {
        let order = vec![vec![0, 1, 2]];
        let mut seq = TrialSequencer::new(pool(), order, timing(), FrameClock::new(60.0));
        while seq.state() != TrialState::ResponseWait {
            seq.tick();
        }
        for _ in 0..10_000 {
            assert!(seq.tick().is_empty());
        }
        assert_eq!(seq.state(), TrialState::ResponseWait);
        assert!(seq.grid_press(press()));
        assert_eq!(seq.state(), TrialState::ResponseConfirm);
    }

    #[test]
    fn press_confirmation_shows_between_response_and_finish() {
        let order = vec![vec![0, 1, 2]];
        let mut seq = TrialSequencer::new(pool(), order, timing(), FrameClock::new(60.0));
        let events = run_one_trial(&mut seq);

        let open = events
            .iter()
            .position(|e| *e == SequencerEvent::OpenResponse)
            .unwrap();
        let confirm = events
            .iter()
            .position(|e| *e == SequencerEvent::ConfirmResponse(press()))
            .expect("the answered press must be confirmed on screen");
        let finished = events
            .iter()
            .position(|e| matches!(e, SequencerEvent::TrialFinished(_)))
            .unwrap();
        assert!(open < confirm);
        assert!(confirm < finished);
    }

    #[test]
    fn presses_outside_the_window_are_dropped() {
        let order = vec![vec![0, 1, 2]];
        let mut seq = TrialSequencer::new(pool(), order, timing(), FrameClock::new(60.0));
        assert_eq!(seq.state(), TrialState::Fixation);
        assert!(!seq.grid_press(press()));
        assert_eq!(seq.state(), TrialState::Fixation);
    }

    #[test]
    fn configured_timeout_finishes_the_trial_unanswered() {
        let order = vec![vec![0, 1, 2]];
        let timing = TrialTiming {
            response_timeout_secs: Some(0.5),
            ..timing()
        };
        let mut seq = TrialSequencer::new(pool(), order, timing, FrameClock::new(60.0));
        while seq.state() != TrialState::ResponseWait {
            seq.tick();
        }
        let mut finished = None;
        for _ in 0..60 {
            for event in seq.tick() {
                if let SequencerEvent::TrialFinished(record) = event {
                    finished = Some(record);
                }
            }
            if finished.is_some() {
                break;
            }
        }
        let record = finished.expect("timeout should finish the trial");
        assert_eq!(record.response, None);
        assert_eq!(record.row, 0);
        assert_eq!(seq.state(), TrialState::Fixation);
    }

    #[test]
    fn empty_order_is_immediately_finished() {
        let seq = TrialSequencer::new(pool(), Vec::new(), timing(), FrameClock::new(60.0));
        assert!(seq.is_finished());
    }
}
