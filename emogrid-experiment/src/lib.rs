pub mod allocator;
pub mod config;
pub mod error;
pub mod randomizer;
pub mod recorder;
pub mod sequencer;
pub mod survey;

pub use allocator::{Group, GroupAssignment, ParticipantAllocator};
pub use config::SessionConfig;
pub use error::SessionError;
pub use randomizer::{
    RandomizedPool, build_category_interleaving, check_num_stim, randomize_within_category,
    split_into_phases,
};
pub use recorder::{ResponseRecorder, ResponseTable};
pub use sequencer::{SequencerEvent, TrialSequencer, TrialTiming};
