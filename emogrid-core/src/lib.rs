pub mod marker;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use marker::{Marker, MarkerOutlet, MarkerVocabulary, StreamIdentity};
pub use phase::SessionPhase;
pub use stimulus::{CategoryPool, ImageStimulus, StimulusPool};
pub use trial::{GridResponse, TrialRecord, TrialState};
