/// Event markers pushed to the physiological recording stream.
///
/// `Image(c)` carries the index of the category being shown; its code sits
/// after the fixed labels, in category order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Test,
    GeneralQuestions,
    Neophobia,
    Practice,
    Text,
    Fixation,
    Play,
    Pause,
    Start,
    End,
    Sound,
    Movie,
    Image(usize),
}

/// Fixed labels, in code order. Image labels follow, one per category.
pub const FIXED_LABELS: [&str; 12] = [
    "Test",
    "General Questions",
    "Neophobia",
    "Practice",
    "Text",
    "Fixation",
    "Play",
    "Pause",
    "Start",
    "End",
    "Sound",
    "Movie",
];

/// Deterministic label -> integer-code mapping, ascending from 0.
///
/// Downstream alignment tooling imports this table, so the ordering must not
/// change between runs of the same study.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerVocabulary {
    labels: Vec<String>,
}

impl MarkerVocabulary {
    pub fn new<S: AsRef<str>>(category_names: &[S]) -> Self {
        let mut labels: Vec<String> = FIXED_LABELS.iter().map(|s| s.to_string()).collect();
        for name in category_names {
            labels.push(format!("Image_{}", name.as_ref()));
        }
        Self { labels }
    }

    pub fn code(&self, marker: Marker) -> i32 {
        let code = match marker {
            Marker::Test => 0,
            Marker::GeneralQuestions => 1,
            Marker::Neophobia => 2,
            Marker::Practice => 3,
            Marker::Text => 4,
            Marker::Fixation => 5,
            Marker::Play => 6,
            Marker::Pause => 7,
            Marker::Start => 8,
            Marker::End => 9,
            Marker::Sound => 10,
            Marker::Movie => 11,
            Marker::Image(category) => FIXED_LABELS.len() + category,
        };
        debug_assert!(code < self.labels.len());
        code as i32
    }

    pub fn label(&self, code: i32) -> Option<&str> {
        self.labels.get(code as usize).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Stream parameters the recording software keys on.
///
/// These must stay identical across runs for subscribers to recognize the
/// stream: one int32 channel carrying single-sample marker codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    pub name: &'static str,
    pub stream_type: &'static str,
    pub channel_count: u8,
    pub channel_format: &'static str,
    pub source_id: &'static str,
}

impl Default for StreamIdentity {
    fn default() -> Self {
        Self {
            name: "Marker_Stream",
            stream_type: "Markers",
            channel_count: 1,
            channel_format: "int32",
            source_id: "Marker_Stream_001",
        }
    }
}

/// Transport seam for the marker stream. The network transport itself is an
/// external collaborator; implementations publish one integer sample per call.
pub trait MarkerOutlet {
    fn push_sample(&mut self, code: i32);
}
