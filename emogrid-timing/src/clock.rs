use std::time::Duration;

/// Converts stimulus durations into whole display refreshes.
///
/// Timed presentation states advance by frame counts, not wall-clock sleeps,
/// so their boundaries stay aligned with the display's vertical sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    refresh_hz: f64,
}

impl FrameClock {
    pub fn new(refresh_hz: f64) -> Self {
        Self { refresh_hz }
    }

    pub fn refresh_hz(&self) -> f64 {
        self.refresh_hz
    }

    /// Frame count = round(duration * refresh rate).
    pub fn frames_for(&self, secs: f64) -> u32 {
        (self.refresh_hz * secs).round() as u32
    }

    /// Nominal duration of one refresh.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_round_to_nearest_refresh() {
        let clock = FrameClock::new(60.0);
        assert_eq!(clock.frames_for(0.2), 12);
        assert_eq!(clock.frames_for(3.0), 180);
        assert_eq!(clock.frames_for(0.5), 30);
        // 0.0083 s at 60 Hz is half a frame; rounds up
        assert_eq!(clock.frames_for(0.00834), 1);
    }

    #[test]
    fn frame_duration_matches_rate() {
        let clock = FrameClock::new(100.0);
        assert_eq!(clock.frame_duration(), Duration::from_millis(10));
    }
}
