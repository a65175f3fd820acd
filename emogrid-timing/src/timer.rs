use std::time::{Duration, Instant};

/// Monotonic session timer.
pub trait Timer: Clone {
    type Timestamp: Copy;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
}

#[derive(Debug, Clone)]
pub struct FrameStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub effective_fps: f64,
    pub dropped_frames: usize,
}

/// Instant-based timer that also tracks frame intervals.
///
/// A frame longer than one refresh plus 1 ms counts as dropped, which is the
/// only display-timing diagnostic the session reports.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    start: Instant,
    frame_times: Vec<Duration>,
    max_samples: usize,
    drop_threshold: Duration,
    dropped: usize,
}

impl SessionTimer {
    pub fn new(refresh_hz: f64) -> Self {
        let threshold = Duration::from_secs_f64(1.0 / refresh_hz) + Duration::from_millis(1);
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
            drop_threshold: threshold,
            dropped: 0,
        }
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped
    }

    pub fn frame_stats(&self) -> FrameStats {
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return FrameStats {
                average_frame_time_ns: 0.0,
                jitter_ns: 0.0,
                effective_fps: 0.0,
                dropped_frames: self.dropped,
            };
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        FrameStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
            dropped_frames: self.dropped,
        }
    }

    fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        {
            use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

            let req = timespec {
                tv_sec: duration.as_secs() as libc::time_t,
                tv_nsec: duration.subsec_nanos() as libc::c_long,
            };
            unsafe {
                clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
            }
        }
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }
}

impl Timer for SessionTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d);
    }

    fn record_frame(&mut self, d: Duration) {
        if d > self.drop_threshold {
            self.dropped += 1;
        }
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
    }
}
