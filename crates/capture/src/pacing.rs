use std::time::{Duration, Instant};

/// Frame clock for sources that generate frames themselves.
///
/// Frames come due at a fixed rate from the moment the clock starts; `due`
/// hands out each due frame once, so a late poll catches up instead of
/// drifting.
pub struct FramePacing {
    frame_duration: Duration,
    started: Instant,
    emitted: u64,
}

impl FramePacing {
    pub fn new(fps: u32) -> Self {
        Self::starting_at(fps, Instant::now())
    }

    pub fn starting_at(fps: u32, started: Instant) -> Self {
        let frame_duration = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
        Self {
            frame_duration,
            started,
            emitted: 0,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Number of frames that came due since the last call.
    pub fn due(&mut self) -> u64 {
        self.due_at(Instant::now())
    }

    pub fn due_at(&mut self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started);
        let total = (elapsed.as_nanos() / self.frame_duration.as_nanos().max(1)) as u64;
        let fresh = total.saturating_sub(self.emitted);
        self.emitted = self.emitted.max(total);
        fresh
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
