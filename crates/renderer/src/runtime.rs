use std::time::{Duration, Instant};

/// Snapshot of the time state supplied to the frame uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
///
/// Sampling and committing are separate so a frame that never makes it to
/// the screen (a lost or outdated surface, for instance) does not consume a
/// frame index.
pub trait TimeSource: Send {
    /// Produces the time sample for the frame about to render.
    fn sample(&self) -> TimeSample;
    /// Commits the frame, advancing the frame counter by one.
    fn advance_frame(&mut self);
}

/// Time source backed by the system monotonic clock.
///
/// The frame counter starts at 0 and advances by exactly one per committed
/// frame, so each rendered frame sees a gap-free `iFrame`.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&self) -> TimeSample {
        TimeSample::new(self.origin.elapsed().as_secs_f32(), self.frame)
    }

    fn advance_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }
}

/// Paces redraw requests against an optional FPS cap.
///
/// With no cap the scheduler is always ready and the swapchain's Fifo
/// present mode provides the vsync pacing.
#[derive(Debug, Clone, Copy)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FrameScheduler {
    /// Builds a scheduler from an optional FPS cap; non-positive caps are
    /// treated as uncapped.
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            next_deadline: None,
        }
    }

    /// Whether a new frame should be issued at `now`.
    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.next_deadline) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(_), Some(deadline)) => now >= deadline,
        }
    }

    /// Records that a frame was rendered at `now` and arms the next deadline.
    pub fn mark_rendered(&mut self, now: Instant) {
        self.next_deadline = self.interval.map(|interval| now + interval);
    }

    /// Deadline the event loop should wake at, if the cap imposes one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.interval.and(self.next_deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_source_counts_frames_without_gaps() {
        let mut source = SystemTimeSource::new();
        for expected in 0..5 {
            assert_eq!(source.sample().frame_index, expected);
            source.advance_frame();
        }
    }

    #[test]
    fn failed_frames_do_not_consume_frame_indices() {
        let mut source = SystemTimeSource::new();
        // Two samples without a commit, as after a lost surface.
        assert_eq!(source.sample().frame_index, 0);
        assert_eq!(source.sample().frame_index, 0);
        source.advance_frame();
        assert_eq!(source.sample().frame_index, 1);
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(None);
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert!(scheduler.next_deadline().is_none());
    }

    #[test]
    fn capped_scheduler_waits_out_the_interval() {
        let mut scheduler = FrameScheduler::new(Some(10.0));
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(!scheduler.ready_for_frame(now + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(now + Duration::from_millis(101)));
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(100))
        );
    }

    #[test]
    fn zero_fps_cap_means_uncapped() {
        let scheduler = FrameScheduler::new(Some(0.0));
        assert!(scheduler.ready_for_frame(Instant::now()));
    }
}
