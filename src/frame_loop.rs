//! Frame scheduling without the host: which frame requests are outstanding,
//! how much time a frame represents, and resize coalescing.

use crate::compositor::Viewport;
use crate::error::Result;

/// Identifier of a pending next-frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(pub i32);

/// Host primitive for "call me on the next display refresh".
pub trait FrameScheduler {
    fn request_frame(&mut self) -> Result<FrameHandle>;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Tracks whether the animation runs and the frame request keeping it alive.
///
/// At most one request is outstanding at any time, so starting twice never
/// produces two loops.
#[derive(Debug)]
pub struct FrameLoop {
    nominal_frame_ms: f64,
    running: bool,
    pending: Option<FrameHandle>,
    last_frame: f64,
}

impl FrameLoop {
    pub fn new(nominal_frame_ms: f64) -> Self {
        FrameLoop {
            nominal_frame_ms,
            running: false,
            pending: None,
            last_frame: 0.0,
        }
    }

    /// Returns `false` when the loop was already running.
    pub fn start<S: FrameScheduler + ?Sized>(&mut self, now: f64, scheduler: &mut S) -> Result<bool> {
        if self.running {
            return Ok(false);
        }
        self.pending = Some(scheduler.request_frame()?);
        self.running = true;
        self.last_frame = now;
        Ok(true)
    }

    pub fn stop<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.running = false;
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_frame(handle);
        }
    }

    /// Handles a frame callback. Returns the elapsed time in nominal frames,
    /// or `None` if the loop has been stopped, in which case nothing further
    /// is scheduled.
    pub fn on_frame<S: FrameScheduler + ?Sized>(&mut self, now: f64, scheduler: &mut S) -> Result<Option<f64>> {
        self.pending = None;
        if !self.running {
            return Ok(None);
        }
        match scheduler.request_frame() {
            Ok(handle) => self.pending = Some(handle),
            Err(e) => {
                self.running = false;
                return Err(e);
            }
        }
        // A timestamp older than the last frame counts as no elapsed time.
        let delta = ((now - self.last_frame) / self.nominal_frame_ms).max(0.0);
        self.last_frame = now;
        Ok(Some(delta))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }
}

/// Coalesces bursts of resize events into the most recent one, released
/// once no new event has arrived for the quiet period.
#[derive(Debug)]
pub struct ResizeDebouncer {
    quiet_ms: f64,
    latest: Option<Viewport>,
    deadline: f64,
}

impl ResizeDebouncer {
    pub fn new(quiet_ms: f64) -> Self {
        ResizeDebouncer {
            quiet_ms,
            latest: None,
            deadline: 0.0,
        }
    }

    pub fn push(&mut self, viewport: Viewport, now: f64) {
        self.latest = Some(viewport);
        self.deadline = now + self.quiet_ms;
    }

    pub fn poll(&mut self, now: f64) -> Option<Viewport> {
        if now >= self.deadline {
            self.latest.take()
        } else {
            None
        }
    }

    /// Drops any queued resize, e.g. once the host has applied a fresher one.
    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;

    /// Hands out increasing handles and remembers cancellations.
    #[derive(Default)]
    pub struct CountingScheduler {
        pub requested: i32,
        pub cancelled: Vec<FrameHandle>,
        pub fail: bool,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&mut self) -> Result<FrameHandle> {
            if self.fail {
                return Err(Error::Host("requestAnimationFrame unavailable".into()));
            }
            self.requested += 1;
            Ok(FrameHandle(self.requested))
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.cancelled.push(handle);
        }
    }

    #[test]
    fn start_is_idempotent() {
        let mut scheduler = CountingScheduler::default();
        let mut frames = FrameLoop::new(16.67);
        assert!(frames.start(0.0, &mut scheduler).unwrap());
        assert!(!frames.start(5.0, &mut scheduler).unwrap());
        assert_eq!(scheduler.requested, 1);
        assert_eq!(frames.pending(), Some(FrameHandle(1)));
    }

    #[test]
    fn delta_is_measured_in_nominal_frames() {
        let mut scheduler = CountingScheduler::default();
        let mut frames = FrameLoop::new(16.67);
        frames.start(1000.0, &mut scheduler).unwrap();
        let delta = frames.on_frame(1033.34, &mut scheduler).unwrap().unwrap();
        assert!((delta - 2.0).abs() < 1e-9);
        let delta = frames.on_frame(1041.675, &mut scheduler).unwrap().unwrap();
        assert!((delta - 0.5).abs() < 1e-9);
        assert_eq!(scheduler.requested, 3);
    }

    #[test]
    fn long_gaps_report_the_full_delta() {
        let mut scheduler = CountingScheduler::default();
        let mut frames = FrameLoop::new(16.67);
        frames.start(0.0, &mut scheduler).unwrap();
        let delta = frames.on_frame(1667.0, &mut scheduler).unwrap().unwrap();
        assert!((delta - 100.0).abs() < 1e-9, "delta {}", delta);
        let delta = frames.on_frame(1600.0, &mut scheduler).unwrap().unwrap();
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn stop_cancels_and_stray_frames_do_nothing() {
        let mut scheduler = CountingScheduler::default();
        let mut frames = FrameLoop::new(16.67);
        frames.start(0.0, &mut scheduler).unwrap();
        frames.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled, vec![FrameHandle(1)]);
        assert!(!frames.is_running());

        assert_eq!(frames.on_frame(16.67, &mut scheduler).unwrap(), None);
        assert_eq!(scheduler.requested, 1);
        assert_eq!(frames.pending(), None);

        // stopping twice cancels nothing new
        frames.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled.len(), 1);
    }

    #[test]
    fn restart_after_stop_resets_the_clock() {
        let mut scheduler = CountingScheduler::default();
        let mut frames = FrameLoop::new(10.0);
        frames.start(0.0, &mut scheduler).unwrap();
        frames.stop(&mut scheduler);
        assert!(frames.start(5000.0, &mut scheduler).unwrap());
        let delta = frames.on_frame(5010.0, &mut scheduler).unwrap().unwrap();
        assert!((delta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failed_request_leaves_loop_stopped() {
        let mut scheduler = CountingScheduler {
            fail: true,
            ..CountingScheduler::default()
        };
        let mut frames = FrameLoop::new(16.67);
        assert!(frames.start(0.0, &mut scheduler).is_err());
        assert!(!frames.is_running());

        scheduler.fail = false;
        frames.start(0.0, &mut scheduler).unwrap();
        scheduler.fail = true;
        assert!(frames.on_frame(16.67, &mut scheduler).is_err());
        assert!(!frames.is_running());
    }

    #[test]
    fn debouncer_releases_latest_after_quiet_period() {
        let mut debounce = ResizeDebouncer::new(100.0);
        debounce.push(Viewport::new(800.0, 600.0, 1.0), 0.0);
        debounce.push(Viewport::new(700.0, 500.0, 1.0), 50.0);
        assert_eq!(debounce.poll(120.0), None);
        assert!(debounce.is_pending());
        debounce.push(Viewport::new(640.0, 480.0, 2.0), 130.0);
        assert_eq!(debounce.poll(229.0), None);
        assert_eq!(debounce.poll(230.0), Some(Viewport::new(640.0, 480.0, 2.0)));
        assert_eq!(debounce.poll(1000.0), None);
        assert!(!debounce.is_pending());
    }

    #[test]
    fn cleared_debouncer_releases_nothing() {
        let mut debounce = ResizeDebouncer::new(100.0);
        debounce.push(Viewport::new(800.0, 600.0, 1.0), 0.0);
        debounce.clear();
        assert!(!debounce.is_pending());
        assert_eq!(debounce.poll(500.0), None);
    }
}
