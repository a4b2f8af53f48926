//! Lifecycle of the animated background, independent of the browser.
//!
//! `Background` owns the simulator and the frame loop and reacts to the host
//! events the page forwards: frames, pointer movement, resizes, visibility
//! and the reduced-motion preference.

use crate::compositor::{self, FrameStyle, Surface, Viewport};
use crate::config::{DeviceProfile, SimulationConfig};
use crate::error::Result;
use crate::frame_loop::{FrameLoop, FrameScheduler, ResizeDebouncer};
use crate::noise_field::NoiseField;
use crate::simulator::ParticleSimulator;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Animated,
    /// Reduced motion requested; the host shows a static fallback instead.
    Static,
}

pub struct Background {
    config: SimulationConfig,
    coarse_pointer: bool,
    profile: DeviceProfile,
    viewport: Viewport,
    simulator: ParticleSimulator,
    frame_loop: FrameLoop,
    resize: ResizeDebouncer,
    mode: Mode,
}

impl Background {
    /// `coarse_pointer` is sampled once here; the viewport width is
    /// re-evaluated on every applied resize.
    pub fn new(
        config: SimulationConfig,
        noise: NoiseField,
        rng: StdRng,
        viewport: Viewport,
        coarse_pointer: bool,
        reduce_motion: bool,
    ) -> Self {
        let profile = DeviceProfile::detect(coarse_pointer, viewport.width, &config);
        let mut simulator = ParticleSimulator::new(config.clone(), noise, rng);
        simulator.reset(config.particle_count(profile), viewport.width, viewport.height);
        Background {
            frame_loop: FrameLoop::new(config.nominal_frame_ms),
            resize: ResizeDebouncer::new(config.resize_debounce_ms),
            config,
            coarse_pointer,
            profile,
            viewport,
            simulator,
            mode: if reduce_motion { Mode::Static } else { Mode::Animated },
        }
    }

    /// Starts the frame loop unless reduced motion is in effect or it is
    /// already running.
    pub fn start<S: FrameScheduler + ?Sized>(&mut self, now: f64, scheduler: &mut S) -> Result<bool> {
        if self.mode == Mode::Static {
            return Ok(false);
        }
        self.frame_loop.start(now, scheduler)
    }

    pub fn stop<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.frame_loop.stop(scheduler);
    }

    /// Frame callback. Returns whether a frame was simulated and drawn.
    pub fn frame<S, T>(&mut self, now: f64, scheduler: &mut S, surface: &mut T) -> Result<bool>
    where
        S: FrameScheduler + ?Sized,
        T: Surface + ?Sized,
    {
        let delta = match self.frame_loop.on_frame(now, scheduler)? {
            Some(delta) => delta,
            None => return Ok(false),
        };
        if let Some(viewport) = self.resize.poll(now) {
            self.apply_viewport(viewport, surface)?;
        }

        self.simulator.step(delta);

        let style = FrameStyle::new(&self.config, self.config.particle_radius(self.profile));
        compositor::draw_frame(surface, &self.viewport, &style, self.simulator.positions())?;
        Ok(true)
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.simulator.set_pointer(x, y);
    }

    pub fn pointer_left(&mut self) {
        self.simulator.clear_pointer();
    }

    /// Queues a resize; it is applied on the first frame after the quiet period.
    pub fn resize_requested(&mut self, viewport: Viewport, now: f64) {
        self.resize.push(viewport, now);
    }

    /// Resizes the surface and starts over with a fresh particle set sized
    /// for the new viewport. Any resize still queued is superseded.
    pub fn apply_viewport<T: Surface + ?Sized>(&mut self, viewport: Viewport, surface: &mut T) -> Result<()> {
        self.resize.clear();
        surface.resize(&viewport)?;
        self.viewport = viewport;
        self.profile = DeviceProfile::detect(self.coarse_pointer, viewport.width, &self.config);
        self.reset_particles();
        Ok(())
    }

    pub fn visibility_changed<S: FrameScheduler + ?Sized>(
        &mut self,
        hidden: bool,
        now: f64,
        scheduler: &mut S,
    ) -> Result<()> {
        if hidden {
            log::debug!("page hidden, pausing");
            self.stop(scheduler);
        } else if self.start(now, scheduler)? {
            log::debug!("page visible, resuming");
        }
        Ok(())
    }

    /// Switches between the animated and static modes. Returns the new mode
    /// so the host can detach or reattach its canvas; on a switch back to
    /// animated the host is expected to [`apply_viewport`](Self::apply_viewport),
    /// which also lays out a fresh particle set.
    pub fn reduced_motion_changed<S: FrameScheduler + ?Sized>(
        &mut self,
        reduce: bool,
        now: f64,
        scheduler: &mut S,
    ) -> Result<Mode> {
        if reduce {
            log::info!("reduced motion requested, switching to static background");
            self.stop(scheduler);
            self.mode = Mode::Static;
        } else if self.mode == Mode::Static {
            log::info!("reduced motion lifted, resuming animation");
            self.mode = Mode::Animated;
            self.start(now, scheduler)?;
        }
        Ok(self.mode)
    }

    fn reset_particles(&mut self) {
        let count = self.config.particle_count(self.profile);
        self.simulator
            .reset(count, self.viewport.width, self.viewport.height);
        log::debug!(
            "reset {} particles for {}x{} ({:?})",
            count,
            self.viewport.width,
            self.viewport.height,
            self.profile
        );
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn simulator(&self) -> &ParticleSimulator {
        &self.simulator
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::tests::{DrawCall, RecordingSurface};
    use crate::frame_loop::tests::CountingScheduler;
    use crate::frame_loop::FrameHandle;
    use rand::SeedableRng;

    fn background(width: f64, coarse_pointer: bool, reduce_motion: bool) -> Background {
        let config = SimulationConfig::default();
        let noise = NoiseField::new(9, config.noise_scale);
        Background::new(
            config,
            noise,
            StdRng::seed_from_u64(9),
            Viewport::new(width, 600.0, 1.0),
            coarse_pointer,
            reduce_motion,
        )
    }

    #[test]
    fn desktop_starts_with_desktop_preset() {
        let bg = background(1280.0, false, false);
        assert_eq!(bg.profile(), DeviceProfile::Desktop);
        assert_eq!(bg.simulator().len(), 150);
    }

    #[test]
    fn touch_device_uses_mobile_preset() {
        let bg = background(1280.0, true, false);
        assert_eq!(bg.profile(), DeviceProfile::Mobile);
        assert_eq!(bg.simulator().len(), 60);
    }

    #[test]
    fn frame_steps_and_draws_every_particle() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        let mut surface = RecordingSurface::default();
        bg.start(0.0, &mut scheduler).unwrap();
        assert!(bg.frame(16.67, &mut scheduler, &mut surface).unwrap());
        assert_eq!(surface.circles(), 150);
        assert!(matches!(surface.calls[2], DrawCall::Rect(..)));
        assert!(bg.simulator().time() > 0.0);
        assert_eq!(scheduler.requested, 2);
    }

    #[test]
    fn stopped_background_ignores_frames() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        let mut surface = RecordingSurface::default();
        bg.start(0.0, &mut scheduler).unwrap();
        bg.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled, vec![FrameHandle(1)]);

        assert!(!bg.frame(16.67, &mut scheduler, &mut surface).unwrap());
        assert!(surface.calls.is_empty());
        assert_eq!(bg.simulator().time(), 0.0);
        assert_eq!(scheduler.requested, 1);

        assert!(bg.start(100.0, &mut scheduler).unwrap());
        assert!(bg.frame(116.67, &mut scheduler, &mut surface).unwrap());
    }

    #[test]
    fn visibility_pauses_and_resumes_once() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        bg.start(0.0, &mut scheduler).unwrap();
        bg.visibility_changed(true, 10.0, &mut scheduler).unwrap();
        assert!(!bg.is_running());
        bg.visibility_changed(false, 20.0, &mut scheduler).unwrap();
        bg.visibility_changed(false, 30.0, &mut scheduler).unwrap();
        assert!(bg.is_running());
        assert_eq!(scheduler.requested, 2);
    }

    #[test]
    fn resize_is_debounced_and_resets_particles() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        let mut surface = RecordingSurface::default();
        bg.start(0.0, &mut scheduler).unwrap();

        bg.resize_requested(Viewport::new(1000.0, 700.0, 2.0), 10.0);
        bg.resize_requested(Viewport::new(500.0, 400.0, 2.0), 20.0);
        bg.frame(50.0, &mut scheduler, &mut surface).unwrap();
        assert!(!surface.calls.contains(&DrawCall::Resize(1000, 800)));
        assert_eq!(bg.simulator().len(), 150);

        bg.frame(130.0, &mut scheduler, &mut surface).unwrap();
        assert!(surface.calls.contains(&DrawCall::Resize(1000, 800)));
        assert!(!surface.calls.contains(&DrawCall::Resize(2000, 1400)));
        assert_eq!(bg.viewport(), Viewport::new(500.0, 400.0, 2.0));
        assert_eq!(bg.profile(), DeviceProfile::Mobile);
        assert_eq!(bg.simulator().len(), 60);
        assert!(bg
            .simulator()
            .positions()
            .all(|[x, y]| x >= 0.0 && x < 500.0 && y >= 0.0 && y < 400.0));
    }

    #[test]
    fn reduced_motion_at_startup_never_animates() {
        let mut bg = background(1280.0, false, true);
        let mut scheduler = CountingScheduler::default();
        assert_eq!(bg.mode(), Mode::Static);
        assert!(!bg.start(0.0, &mut scheduler).unwrap());
        assert_eq!(scheduler.requested, 0);
    }

    #[test]
    fn reduced_motion_toggle_tears_down_and_restarts() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        bg.start(0.0, &mut scheduler).unwrap();

        let mode = bg.reduced_motion_changed(true, 5.0, &mut scheduler).unwrap();
        assert_eq!(mode, Mode::Static);
        assert!(!bg.is_running());
        assert_eq!(scheduler.cancelled.len(), 1);

        // hidden/visible while static must not restart the loop
        bg.visibility_changed(false, 6.0, &mut scheduler).unwrap();
        assert!(!bg.is_running());

        let mode = bg.reduced_motion_changed(false, 7.0, &mut scheduler).unwrap();
        assert_eq!(mode, Mode::Animated);
        assert!(bg.is_running());
        assert_eq!(bg.simulator().len(), 150);
    }

    #[test]
    fn lifting_reduced_motion_resets_once_and_drops_stale_resizes() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        let mut surface = RecordingSurface::default();
        bg.start(0.0, &mut scheduler).unwrap();
        bg.reduced_motion_changed(true, 5.0, &mut scheduler).unwrap();

        // resized while static; nothing consumes the queue until animation resumes
        bg.resize_requested(Viewport::new(900.0, 700.0, 1.0), 10.0);
        let before_lift: Vec<_> = bg.simulator().positions().collect();
        bg.reduced_motion_changed(false, 500.0, &mut scheduler).unwrap();
        assert_eq!(bg.simulator().positions().collect::<Vec<_>>(), before_lift);

        bg.apply_viewport(Viewport::new(1000.0, 800.0, 1.0), &mut surface)
            .unwrap();
        let laid_out: Vec<_> = bg.simulator().positions().collect();

        bg.frame(516.67, &mut scheduler, &mut surface).unwrap();
        let resizes = surface
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Resize(..)))
            .count();
        assert_eq!(resizes, 1);
        assert_eq!(bg.viewport(), Viewport::new(1000.0, 800.0, 1.0));

        // one step moves each particle by at most the speed cap, modulo wrap
        let wrapped = |d: f64, extent: f64| d.abs().min(extent - d.abs());
        for ([x0, y0], [x1, y1]) in laid_out.iter().zip(bg.simulator().positions()) {
            assert!(wrapped(x1 - x0, 1000.0) <= 1.5 + 1e-9);
            assert!(wrapped(y1 - y0, 800.0) <= 1.5 + 1e-9);
        }
    }

    #[test]
    fn stalled_frame_advances_noise_time_in_full() {
        let mut bg = background(1280.0, false, false);
        let mut scheduler = CountingScheduler::default();
        let mut surface = RecordingSurface::default();
        bg.start(0.0, &mut scheduler).unwrap();
        bg.frame(1667.0, &mut scheduler, &mut surface).unwrap();
        assert!((bg.simulator().time() - 0.03).abs() < 1e-12, "time {}", bg.simulator().time());
    }

    #[test]
    fn pointer_leave_clears_interaction() {
        let mut bg = background(1280.0, false, false);
        bg.pointer_moved(10.0, 20.0);
        bg.pointer_moved(30.0, 40.0);
        assert_eq!(bg.simulator().pointer(), Some([30.0, 40.0]));
        bg.pointer_left();
        assert_eq!(bg.simulator().pointer(), None);
    }
}
