use crate::bus::MessageBus;
use crate::message::Message;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotRunning,
    Running,
    /// Terminal. A stopped scheduler never ticks again.
    Stopped,
}

/// Wall-clock FPS counter, reported and reset every rollover period (>= 1 s).
struct FpsCounter {
    frames: u32,
    elapsed: f32,
    period: f32,
}

impl FpsCounter {
    #[inline]
    fn new(period: f32) -> Self {
        Self {
            frames: 0,
            elapsed: 0.0,
            period: period.max(1.0),
        }
    }

    fn tick(&mut self, dt: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < self.period {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}

/// Owns wall-clock timing and emits the per-iteration lifecycle messages in
/// their fixed order.
///
/// Per iteration, with play mode active:
///
///   EarlyUpdate -> FixedUpdate* -> Update -> LateUpdate
///     -> PreRender -> Render -> PostRender -> AfterFrame
///
/// Gameplay messages are fully resolved before any render message. The render
/// block is skipped whole when the surface has zero area (minimized window);
/// gameplay is never skipped for that reason. FixedUpdate catches up at the
/// fixed cadence: several sends in one iteration under load, none when the
/// remainder has not reached a full step.
pub struct FrameScheduler {
    state: LoopState,
    fixed_step: f32,
    max_dt: f32,

    accumulator: f32,
    last: Option<Instant>,
    frame_index: u64,

    play_mode: Rc<Cell<bool>>,
    fps: FpsCounter,
}

impl FrameScheduler {
    pub fn new(fixed_step: f32, max_dt: f32, play_mode: Rc<Cell<bool>>) -> Self {
        Self {
            state: LoopState::NotRunning,
            fixed_step: fixed_step.max(0.001),
            max_dt: max_dt.max(0.001),
            accumulator: 0.0,
            last: None,
            frame_index: 0,
            play_mode,
            fps: FpsCounter::new(1.0),
        }
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn fixed_step(&self) -> f32 {
        self.fixed_step
    }

    pub fn start(&mut self) {
        if self.state == LoopState::NotRunning {
            self.state = LoopState::Running;
            self.last = None;
            self.accumulator = 0.0;
        }
    }

    /// Terminal stop; further `step` calls are no-ops.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    /// One loop iteration against the wall clock.
    pub fn step(&mut self, bus: &MessageBus, surface: (u32, u32)) {
        let now = Instant::now();
        let dt = match self.last {
            Some(prev) => now.duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);
        self.advance(dt, surface, bus);
    }

    /// One loop iteration with an explicit delta. `step` funnels here; tests
    /// drive it directly for determinism.
    pub fn advance(&mut self, dt: f32, surface: (u32, u32), bus: &MessageBus) {
        if self.state != LoopState::Running {
            return;
        }

        let mut dt = dt;
        if !dt.is_finite() || dt < 0.0 {
            dt = 0.0;
        }
        // Clamp before accumulating: bounds the fixed-step burst after a
        // stall without breaking the floor/remainder law.
        dt = dt.min(self.max_dt);

        if let Some(fps) = self.fps.tick(dt) {
            log::debug!("fps {:.1}", fps);
        }

        if self.play_mode.get() {
            bus.send(&Message::EarlyUpdate { dt });

            self.accumulator += dt;
            while self.accumulator >= self.fixed_step {
                bus.send(&Message::FixedUpdate {
                    fixed_dt: self.fixed_step,
                });
                self.accumulator -= self.fixed_step;
            }

            bus.send(&Message::Update { dt });
            bus.send(&Message::LateUpdate { dt });
        }

        if surface.0 > 0 && surface.1 > 0 {
            bus.send(&Message::PreRender);
            bus.send(&Message::Render);
            bus.send(&Message::PostRender);
            bus.send(&Message::AfterFrame);
        }

        self.frame_index = self.frame_index.wrapping_add(1);
    }

    /// Remaining sub-step time, `0 <= r < fixed_step` after any iteration.
    #[inline]
    pub fn fixed_remainder(&self) -> f32 {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    use std::cell::RefCell;

    fn recording_bus() -> (MessageBus, Rc<RefCell<Vec<MessageKind>>>) {
        let bus = MessageBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            MessageKind::EarlyUpdate,
            MessageKind::FixedUpdate,
            MessageKind::Update,
            MessageKind::LateUpdate,
            MessageKind::PreRender,
            MessageKind::Render,
            MessageKind::PostRender,
            MessageKind::AfterFrame,
        ] {
            let log = log.clone();
            bus.subscribe(kind, move |msg| log.borrow_mut().push(msg.kind()));
        }
        (bus, log)
    }

    fn running_scheduler(fixed_step: f32, play: bool) -> FrameScheduler {
        let mut s = FrameScheduler::new(fixed_step, 0.25, Rc::new(Cell::new(play)));
        s.start();
        s
    }

    #[test]
    fn fixed_step_catch_up_follows_floor_law() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);

        s.advance(0.047, (800, 600), &bus);

        let fixed = log
            .borrow()
            .iter()
            .filter(|k| **k == MessageKind::FixedUpdate)
            .count();
        assert_eq!(fixed, 2);
        assert!(s.fixed_remainder() >= 0.0);
        assert!(s.fixed_remainder() < 0.02);
        assert!((s.fixed_remainder() - 0.007).abs() < 1e-6);
    }

    #[test]
    fn no_fixed_update_below_one_step() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);

        s.advance(0.01, (800, 600), &bus);
        s.advance(0.005, (800, 600), &bus);

        let fixed = log
            .borrow()
            .iter()
            .filter(|k| **k == MessageKind::FixedUpdate)
            .count();
        assert_eq!(fixed, 0);
        assert!((s.fixed_remainder() - 0.015).abs() < 1e-6);
    }

    #[test]
    fn remainder_carries_across_iterations() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);

        s.advance(0.015, (800, 600), &bus);
        s.advance(0.015, (800, 600), &bus);

        let fixed = log
            .borrow()
            .iter()
            .filter(|k| **k == MessageKind::FixedUpdate)
            .count();
        assert_eq!(fixed, 1);
        assert!((s.fixed_remainder() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn message_order_is_invariant() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);

        s.advance(0.047, (800, 600), &bus);

        assert_eq!(
            *log.borrow(),
            vec![
                MessageKind::EarlyUpdate,
                MessageKind::FixedUpdate,
                MessageKind::FixedUpdate,
                MessageKind::Update,
                MessageKind::LateUpdate,
                MessageKind::PreRender,
                MessageKind::Render,
                MessageKind::PostRender,
                MessageKind::AfterFrame,
            ]
        );
    }

    #[test]
    fn zero_area_skips_render_block_only() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);

        s.advance(0.02, (0, 0), &bus);

        assert_eq!(
            *log.borrow(),
            vec![
                MessageKind::EarlyUpdate,
                MessageKind::FixedUpdate,
                MessageKind::Update,
                MessageKind::LateUpdate,
            ]
        );
    }

    #[test]
    fn edit_mode_sends_render_block_only() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, false);

        s.advance(0.02, (800, 600), &bus);

        assert_eq!(
            *log.borrow(),
            vec![
                MessageKind::PreRender,
                MessageKind::Render,
                MessageKind::PostRender,
                MessageKind::AfterFrame,
            ]
        );
    }

    #[test]
    fn stopped_scheduler_never_ticks() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);
        s.stop();

        s.advance(0.05, (800, 600), &bus);
        assert!(log.borrow().is_empty());
        assert_eq!(s.state(), LoopState::Stopped);
    }

    #[test]
    fn dt_clamp_bounds_the_catch_up_burst() {
        let (bus, log) = recording_bus();
        let mut s = running_scheduler(0.02, true);

        // A 10 s stall must not produce 500 catch-up steps.
        s.advance(10.0, (800, 600), &bus);

        let fixed = log
            .borrow()
            .iter()
            .filter(|k| **k == MessageKind::FixedUpdate)
            .count();
        assert_eq!(fixed, (0.25f32 / 0.02).floor() as usize);
    }

    #[test]
    fn fps_counter_rolls_over_after_a_second() {
        let mut fps = FpsCounter::new(1.0);
        for _ in 0..59 {
            assert!(fps.tick(1.0 / 60.0).is_none());
        }
        let reported = fps.tick(1.0 / 60.0 + 0.02).expect("rollover");
        assert!(reported > 0.0);
        assert!(fps.tick(1.0 / 60.0).is_none());
    }
}
