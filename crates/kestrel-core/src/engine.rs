use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::dispatcher::ComponentDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::message::{Message, MessageKind};
use crate::render::{RenderBackend, RenderManager};
use crate::scheduler::{FrameScheduler, LoopState};
use crate::shutdown::ShutdownToken;

/// Engine facade: builds the context, wires the subsystems and drives one
/// loop iteration per `step` call.
///
/// The platform adapter owns the actual OS loop (winit inverts control) and
/// calls `step` once per iteration with the current surface size; everything
/// downstream of that is message-driven.
pub struct Engine {
    config: EngineConfig,
    ctx: EngineContext,
    scheduler: FrameScheduler,
    _dispatcher: ComponentDispatcher,
    render: RenderManager,
    shutdown: ShutdownToken,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let ctx = EngineContext::new();

        let dispatcher = ComponentDispatcher::attach(ctx.bus(), ctx.registry().clone());
        let render = RenderManager::attach(ctx.bus(), ctx.registry().clone());

        // Play-mode toggling. GameLogicStart dispatches Start from within
        // the same call stack (documented synchronous reentrancy).
        {
            let play = ctx.play_flag().clone();
            let bus = ctx.bus().clone();
            ctx.bus().subscribe(MessageKind::GameLogicStart, move |_| {
                if !play.get() {
                    play.set(true);
                    bus.send(&Message::Start);
                }
            });
        }
        {
            let play = ctx.play_flag().clone();
            ctx.bus().subscribe(MessageKind::GameLogicStop, move |_| {
                play.set(false);
            });
        }

        let scheduler = FrameScheduler::new(
            config.frame.fixed_step(),
            config.frame.max_dt(),
            ctx.play_flag().clone(),
        );

        Self {
            config,
            ctx,
            scheduler,
            _dispatcher: dispatcher,
            render,
            shutdown: ShutdownToken::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    #[inline]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    #[inline]
    pub fn send(&self, msg: &Message) {
        self.ctx.send(msg);
    }

    /// Installs the GPU backend once the surface exists; before that the
    /// loop runs headless and Render messages are no-ops.
    pub fn install_backend(&self, backend: Box<dyn RenderBackend>) {
        self.render.install_backend(backend);
    }

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    #[inline]
    pub fn loop_state(&self) -> LoopState {
        self.scheduler.state()
    }

    /// One loop iteration. `surface` is the current drawable size; 0x0
    /// skips the render block for this iteration.
    pub fn step(&mut self, surface: (u32, u32)) -> EngineResult<()> {
        if self.shutdown.is_requested() {
            self.request_quit();
        }
        if self.scheduler.state() == LoopState::Stopped {
            return Err(EngineError::ExitRequested);
        }
        self.scheduler.step(self.ctx.bus(), surface);
        Ok(())
    }

    /// Converts a surface resize into a WindowResize message.
    pub fn notify_resize(&self, width: u32, height: u32) {
        self.ctx.send(&Message::WindowResize { width, height });
    }

    /// Announces Quitting and stops the scheduler terminally. Idempotent.
    pub fn request_quit(&mut self) {
        if self.scheduler.state() == LoopState::Stopped {
            return;
        }
        self.ctx.send(&Message::Quitting);
        self.scheduler.stop();
    }

    /// Orderly teardown: quit if still running, then block until no GPU
    /// work is in flight so frame slots and swapchain can be destroyed.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.request_quit();
        self.render.wait_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineResult;
    use crate::registry::{ComponentHandle, ComponentId, Startable, Updatable, WeakHandle};
    use crate::scheduler::LoopState;

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn game_logic_start_enters_play_mode_and_dispatches_start() {
        struct Probe {
            started: Rc<Cell<u32>>,
        }

        impl Startable for Probe {
            fn on_start(&mut self) -> EngineResult<()> {
                self.started.set(self.started.get() + 1);
                Ok(())
            }
        }

        let engine = Engine::new(EngineConfig::default());
        let started = Rc::new(Cell::new(0u32));

        let probe: ComponentHandle<Probe> = Rc::new(RefCell::new(Probe {
            started: started.clone(),
        }));
        let weak: WeakHandle<dyn Startable> = Rc::<RefCell<Probe>>::downgrade(&probe);
        engine
            .context()
            .registry()
            .startable
            .borrow_mut()
            .add(ComponentId::next(), weak);

        assert!(!engine.context().is_play_mode());
        engine.send(&Message::GameLogicStart);
        assert!(engine.context().is_play_mode());
        assert_eq!(started.get(), 1);

        // Already playing: no second Start dispatch.
        engine.send(&Message::GameLogicStart);
        assert_eq!(started.get(), 1);

        engine.send(&Message::GameLogicStop);
        assert!(!engine.context().is_play_mode());
    }

    #[test]
    fn step_requires_running_state() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.start();
        assert!(engine.step((800, 600)).is_ok());

        engine.request_quit();
        assert!(matches!(
            engine.step((800, 600)),
            Err(EngineError::ExitRequested)
        ));
    }

    #[test]
    fn play_mode_gates_update_dispatch_through_step() {
        struct Probe {
            hits: Rc<Cell<u32>>,
        }

        impl Updatable for Probe {
            fn on_update(&mut self, _dt: f32) -> EngineResult<()> {
                self.hits.set(self.hits.get() + 1);
                Ok(())
            }
        }

        let mut engine = Engine::new(EngineConfig::default());
        engine.start();

        let hits = Rc::new(Cell::new(0u32));
        let probe: ComponentHandle<Probe> = Rc::new(RefCell::new(Probe { hits: hits.clone() }));
        let weak: WeakHandle<dyn Updatable> = Rc::<RefCell<Probe>>::downgrade(&probe);
        engine
            .context()
            .registry()
            .updatable
            .borrow_mut()
            .add(ComponentId::next(), weak);

        engine.step((800, 600)).unwrap();
        assert_eq!(hits.get(), 0);

        engine.send(&Message::GameLogicStart);
        engine.step((800, 600)).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn shutdown_token_stops_the_loop() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.start();

        let token = engine.shutdown_token();
        token.request();

        assert!(matches!(
            engine.step((800, 600)),
            Err(EngineError::ExitRequested)
        ));
        assert_eq!(engine.loop_state(), LoopState::Stopped);
    }

    #[test]
    fn quitting_is_announced_once() {
        let mut engine = Engine::new(EngineConfig::default());
        let quits = Rc::new(Cell::new(0u32));

        {
            let quits = quits.clone();
            engine
                .context()
                .bus()
                .subscribe(MessageKind::Quitting, move |_| quits.set(quits.get() + 1));
        }

        engine.start();
        engine.request_quit();
        engine.request_quit();
        assert_eq!(quits.get(), 1);
    }
}
