use crate::bus::MessageBus;
use crate::error::EngineResult;
use crate::frame_sync::FrameOutcome;
use crate::message::{Message, MessageKind};
use crate::registry::ComponentRegistry;

use std::cell::RefCell;
use std::rc::Rc;

/// Immutable per-frame draw description handed to the backend.
///
/// Built fresh on every Render message from the live camera/drawable
/// registrations; plain data, so the backend records it without reaching
/// back into gameplay state.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub clear_color: [f32; 4],
    pub draw_count: usize,
}

impl FramePlan {
    pub const DEFAULT_CLEAR: [f32; 4] = [0.10, 0.12, 0.16, 1.0];
}

impl Default for FramePlan {
    #[inline]
    fn default() -> Self {
        Self {
            clear_color: Self::DEFAULT_CLEAR,
            draw_count: 0,
        }
    }
}

/// Render backend contract, implemented by the Vulkan crate.
///
/// All calls arrive on the engine thread. `render_frame` runs the whole
/// slot protocol (wait, acquire, record, submit, present) for one frame.
pub trait RenderBackend {
    fn render_frame(&mut self, plan: &FramePlan) -> EngineResult<FrameOutcome>;

    /// Called on WindowResize. Must be cheap; the actual swapchain rebuild
    /// is deferred to the next frame, behind a full fence wait.
    fn note_resize(&mut self, width: u32, height: u32);

    /// Blocks until no GPU work is in flight. Precedes any teardown.
    fn wait_idle(&mut self) -> EngineResult<()>;
}

/// Consumes camera/drawable registrations and drives the backend from the
/// render-related lifecycle messages.
///
/// Errors on the frame path are contained here: a failed frame is dropped
/// whole and logged, the loop keeps running.
pub struct RenderManager {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    backend: Option<Box<dyn RenderBackend>>,
    registry: Rc<ComponentRegistry>,
    frames_rendered: u64,
    frames_dropped: u64,
}

impl RenderManager {
    pub fn attach(bus: &MessageBus, registry: Rc<ComponentRegistry>) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            backend: None,
            registry,
            frames_rendered: 0,
            frames_dropped: 0,
        }));

        {
            let inner = inner.clone();
            bus.subscribe(MessageKind::Render, move |_| {
                inner.borrow_mut().render_frame();
            });
        }
        {
            let inner = inner.clone();
            bus.subscribe(MessageKind::WindowResize, move |msg| {
                let &Message::WindowResize { width, height } = msg else {
                    return;
                };
                if let Some(backend) = inner.borrow_mut().backend.as_mut() {
                    backend.note_resize(width, height);
                }
            });
        }
        {
            let inner = inner.clone();
            bus.subscribe(MessageKind::Quitting, move |_| {
                let mut inner = inner.borrow_mut();
                if let Some(backend) = inner.backend.as_mut() {
                    if let Err(e) = backend.wait_idle() {
                        log::warn!("wait_idle on quit failed: {e}");
                    }
                }
            });
        }

        Self { inner }
    }

    /// Installs the backend once the presentation surface exists. Until
    /// then Render messages are no-ops (headless).
    pub fn install_backend(&self, backend: Box<dyn RenderBackend>) {
        self.inner.borrow_mut().backend = Some(backend);
    }

    #[inline]
    pub fn has_backend(&self) -> bool {
        self.inner.borrow().backend.is_some()
    }

    pub fn wait_idle(&self) -> EngineResult<()> {
        match self.inner.borrow_mut().backend.as_mut() {
            Some(backend) => backend.wait_idle(),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.inner.borrow().frames_rendered
    }

    #[inline]
    pub fn frames_dropped(&self) -> u64 {
        self.inner.borrow().frames_dropped
    }
}

impl Inner {
    /// Snapshot of the registered render inputs: first live enabled camera
    /// wins; no camera falls back to the default clear.
    fn plan(&self) -> FramePlan {
        let mut clear = FramePlan::DEFAULT_CLEAR;
        for (_, weak) in self.registry.cameras.borrow().snapshot() {
            let Some(cam) = weak.upgrade() else { continue };
            let cam = cam.borrow();
            if cam.enabled() {
                clear = cam.clear_color();
                break;
            }
        }

        let draw_count = self
            .registry
            .drawables
            .borrow()
            .snapshot()
            .into_iter()
            .filter(|(_, weak)| {
                weak.upgrade()
                    .map(|d| d.borrow().visible())
                    .unwrap_or(false)
            })
            .count();

        FramePlan {
            clear_color: clear,
            draw_count,
        }
    }

    fn render_frame(&mut self) {
        let plan = self.plan();
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        match backend.render_frame(&plan) {
            Ok(FrameOutcome::Presented) => self.frames_rendered += 1,
            Ok(FrameOutcome::Skipped) => {
                self.frames_dropped += 1;
                log::debug!("frame skipped (stale surface)");
            }
            Err(e) => {
                self.frames_dropped += 1;
                log::error!("frame dropped: {e}");
            }
        }
    }
}
