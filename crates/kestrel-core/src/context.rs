use crate::bus::MessageBus;
use crate::message::Message;
use crate::registry::ComponentRegistry;

use std::cell::Cell;
use std::rc::Rc;

/// Explicitly constructed engine-run state shared by the subsystems.
///
/// Replaces process-wide singletons: everything that used to be "the" bus or
/// "the" registry hangs off one context with the lifetime of a single engine
/// run, so independent instances can coexist (tests construct several).
#[derive(Clone)]
pub struct EngineContext {
    bus: Rc<MessageBus>,
    registry: Rc<ComponentRegistry>,
    play_mode: Rc<Cell<bool>>,
}

impl Default for EngineContext {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl EngineContext {
    pub fn new() -> Self {
        Self {
            bus: Rc::new(MessageBus::new()),
            registry: Rc::new(ComponentRegistry::new()),
            play_mode: Rc::new(Cell::new(false)),
        }
    }

    #[inline]
    pub fn bus(&self) -> &Rc<MessageBus> {
        &self.bus
    }

    #[inline]
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    #[inline]
    pub fn send(&self, msg: &Message) {
        self.bus.send(msg);
    }

    /// True between GameLogicStart and GameLogicStop.
    #[inline]
    pub fn is_play_mode(&self) -> bool {
        self.play_mode.get()
    }

    #[inline]
    pub(crate) fn play_flag(&self) -> &Rc<Cell<bool>> {
        &self.play_mode
    }
}
