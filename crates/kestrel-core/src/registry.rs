use crate::error::EngineResult;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

impl ComponentId {
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/* ============================
   Lifecycle capabilities
   ============================ */

/// Invoked once when game logic starts (reentrantly from GameLogicStart).
pub trait Startable {
    fn on_start(&mut self) -> EngineResult<()>;
}

pub trait EarlyUpdatable {
    fn on_early_update(&mut self, dt: f32) -> EngineResult<()>;
}

pub trait Updatable {
    fn on_update(&mut self, dt: f32) -> EngineResult<()>;
}

pub trait LateUpdatable {
    fn on_late_update(&mut self, dt: f32) -> EngineResult<()>;
}

/// Runs at the deterministic fixed-step cadence, possibly several times per
/// frame under load.
pub trait FixedUpdatable {
    fn on_fixed_update(&mut self, fixed_dt: f32) -> EngineResult<()>;
}

/// Render-side capability consumed by the render manager.
pub trait Camera {
    fn clear_color(&self) -> [f32; 4];

    fn enabled(&self) -> bool {
        true
    }
}

/// Render-side capability: something the backend draws each frame.
pub trait Drawable {
    fn visible(&self) -> bool {
        true
    }
}

pub type ComponentHandle<T> = Rc<RefCell<T>>;
pub type WeakHandle<T> = Weak<RefCell<T>>;

/* ============================
   Collector
   ============================ */

/// Weak-reference collection of every live component exposing one
/// capability.
///
/// The collector never owns a component: entries are weak handles, and a
/// handle whose component has been dropped is skipped at invoke time and
/// pruned lazily. A component appears at most once; add of a present id and
/// remove of an absent id are no-ops.
pub struct Collector<T: ?Sized> {
    entries: Vec<(ComponentId, WeakHandle<T>)>,
    index: HashMap<ComponentId, usize>,
}

impl<T: ?Sized> Default for Collector<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Collector<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// O(1). Returns `false` when `id` is already present.
    pub fn add(&mut self, id: ComponentId, handle: WeakHandle<T>) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.entries.len());
        self.entries.push((id, handle));
        true
    }

    /// O(1) swap-remove. Removing a non-member is a no-op.
    pub fn remove(&mut self, id: ComponentId) {
        let Some(pos) = self.index.remove(&id) else {
            return;
        };
        self.entries.swap_remove(pos);
        if let Some(&(moved_id, _)) = self.entries.get(pos) {
            self.index.insert(moved_id, pos);
        }
    }

    /// Copy of the current membership. Iterating the snapshot is immune to
    /// components detaching themselves mid-pass; they only vanish from the
    /// next snapshot.
    pub fn snapshot(&self) -> Vec<(ComponentId, WeakHandle<T>)> {
        self.entries
            .iter()
            .map(|(id, w)| (*id, w.clone()))
            .collect()
    }

    /// Drops entries whose component no longer exists.
    pub fn prune(&mut self) {
        let dead: Vec<ComponentId> = self
            .entries
            .iter()
            .filter(|(_, w)| w.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            self.remove(id);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.index.contains_key(&id)
    }
}

/* ============================
   Registry
   ============================ */

/// Per-capability collectors for every live component of the active scene.
///
/// Registration happens as components finish construction (during scene
/// deserialization, before SceneLoaded is sent); removal happens when a
/// component is destroyed.
#[derive(Default)]
pub struct ComponentRegistry {
    pub startable: RefCell<Collector<dyn Startable>>,
    pub early_updatable: RefCell<Collector<dyn EarlyUpdatable>>,
    pub updatable: RefCell<Collector<dyn Updatable>>,
    pub late_updatable: RefCell<Collector<dyn LateUpdatable>>,
    pub fixed_updatable: RefCell<Collector<dyn FixedUpdatable>>,

    pub cameras: RefCell<Collector<dyn Camera>>,
    pub drawables: RefCell<Collector<dyn Drawable>>,
}

impl ComponentRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `id` from every capability collector.
    pub fn remove_everywhere(&self, id: ComponentId) {
        self.startable.borrow_mut().remove(id);
        self.early_updatable.borrow_mut().remove(id);
        self.updatable.borrow_mut().remove(id);
        self.late_updatable.borrow_mut().remove(id);
        self.fixed_updatable.borrow_mut().remove(id);
        self.cameras.borrow_mut().remove(id);
        self.drawables.borrow_mut().remove(id);
    }
}
