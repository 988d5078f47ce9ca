use crate::bus::MessageBus;
use crate::message::{Message, MessageKind};
use crate::registry::{Collector, ComponentId, ComponentRegistry, WeakHandle};

use std::cell::RefCell;
use std::rc::Rc;

/// Bridges lifecycle messages to component callbacks.
///
/// Subscribes once per lifecycle kind at construction. On each receipt it
/// walks the current snapshot of the matching capability collector and
/// invokes the callback on every still-live component. One component failing
/// must not starve the rest: the failure is logged and the pass continues.
pub struct ComponentDispatcher {
    registry: Rc<ComponentRegistry>,
}

impl ComponentDispatcher {
    pub fn attach(bus: &MessageBus, registry: Rc<ComponentRegistry>) -> Self {
        {
            let reg = registry.clone();
            bus.subscribe(MessageKind::Start, move |_| {
                dispatch(&reg.startable, "Start", |c| c.borrow_mut().on_start());
            });
        }
        {
            let reg = registry.clone();
            bus.subscribe(MessageKind::EarlyUpdate, move |msg| {
                let &Message::EarlyUpdate { dt } = msg else {
                    return;
                };
                dispatch(&reg.early_updatable, "EarlyUpdate", |c| {
                    c.borrow_mut().on_early_update(dt)
                });
            });
        }
        {
            let reg = registry.clone();
            bus.subscribe(MessageKind::Update, move |msg| {
                let &Message::Update { dt } = msg else {
                    return;
                };
                dispatch(&reg.updatable, "Update", |c| c.borrow_mut().on_update(dt));
            });
        }
        {
            let reg = registry.clone();
            bus.subscribe(MessageKind::LateUpdate, move |msg| {
                let &Message::LateUpdate { dt } = msg else {
                    return;
                };
                dispatch(&reg.late_updatable, "LateUpdate", |c| {
                    c.borrow_mut().on_late_update(dt)
                });
            });
        }
        {
            let reg = registry.clone();
            bus.subscribe(MessageKind::FixedUpdate, move |msg| {
                let &Message::FixedUpdate { fixed_dt } = msg else {
                    return;
                };
                dispatch(&reg.fixed_updatable, "FixedUpdate", |c| {
                    c.borrow_mut().on_fixed_update(fixed_dt)
                });
            });
        }

        Self { registry }
    }

    #[inline]
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }
}

/// Snapshot-iterate one capability collector, isolating per-component
/// failures. Dead weak handles are skipped here and pruned afterwards.
fn dispatch<T, F>(collector: &RefCell<Collector<T>>, stage: &'static str, mut call: F)
where
    T: ?Sized,
    F: FnMut(&RefCell<T>) -> crate::error::EngineResult<()>,
{
    let snapshot: Vec<(ComponentId, WeakHandle<T>)> = collector.borrow().snapshot();

    let mut saw_dead = false;
    for (id, weak) in snapshot {
        let Some(component) = weak.upgrade() else {
            saw_dead = true;
            continue;
        };
        if let Err(e) = call(&component) {
            log::error!("component {id:?} failed in {stage}: {e}");
        }
    }

    if saw_dead {
        collector.borrow_mut().prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, EngineResult};
    use crate::registry::{ComponentHandle, Updatable};

    use std::cell::Cell;

    struct Counter {
        hits: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Updatable for Counter {
        fn on_update(&mut self, _dt: f32) -> EngineResult<()> {
            self.hits.set(self.hits.get() + 1);
            if self.fail {
                return Err(EngineError::other("boom"));
            }
            Ok(())
        }
    }

    fn register(
        registry: &ComponentRegistry,
        hits: Rc<Cell<u32>>,
        fail: bool,
    ) -> (ComponentId, ComponentHandle<Counter>) {
        let obj: ComponentHandle<Counter> = Rc::new(RefCell::new(Counter { hits, fail }));
        let id = ComponentId::next();
        let weak: WeakHandle<dyn Updatable> = Rc::<RefCell<Counter>>::downgrade(&obj);
        registry.updatable.borrow_mut().add(id, weak);
        (id, obj)
    }

    #[test]
    fn update_message_reaches_every_component() {
        let bus = MessageBus::new();
        let registry = Rc::new(ComponentRegistry::new());
        let _dispatcher = ComponentDispatcher::attach(&bus, registry.clone());

        let hits = Rc::new(Cell::new(0u32));
        let (_ida, _a) = register(&registry, hits.clone(), false);
        let (_idb, _b) = register(&registry, hits.clone(), false);

        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn failing_component_does_not_stop_the_pass() {
        let bus = MessageBus::new();
        let registry = Rc::new(ComponentRegistry::new());
        let _dispatcher = ComponentDispatcher::attach(&bus, registry.clone());

        let hits = Rc::new(Cell::new(0u32));
        let (_ida, _a) = register(&registry, hits.clone(), true);
        let (_idb, _b) = register(&registry, hits.clone(), false);

        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn removal_during_dispatch_affects_next_pass_only() {
        let bus = MessageBus::new();
        let registry = Rc::new(ComponentRegistry::new());
        let _dispatcher = ComponentDispatcher::attach(&bus, registry.clone());

        struct SelfRemover {
            id: Cell<Option<ComponentId>>,
            registry: Rc<ComponentRegistry>,
            hits: Rc<Cell<u32>>,
        }

        impl Updatable for SelfRemover {
            fn on_update(&mut self, _dt: f32) -> EngineResult<()> {
                self.hits.set(self.hits.get() + 1);
                if let Some(id) = self.id.take() {
                    self.registry.remove_everywhere(id);
                }
                Ok(())
            }
        }

        let hits = Rc::new(Cell::new(0u32));

        let remover: ComponentHandle<SelfRemover> = Rc::new(RefCell::new(SelfRemover {
            id: Cell::new(None),
            registry: registry.clone(),
            hits: hits.clone(),
        }));
        let remover_id = ComponentId::next();
        remover.borrow_mut().id.set(Some(remover_id));
        let weak: WeakHandle<dyn Updatable> = Rc::<RefCell<SelfRemover>>::downgrade(&remover);
        registry.updatable.borrow_mut().add(remover_id, weak);

        let (_id2, _keep) = register(&registry, hits.clone(), false);

        // Both components run this pass even though the first removes itself.
        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 2);

        // Next pass only the survivor runs.
        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn dropped_component_is_skipped_and_pruned() {
        let bus = MessageBus::new();
        let registry = Rc::new(ComponentRegistry::new());
        let _dispatcher = ComponentDispatcher::attach(&bus, registry.clone());

        let hits = Rc::new(Cell::new(0u32));
        let (_ida, a) = register(&registry, hits.clone(), false);
        let (_idb, _b) = register(&registry, hits.clone(), false);
        drop(a);

        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.updatable.borrow().len(), 1);
    }
}
