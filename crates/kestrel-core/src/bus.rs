use crate::message::{Message, MessageKind};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Dispatch deeper than this is assumed to be an accidental message cycle.
const MAX_DISPATCH_DEPTH: u32 = 16;

pub type Handler = Rc<RefCell<dyn FnMut(&Message)>>;

/// Synchronous typed publish/subscribe hub for lifecycle messages.
///
/// `send` invokes every handler registered for the message's kind, in
/// registration order, and does not return until all of them completed.
/// Sending to a kind with no subscribers is a defined no-op.
///
/// Dispatch is reentrant by contract: a handler may call `send` again from
/// within its callback (GameLogicStart triggers a nested Start dispatch this
/// way). The handler list is snapshotted before delivery, so subscriptions
/// made during a dispatch only take effect for later sends. Recursion depth
/// is bounded; past the bound the message is dropped with an error log.
///
/// The bus is single-threaded, like everything else in the frame loop.
pub struct MessageBus {
    handlers: RefCell<HashMap<MessageKind, Vec<Handler>>>,
    depth: Cell<u32>,
}

impl Default for MessageBus {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    #[inline]
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
            depth: Cell::new(0),
        }
    }

    /// Appends a handler for `kind`. Never fails. There is no unsubscribe:
    /// subscriptions live as long as the bus, which is scoped to one engine
    /// run.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F)
    where
        F: FnMut(&Message) + 'static,
    {
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Rc::new(RefCell::new(handler)));
    }

    /// Synchronously delivers `msg` to every subscriber of its kind.
    pub fn send(&self, msg: &Message) {
        let depth = self.depth.get();
        if depth >= MAX_DISPATCH_DEPTH {
            log::error!(
                "message cycle suspected: dropping {} at dispatch depth {}",
                msg.kind().as_str(),
                depth
            );
            return;
        }

        // Snapshot so handlers may subscribe or send without invalidating
        // this pass.
        let snapshot: Vec<Handler> = {
            let map = self.handlers.borrow();
            match map.get(&msg.kind()) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        self.depth.set(depth + 1);
        for handler in snapshot {
            // A handler that reentrantly reaches itself is a contract
            // violation; skip it instead of aborting the frame.
            match handler.try_borrow_mut() {
                Ok(mut f) => f(msg),
                Err(_) => {
                    log::error!(
                        "handler for {} re-entered itself; skipped",
                        msg.kind().as_str()
                    );
                }
            }
        }
        self.depth.set(depth);
    }

    #[inline]
    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.handlers
            .borrow()
            .get(&kind)
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::rc::Rc;

    #[test]
    fn send_invokes_once_per_send() {
        let bus = MessageBus::new();
        let hits = Rc::new(Cell::new(0u32));

        let h = hits.clone();
        bus.subscribe(MessageKind::Update, move |_| h.set(h.get() + 1));

        bus.send(&Message::Update { dt: 0.016 });
        bus.send(&Message::Update { dt: 0.016 });
        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn send_to_unsubscribed_kind_is_noop() {
        let bus = MessageBus::new();
        bus.send(&Message::Quitting);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = MessageBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = order.clone();
            bus.subscribe(MessageKind::Render, move |_| {
                order.borrow_mut().push(tag);
            });
        }

        bus.send(&Message::Render);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn handler_never_sees_other_kinds() {
        let bus = MessageBus::new();
        let hits = Rc::new(Cell::new(0u32));

        let h = hits.clone();
        bus.subscribe(MessageKind::Update, move |_| h.set(h.get() + 1));

        bus.send(&Message::FixedUpdate { fixed_dt: 0.02 });
        bus.send(&Message::LateUpdate { dt: 0.016 });
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn reentrant_send_runs_nested_dispatch_to_completion() {
        let bus = Rc::new(MessageBus::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        {
            let order = order.clone();
            bus.subscribe(MessageKind::Start, move |_| {
                order.borrow_mut().push("start");
            });
        }
        {
            let bus2 = bus.clone();
            let order = order.clone();
            bus.subscribe(MessageKind::GameLogicStart, move |_| {
                order.borrow_mut().push("logic-begin");
                bus2.send(&Message::Start);
                order.borrow_mut().push("logic-end");
            });
        }

        bus.send(&Message::GameLogicStart);
        assert_eq!(*order.borrow(), vec!["logic-begin", "start", "logic-end"]);
    }

    #[test]
    fn runaway_cycle_is_bounded() {
        let bus = Rc::new(MessageBus::new());
        let hits = Rc::new(Cell::new(0u32));

        // Update -> Render -> Update -> ... ping-pong, no self-reentry.
        {
            let bus2 = bus.clone();
            let h = hits.clone();
            bus.subscribe(MessageKind::Update, move |_| {
                h.set(h.get() + 1);
                bus2.send(&Message::Render);
            });
        }
        {
            let bus2 = bus.clone();
            bus.subscribe(MessageKind::Render, move |_| {
                bus2.send(&Message::Update { dt: 0.016 });
            });
        }

        bus.send(&Message::Update { dt: 0.016 });
        assert!(hits.get() <= MAX_DISPATCH_DEPTH);
    }

    #[test]
    fn subscription_during_dispatch_applies_to_next_send() {
        let bus = Rc::new(MessageBus::new());
        let hits = Rc::new(Cell::new(0u32));

        {
            let bus2 = bus.clone();
            let h = hits.clone();
            bus.subscribe(MessageKind::SceneLoaded, move |_| {
                let h = h.clone();
                bus2.subscribe(MessageKind::Update, move |_| h.set(h.get() + 1));
            });
        }

        bus.send(&Message::SceneLoaded {
            scene: "level0".to_string(),
        });
        bus.send(&Message::Update { dt: 0.016 });
        assert_eq!(hits.get(), 1);
    }
}
