//! Listener bookkeeping shared by every Helper's `onX` registrations
//! (spec §4.3 "Registration", §5 "snapshot-on-iteration").
//!
//! Handlers are `Rc<dyn Fn>` rather than boxed `FnMut` so that firing a
//! batch only needs to clone the `Rc`s out from under a short-lived
//! borrow of the owning `RefCell` before calling any of them — a handler
//! that turns around and registers or unregisters on the same Helper
//! (perfectly legal per spec §9's snapshot-iteration note) never finds
//! the `RefCell` already borrowed. A handler wanting to run an async
//! continuation (spec §4.3: "if a handler returns a promise...") spawns
//! it itself on whatever executor the host owns; this crate is not
//! `Send` and does not drive futures on its own.

use std::rc::Rc;

type HandlerFn<E> = Rc<dyn Fn(&E)>;

pub struct HandlerList<E> {
    next_id: u64,
    entries: Vec<(u64, HandlerFn<E>)>,
}

impl<E> Default for HandlerList<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E> HandlerList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id to pass back to [`HandlerList::remove`].
    pub fn register(&mut self, handler: impl Fn(&E) + 'static) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, Rc::new(handler)));
        id
    }

    pub fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A cheap clone of the current listener set, safe to iterate after
    /// releasing the borrow that produced it — the snapshot-on-iteration
    /// policy from spec §5.
    pub fn snapshot(&self) -> Vec<HandlerFn<E>> {
        self.entries.iter().map(|(_, f)| f.clone()).collect()
    }
}

/// Calls every handler in `snapshot`, catching panics is deliberately not
/// attempted here (spec §7: "handlers failing synchronously are logged");
/// that logging happens at the call site, which knows which event kind
/// and Helper id it is firing.
pub fn fire<E>(snapshot: &[HandlerFn<E>], event: &E) {
    for handler in snapshot {
        handler(event);
    }
}

/// Returned by every `onX` registration (spec §4.3: "every `onX(handler)`
/// returns an unregister function"). Dropping it without calling
/// [`Unsubscribe::unsubscribe`] leaves the handler registered — this is
/// an explicit action, not RAII cleanup.
pub struct Unsubscribe(Box<dyn FnOnce()>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn unsubscribe(self) {
        (self.0)()
    }
}

#[cfg(test)]
#[path = "handler.test.rs"]
mod tests;
