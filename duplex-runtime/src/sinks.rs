//! The Manager's cross-cutting error sinks (spec §4.2), threaded down
//! into every Helper at construction time so a deeply nested ToolCall
//! can fire `anyErrorStart`/`unhandledErrorStart` without holding a
//! reference to the whole `Manager`.

use std::cell::RefCell;
use std::rc::Rc;

use duplex_protocol::ErrorEndEvent;
use duplex_protocol::ErrorEvent;

use crate::handler::fire;
use crate::handler::HandlerList;

#[derive(Default)]
struct SinksInner {
    on_any_error_start: HandlerList<ErrorEvent>,
    on_any_error_end: HandlerList<ErrorEndEvent>,
    on_unhandled_error_start: HandlerList<ErrorEvent>,
    on_unhandled_error_end: HandlerList<ErrorEndEvent>,
}

#[derive(Clone)]
pub struct ManagerSinks(Rc<RefCell<SinksInner>>);

impl Default for ManagerSinks {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(SinksInner::default())))
    }
}

impl ManagerSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_any_error_start(&self, handler: impl Fn(&ErrorEvent) + 'static) -> u64 {
        self.0.borrow_mut().on_any_error_start.register(handler)
    }

    pub fn off_any_error_start(&self, id: u64) {
        self.0.borrow_mut().on_any_error_start.remove(id);
    }

    pub fn on_any_error_end(&self, handler: impl Fn(&ErrorEndEvent) + 'static) -> u64 {
        self.0.borrow_mut().on_any_error_end.register(handler)
    }

    pub fn off_any_error_end(&self, id: u64) {
        self.0.borrow_mut().on_any_error_end.remove(id);
    }

    pub fn on_unhandled_error_start(&self, handler: impl Fn(&ErrorEvent) + 'static) -> u64 {
        self.0.borrow_mut().on_unhandled_error_start.register(handler)
    }

    pub fn off_unhandled_error_start(&self, id: u64) {
        self.0.borrow_mut().on_unhandled_error_start.remove(id);
    }

    pub fn on_unhandled_error_end(&self, handler: impl Fn(&ErrorEndEvent) + 'static) -> u64 {
        self.0.borrow_mut().on_unhandled_error_end.register(handler)
    }

    pub fn off_unhandled_error_end(&self, id: u64) {
        self.0.borrow_mut().on_unhandled_error_end.remove(id);
    }

    pub fn fire_any_error_start(&self, event: &ErrorEvent) {
        let snapshot = self.0.borrow().on_any_error_start.snapshot();
        fire(&snapshot, event);
    }

    pub fn fire_any_error_end(&self, event: &ErrorEndEvent) {
        let snapshot = self.0.borrow().on_any_error_end.snapshot();
        fire(&snapshot, event);
    }

    /// Called only when the target Helper has no local `onErrorStart`
    /// handler. Logs a warning if no unhandled-error sink is registered
    /// either (spec §4.2: "an unhandled error start with no sink logs a
    /// warning").
    pub fn fire_unhandled_error_start(&self, event: &ErrorEvent) {
        let snapshot = self.0.borrow().on_unhandled_error_start.snapshot();
        if snapshot.is_empty() {
            tracing::warn!(error_id = %event.error_id, message = %event.message, "unhandled error start with no sink registered");
            return;
        }
        fire(&snapshot, event);
    }

    pub fn fire_unhandled_error_end(&self, event: &ErrorEndEvent) {
        let snapshot = self.0.borrow().on_unhandled_error_end.snapshot();
        fire(&snapshot, event);
    }
}

#[cfg(test)]
#[path = "sinks.test.rs"]
mod tests;
