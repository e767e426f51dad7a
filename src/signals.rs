//! Change notifications from a model to whatever view is bound to it.
//!
//! A [`Signal`] is a list of slots invoked synchronously, in connection
//! order, on the thread that emits. [`ModelSignals`] groups the signals a
//! record model emits around its mutations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::item_model::ModelIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

pub struct Signal<Args> {
    slots: Mutex<Vec<(ConnectionId, Slot<Args>)>>,
    next_id: AtomicU64,
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            blocked: AtomicBool::new(false),
        }
    }

    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().push((id, Arc::new(slot)));
        id
    }

    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::Relaxed);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Relaxed)
    }

    /// Calls every connected slot with `args`.
    ///
    /// The slot list is snapshotted first, so a slot may connect or
    /// disconnect without deadlocking.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            return;
        }
        let slots: Vec<Slot<Args>> = self.slots.lock().iter().map(|(_, s)| s.clone()).collect();
        for slot in slots {
            slot(&args);
        }
    }
}

/// Signals emitted by the record model.
///
/// - Before/after a wholesale change (load, sort, grouping, filter):
///   `layout_about_to_change` / `layout_changed`
/// - Row insertion and removal carry `(first, last)` positions
/// - Cell edits: `data_changed` with top-left and bottom-right indices
/// - Recoverable failures: `error_occurred` with a readable message
#[derive(Default)]
pub struct ModelSignals {
    pub layout_about_to_change: Signal<()>,
    pub layout_changed: Signal<()>,
    pub rows_about_to_be_inserted: Signal<(usize, usize)>,
    pub rows_inserted: Signal<(usize, usize)>,
    pub rows_about_to_be_removed: Signal<(usize, usize)>,
    pub rows_removed: Signal<(usize, usize)>,
    pub data_changed: Signal<(ModelIndex, ModelIndex)>,
    pub error_occurred: Signal<String>,
}

impl ModelSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `change` between the layout signals and returns its result.
    pub fn emit_layout_changed<F, R>(&self, change: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.layout_about_to_change.emit(());
        let out = change();
        self.layout_changed.emit(());
        out
    }

    pub fn emit_rows_inserted<F, R>(&self, first: usize, last: usize, insert: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rows_about_to_be_inserted.emit((first, last));
        let out = insert();
        self.rows_inserted.emit((first, last));
        out
    }

    pub fn emit_rows_removed<F, R>(&self, first: usize, last: usize, remove: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rows_about_to_be_removed.emit((first, last));
        let out = remove();
        self.rows_removed.emit((first, last));
        out
    }
}
