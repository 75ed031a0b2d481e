//! Intercepts `operator new` / `operator new[]` (and analogous allocators)
//! via breakpoints, recording `address -> byte-size`.
//!
//! The tracker itself is a passive table; the breakpoint objects in this
//! module are the command-pattern callbacks a debugger backend
//! invokes on allocator entry/return. They only ever observe — they never
//! write inferior memory, and they always request "do not stop" so the
//! inferior's own execution is never perturbed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::debugger::{Architecture, BreakpointAction, RegisterRole};

/// Side-table of heap extents observed via allocator interception.
#[derive(Debug, Default)]
pub struct AllocationTracker {
    table: HashMap<u64, u64>,
}

impl AllocationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the size tracked at `address`. A second
    /// allocation returning the same address (a reallocation into the same
    /// slot) silently replaces the old entry rather than failing (spec
    /// §4.5).
    pub fn record(&mut self, address: u64, size: u64) {
        self.table.insert(address, size);
    }

    pub fn remove(&mut self, address: u64) -> Option<u64> {
        self.table.remove(&address)
    }

    #[must_use]
    pub fn is_allocated(&self, address: u64) -> bool {
        self.table.contains_key(&address)
    }

    #[must_use]
    pub fn size_of(&self, address: u64) -> Option<u64> {
        self.table.get(&address).copied()
    }

    pub fn list(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.table.iter().map(|(&addr, &size)| (addr, size))
    }
}

/// Shared handle breakpoint callbacks and the engine both hold. Per spec
/// §5, this is a one-writer/one-reader discipline with no temporal overlap
/// (writes happen only while the inferior runs; reads only while stopped),
/// so a bare `RefCell` — rather than a `Mutex` — is the right tool on this
/// single-threaded, cooperative control flow.
pub type SharedTracker = Rc<RefCell<AllocationTracker>>;

#[must_use]
pub fn shared_tracker() -> SharedTracker {
    Rc::new(RefCell::new(AllocationTracker::new()))
}

/// A breakpoint callback, invoked synchronously by the debugger thread.
/// Implementations must be idempotent and must confine their side effects
/// to the [`AllocationTracker`].
pub trait Trigger {
    fn trigger(&mut self, arch: &dyn Architecture) -> BreakpointAction;
}

/// Fires on entry to an allocator (`operator new`, `operator new[]`, ...);
/// records the requested size from `arg0` and hands it to a paired
/// [`AllocatorReturnBreakpoint`] via a shared cell (the "one-shot return
/// hook" of ).
pub struct AllocatorEntryBreakpoint {
    pending_size: Rc<Cell<Option<u64>>>,
}

impl AllocatorEntryBreakpoint {
    #[must_use]
    pub fn new(pending_size: Rc<Cell<Option<u64>>>) -> Self {
        Self { pending_size }
    }
}

impl Trigger for AllocatorEntryBreakpoint {
    fn trigger(&mut self, arch: &dyn Architecture) -> BreakpointAction {
        if let Some(size) = arch.read_register(arch.register_name(RegisterRole::Arg0)) {
            self.pending_size.set(Some(size));
        }
        BreakpointAction::Continue
    }
}

/// Fires on return from an allocator; reads the returned address from
/// `ret` and records `address -> size` in the tracker.
pub struct AllocatorReturnBreakpoint {
    tracker: SharedTracker,
    pending_size: Rc<Cell<Option<u64>>>,
}

impl AllocatorReturnBreakpoint {
    #[must_use]
    pub fn new(tracker: SharedTracker, pending_size: Rc<Cell<Option<u64>>>) -> Self {
        Self {
            tracker,
            pending_size,
        }
    }
}

impl Trigger for AllocatorReturnBreakpoint {
    fn trigger(&mut self, arch: &dyn Architecture) -> BreakpointAction {
        if let (Some(address), Some(size)) = (
            arch.read_register(arch.register_name(RegisterRole::Ret)),
            self.pending_size.take(),
        ) {
            self.tracker.borrow_mut().record(address, size);
        }
        BreakpointAction::Continue
    }
}

/// Fires on entry to a deallocator (`operator delete`, `operator
/// delete[]`), if the driver chose to instrument one; removes the freed
/// address from the tracker. Spec §9 leaves purge-on-free as an open
/// question the original implementation never exercised (only array `new`
/// was tracked there) — this crate resolves it by making deallocator
/// tracking opt-in: the engine only loses an entry if this breakpoint was
/// actually registered.
pub struct DeallocatorEntryBreakpoint {
    tracker: SharedTracker,
}

impl DeallocatorEntryBreakpoint {
    #[must_use]
    pub fn new(tracker: SharedTracker) -> Self {
        Self { tracker }
    }
}

impl Trigger for DeallocatorEntryBreakpoint {
    fn trigger(&mut self, arch: &dyn Architecture) -> BreakpointAction {
        if let Some(address) = arch.read_register(arch.register_name(RegisterRole::Arg0)) {
            self.tracker.borrow_mut().remove(address);
        }
        BreakpointAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::synthetic::X86_64;

    #[test]
    fn entry_then_return_records_size_at_returned_address() {
        let tracker = shared_tracker();
        let pending = Rc::new(Cell::new(None));
        let mut entry = AllocatorEntryBreakpoint::new(Rc::clone(&pending));
        let mut ret = AllocatorReturnBreakpoint::new(Rc::clone(&tracker), Rc::clone(&pending));

        let arch = X86_64::new().with_register("rdi", 16).with_register("rax", 0x4000);
        assert_eq!(entry.trigger(&arch), BreakpointAction::Continue);
        assert_eq!(ret.trigger(&arch), BreakpointAction::Continue);

        assert!(tracker.borrow().is_allocated(0x4000));
        assert_eq!(tracker.borrow().size_of(0x4000), Some(16));
    }

    #[test]
    fn reallocation_into_same_slot_overwrites() {
        let tracker = shared_tracker();
        tracker.borrow_mut().record(0x4000, 16);
        tracker.borrow_mut().record(0x4000, 32);
        assert_eq!(tracker.borrow().size_of(0x4000), Some(32));
    }

    #[test]
    fn deallocation_removes_entry() {
        let tracker = shared_tracker();
        tracker.borrow_mut().record(0x4000, 16);
        let mut dealloc = DeallocatorEntryBreakpoint::new(Rc::clone(&tracker));
        let arch = X86_64::new().with_register("rdi", 0x4000);
        dealloc.trigger(&arch);
        assert!(!tracker.borrow().is_allocated(0x4000));
    }

    #[test]
    fn breakpoints_never_request_a_stop() {
        let tracker = shared_tracker();
        let pending = Rc::new(Cell::new(Some(8)));
        let mut ret = AllocatorReturnBreakpoint::new(tracker, pending);
        let arch = X86_64::new().with_register("rax", 0x5000);
        assert_eq!(ret.trigger(&arch), BreakpointAction::Continue);
    }
}
