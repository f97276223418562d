//! Sleep-until-signaled over thread and process lifecycle events.
//!
//! A waiter names a set of handles and an event mask; the thread sleeps
//! until one of the named objects reports one of the events. Validation
//! and registration happen under the same lock that `dispatch` takes, so
//! an event arriving between the two cannot be missed.

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use sync::{Condvar, Mutex};
use systype::{HandleId, SysError, SysResult};

use crate::handle::{HandleRef, KernelObject};
use crate::task;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EventSet: u8 {
        const THREAD_START  = 1 << 0;
        const THREAD_END    = 1 << 1;
        const PROCESS_START = 1 << 2;
        const PROCESS_END   = 1 << 3;
    }
}

struct WaitSlot {
    mask: EventSet,
    handles: Vec<HandleId>,
    /// Index into `handles` once signaled, -1 before.
    signaled: AtomicIsize,
}

pub struct EventSystem {
    waiters: Mutex<Vec<Arc<WaitSlot>>>,
    cv: Condvar,
}

enum HandleState {
    Occurred,
    Waitable,
    NotWaitable,
}

fn check_handle(handle: &HandleRef, mask: EventSet) -> HandleState {
    match handle.object() {
        KernelObject::Thread(thread) => {
            if mask.contains(EventSet::THREAD_START) && thread.has_started() {
                HandleState::Occurred
            } else if mask.contains(EventSet::THREAD_END) && thread.has_ended() {
                HandleState::Occurred
            } else {
                HandleState::Waitable
            }
        }
        KernelObject::Process(process) => {
            if mask.contains(EventSet::PROCESS_START) && process.has_started() {
                HandleState::Occurred
            } else if mask.contains(EventSet::PROCESS_END) && process.has_ended() {
                HandleState::Occurred
            } else {
                HandleState::Waitable
            }
        }
        KernelObject::File(_) => HandleState::NotWaitable,
    }
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(Vec::new()),
            cv: Condvar::new(),
        }
    }

    /// Sleep until one of `handles` reports an event in `mask`; the result
    /// is the index of the first handle that did. Handles must live in the
    /// calling process's handle set and be threads or processes.
    pub fn wait_for_any(&self, handles: &[HandleId], mask: EventSet) -> SysResult<u16> {
        if mask.is_empty() || handles.is_empty() {
            return Err(SysError::InvalidArgument);
        }

        let process = task::current_process().ok_or(SysError::UnrecognizedThread)?;

        // incoming events are held off while the handles are inspected
        let mut waiters = self.waiters.lock();

        let mut already_signaled: Option<usize> = None;
        let mut rejected = false;
        let complete = process.for_each_handle(handles, |_, handle, index| {
            match check_handle(handle, mask) {
                HandleState::Occurred => {
                    already_signaled = Some(index);
                    false
                }
                HandleState::Waitable => true,
                HandleState::NotWaitable => {
                    rejected = true;
                    false
                }
            }
        });

        if let Some(index) = already_signaled {
            return Ok(index as u16);
        }
        if rejected || !complete {
            // unknown handle, foreign handle, or a kind without events
            return Err(SysError::InvalidArgument);
        }

        let slot = Arc::new(WaitSlot {
            mask,
            handles: handles.to_vec(),
            signaled: AtomicIsize::new(-1),
        });
        waiters.push(Arc::clone(&slot));

        loop {
            waiters = self.cv.wait(waiters);
            let index = slot.signaled.load(Ordering::Relaxed);
            if index >= 0 {
                waiters.retain(|other| !Arc::ptr_eq(other, &slot));
                return Ok(index as u16);
            }
        }
    }

    /// Signal `event` on `handle`, waking every waiter whose mask and
    /// handle list match. The first matching position in each waiter's
    /// handle array becomes its result.
    pub fn dispatch(&self, event: EventSet, handle: HandleId) {
        let waiters = self.waiters.lock();

        let mut woke = false;
        for slot in waiters.iter() {
            if slot.mask.intersects(event) {
                if let Some(index) = slot.handles.iter().position(|&id| id == handle) {
                    slot.signaled.store(index as isize, Ordering::Relaxed);
                    woke = true;
                }
            }
        }
        drop(waiters);

        if woke {
            self.cv.notify_all();
        }
        log::trace!("[EventSystem::dispatch] {event:?} on {handle}");
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
