use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use signal::{Sig, SigPending, SigSet};
use sync::Mutex;
use systype::{EntryFn, Registers, SysError, SysResult};

use crate::event::EventSet;
use crate::handle::{HandleRef, KernelObject};
use crate::task::EnvGuard;
use crate::Kernel;

/// Kernel side of one user thread.
///
/// `started` and `running` are latched independently: a thread that never
/// ran reports neither THREAD_START nor THREAD_END, a finished one reports
/// both. The record outlives the host thread for exit-code retrieval.
pub struct Thread {
    exit_code: AtomicI32,
    exit_explicit: AtomicBool,
    running: AtomicBool,
    started: AtomicBool,
    pending: SigPending,
    signal_mask: AtomicU32,
    signal_handler: Mutex<Option<EntryFn>>,
}

impl Thread {
    pub fn new() -> Self {
        Self {
            exit_code: AtomicI32::new(0),
            exit_explicit: AtomicBool::new(false),
            running: AtomicBool::new(false),
            started: AtomicBool::new(false),
            pending: SigPending::new(),
            signal_mask: AtomicU32::new(0),
            signal_handler: Mutex::new(None),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::Relaxed)
    }

    /// Explicit exit through the Exit syscall; wins over the value the
    /// entry function later returns.
    pub fn set_exit_code(&self, code: i32) {
        self.exit_explicit.store(true, Ordering::Relaxed);
        self.exit_code.store(code, Ordering::Relaxed);
    }

    /// Exit code from returning out of the entry function; only counts
    /// when the thread never exited explicitly.
    fn set_return_code(&self, code: i32) {
        if !self.exit_explicit.load(Ordering::Relaxed) {
            self.exit_code.store(code, Ordering::Relaxed);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn has_ended(&self) -> bool {
        self.has_started() && !self.is_running()
    }

    pub fn raise_signal(&self, sig: Sig) {
        self.pending.raise(sig);
    }

    pub fn take_pending(&self) -> SigSet {
        self.pending.take()
    }

    pub fn signal_enabled(&self, sig: Sig) -> bool {
        let mask = SigSet::from_bits_retain(self.signal_mask.load(Ordering::Relaxed));
        mask.contains_sig(sig)
    }

    /// Enable or disable one signal; disabling also drops a pending
    /// instance of it.
    pub fn set_signal_enabled(&self, sig: Sig, enabled: bool) {
        let mut bit = SigSet::empty();
        bit.add(sig);
        if enabled {
            self.signal_mask.fetch_or(bit.bits(), Ordering::Relaxed);
        } else {
            self.signal_mask.fetch_and(!bit.bits(), Ordering::Relaxed);
            self.pending.discard(sig);
        }
    }

    pub fn signal_handler(&self) -> Option<EntryFn> {
        *self.signal_handler.lock()
    }

    pub fn set_signal_handler(&self, handler: Option<EntryFn>) {
        *self.signal_handler.lock() = handler;
    }

    /// Create the thread record and start a host thread running `entry`
    /// inside `process`. The caller owns the returned reference; the host
    /// thread keeps its own.
    pub fn spawn(
        kernel: &Arc<Kernel>,
        entry: EntryFn,
        context: Registers,
        process: &HandleRef,
    ) -> SysResult<HandleRef> {
        let thread_ref = kernel
            .handles()
            .add(KernelObject::Thread(Arc::new(Thread::new())))?;
        start(kernel, entry, context, thread_ref.clone(), process.clone())?;
        Ok(thread_ref)
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// Launch a host thread that runs the entry protocol.
pub(crate) fn start(
    kernel: &Arc<Kernel>,
    entry: EntryFn,
    context: Registers,
    thread_ref: HandleRef,
    process_ref: HandleRef,
) -> SysResult<()> {
    let kernel = Arc::clone(kernel);
    std::thread::Builder::new()
        .name(format!("task-{}", thread_ref.id()))
        .spawn(move || run(kernel, entry, context, thread_ref, process_ref))
        .map_err(|err| {
            log::error!("[thread::start] host thread creation failed: {err}");
            SysError::OutOfMemory
        })?;
    Ok(())
}

/// The entry protocol: install the task environment, latch the start,
/// announce THREAD_START (and PROCESS_START for the first thread), run the
/// user entry, then unwind in the opposite order.
pub(crate) fn run(
    kernel: Arc<Kernel>,
    entry: EntryFn,
    context: Registers,
    thread_ref: HandleRef,
    process_ref: HandleRef,
) {
    let (Some(thread), Some(process)) = (thread_ref.as_thread(), process_ref.as_process())
    else {
        log::error!("[thread::run] started with mismatched handles");
        return;
    };
    let thread_id = thread_ref.id();
    let process_id = process_ref.id();

    let env = EnvGuard::install(
        Arc::clone(&kernel),
        thread_ref.clone(),
        process_ref.clone(),
    );

    thread.running.store(true, Ordering::SeqCst);
    thread.started.store(true, Ordering::SeqCst);
    kernel.events().dispatch(EventSet::THREAD_START, thread_id);

    if process.increment_thread_count() == 1 {
        process.set_started();
        kernel.events().dispatch(EventSet::PROCESS_START, process_id);
    }

    log::debug!("[thread::run] thread {thread_id} of process {process_id} entered");
    let code = entry(&context);
    thread.set_return_code(code);
    log::debug!("[thread::run] thread {thread_id} left with code {}", thread.exit_code());

    thread.running.store(false, Ordering::SeqCst);
    let process_ended = process.decrement_thread_count() == 0;

    // give the worker's own references back before announcing the end, so
    // an observer woken by the event sees the final reference counts
    drop(env);
    drop(thread_ref);
    drop(process_ref);

    kernel.events().dispatch(EventSet::THREAD_END, thread_id);
    if process_ended {
        kernel.events().dispatch(EventSet::PROCESS_END, process_id);
    }
}
