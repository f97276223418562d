//! Threads, processes and the per-thread task environment.
//!
//! While a user thread runs, a thread-local [`TaskEnv`] names its kernel,
//! its own thread handle and its process. Syscall handlers reach their
//! caller through it; a thread without one gets `UnrecognizedThread`.

pub mod process;
pub mod thread;

use std::cell::RefCell;
use std::sync::Arc;

use systype::{HandleId, Registers};

use crate::handle::HandleRef;
use crate::task::process::Process;
use crate::task::thread::Thread;
use crate::Kernel;

pub struct TaskEnv {
    pub kernel: Arc<Kernel>,
    pub thread: HandleRef,
    pub process: HandleRef,
}

thread_local! {
    static TASK_ENV: RefCell<Option<TaskEnv>> = const { RefCell::new(None) };
}

/// Installs the task environment for the current host thread and tears it
/// down on drop, at the very end of the thread's life.
pub(crate) struct EnvGuard;

impl EnvGuard {
    pub fn install(kernel: Arc<Kernel>, thread: HandleRef, process: HandleRef) -> Self {
        TASK_ENV.with(|env| {
            *env.borrow_mut() = Some(TaskEnv {
                kernel,
                thread,
                process,
            });
        });
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        TASK_ENV.with(|env| {
            *env.borrow_mut() = None;
        });
    }
}

pub fn has_environment() -> bool {
    TASK_ENV.with(|env| env.borrow().is_some())
}

pub fn with_env<R>(f: impl FnOnce(&TaskEnv) -> R) -> Option<R> {
    TASK_ENV.with(|env| env.borrow().as_ref().map(f))
}

pub fn current_kernel() -> Option<Arc<Kernel>> {
    with_env(|env| Arc::clone(&env.kernel))
}

pub fn current_thread() -> Option<Arc<Thread>> {
    with_env(|env| env.thread.as_thread()).flatten()
}

pub fn current_thread_id() -> Option<HandleId> {
    with_env(|env| env.thread.id())
}

pub fn current_process() -> Option<Arc<Process>> {
    with_env(|env| env.process.as_process()).flatten()
}

pub fn current_process_id() -> Option<HandleId> {
    with_env(|env| env.process.id())
}

/// Deliver pending signals of the current thread. Called on both edges of
/// every syscall; a thread without a handler keeps its mask pending only
/// until the next registration clears it.
pub fn handle_signals() {
    let Some(thread) = current_thread() else {
        return;
    };
    let Some(handler) = thread.signal_handler() else {
        return;
    };

    let pending = thread.take_pending();
    if pending.is_empty() {
        return;
    }

    for sig in pending.iter_sigs() {
        if thread.signal_enabled(sig) {
            log::debug!("[task::handle_signals] delivering signal {sig}");
            let mut context = Registers::default();
            context.rcx.set_ex(u32::from(sig.number()));
            handler(&context);
        }
    }
}
