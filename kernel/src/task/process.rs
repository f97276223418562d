use std::ffi::CString;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use sync::Mutex;
use systype::{EntryFn, HandleId, Registers, SysError, SysResult};

use crate::fs::path::Path;
use crate::handle::{HandleKind, HandleRef, KernelObject};
use crate::task::thread::{self, Thread};
use crate::Kernel;

struct ProcessInner {
    handles: HashMap<HandleId, HandleRef>,
    cwd: Path,
    main_thread: HandleId,
}

/// Kernel side of one process: its private handle set, working directory,
/// command line and thread accounting. The process is running exactly
/// while its thread count is above zero; the record stays in the handle
/// table afterwards until the last reference drops.
pub struct Process {
    name: String,
    cmd_line: CString,
    started: AtomicBool,
    thread_count: AtomicU16,
    inner: Mutex<ProcessInner>,
}

impl Process {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command line as handed to the process; immutable for its lifetime.
    pub fn cmd_line(&self) -> &str {
        self.cmd_line.to_str().unwrap_or("")
    }

    pub fn thread_count(&self) -> u16 {
        self.thread_count.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.thread_count() > 0
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn has_ended(&self) -> bool {
        self.has_started() && !self.is_running()
    }

    pub(crate) fn set_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    pub(crate) fn increment_thread_count(&self) -> u16 {
        self.thread_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn decrement_thread_count(&self) -> u16 {
        self.thread_count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn working_directory(&self) -> Path {
        self.inner.lock().cwd.clone()
    }

    pub fn set_working_directory(&self, path: Path) {
        self.inner.lock().cwd = path;
    }

    /// Prefix a relative path with the working directory.
    pub fn make_path_absolute(&self, path: &mut Path) {
        if path.is_relative() {
            let inner = self.inner.lock();
            path.make_absolute(&inner.cwd);
        }
    }

    /// Reference to the process's first thread.
    pub fn main_thread(&self) -> Option<HandleRef> {
        let inner = self.inner.lock();
        inner.handles.get(&inner.main_thread).cloned()
    }

    /// Acquire a handle out of this process's set.
    pub fn get_handle(&self, id: HandleId) -> Option<HandleRef> {
        self.inner.lock().handles.get(&id).cloned()
    }

    pub fn get_handle_of_kind(&self, id: HandleId, kind: HandleKind) -> Option<HandleRef> {
        let inner = self.inner.lock();
        inner
            .handles
            .get(&id)
            .filter(|handle| handle.kind() == kind)
            .cloned()
    }

    /// Visit `ids` in order against this process's handle set under its
    /// lock. Stops and returns false on the first id that is not in the
    /// set or for which the callback returns false.
    pub fn for_each_handle<F>(&self, ids: &[HandleId], mut f: F) -> bool
    where
        F: FnMut(HandleId, &HandleRef, usize) -> bool,
    {
        let inner = self.inner.lock();
        for (index, id) in ids.iter().enumerate() {
            match inner.handles.get(id) {
                Some(handle) => {
                    if !f(*id, handle, index) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Transfer a reference into this process's handle set.
    pub fn add_handle(&self, handle: HandleRef) {
        self.inner.lock().handles.insert(handle.id(), handle);
    }

    pub fn remove_handle(&self, id: HandleId) {
        self.inner.lock().handles.remove(&id);
    }

    /// Create a process with its main thread. The stdin/stdout references
    /// are transferred into the new process's handle set and their ids are
    /// prefilled in the entry context together with the command-line
    /// pointer. With `in_current_thread` the main thread runs on the
    /// calling host thread and `create` returns only after the entry
    /// function does; this is the bootstrap path.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        kernel: &Arc<Kernel>,
        name: &str,
        cmd_line: &str,
        cwd: Path,
        entry: EntryFn,
        std_in: Option<HandleRef>,
        std_out: Option<HandleRef>,
        in_current_thread: bool,
    ) -> SysResult<HandleRef> {
        let cmd_line = CString::new(cmd_line).map_err(|_| SysError::InvalidArgument)?;

        let process = Arc::new(Process {
            name: name.to_string(),
            cmd_line,
            started: AtomicBool::new(false),
            thread_count: AtomicU16::new(0),
            inner: Mutex::new(ProcessInner {
                handles: HashMap::new(),
                cwd,
                main_thread: 0,
            }),
        });

        let process_ref = kernel
            .handles()
            .add(KernelObject::Process(Arc::clone(&process)))?;

        let mut context = Registers::default();
        context
            .rax
            .set_x(std_in.as_ref().map_or(0, HandleRef::id));
        context
            .rbx
            .set_x(std_out.as_ref().map_or(0, HandleRef::id));
        context.rdi.set_full(process.cmd_line.as_ptr() as u64);

        if let Some(handle) = std_in {
            process.add_handle(handle);
        }
        if let Some(handle) = std_out {
            process.add_handle(handle);
        }

        let thread_ref = kernel
            .handles()
            .add(KernelObject::Thread(Arc::new(Thread::new())))?;
        {
            let mut inner = process.inner.lock();
            inner.main_thread = thread_ref.id();
            inner.handles.insert(thread_ref.id(), thread_ref.clone());
        }

        log::info!(
            "[Process::create] '{}' as process {} (main thread {})",
            name,
            process_ref.id(),
            thread_ref.id()
        );

        if in_current_thread {
            thread::run(
                Arc::clone(kernel),
                entry,
                context,
                thread_ref,
                process_ref.clone(),
            );
        } else {
            thread::start(kernel, entry, context, thread_ref, process_ref.clone())?;
        }

        Ok(process_ref)
    }
}
