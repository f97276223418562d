//! The simulated kernel.
//!
//! A [`Kernel`] owns the handle table, the event system, the mounted
//! filesystems, the console and the table of user programs. User code runs
//! on host threads inside the host process and talks to the kernel through
//! [`syscall::enter`] with a register-packed request; everything else in
//! this crate is reachable only through that entry point or through
//! [`Kernel`] itself during bootstrap.
//!
//! Kernels are plain values behind an `Arc`: tests build as many as they
//! need, nothing in here is a process-wide global except the per-thread
//! task environment installed while a user thread runs.

pub mod console;
pub mod event;
pub mod fs;
pub mod handle;
pub mod ipc;
pub mod syscall;
pub mod task;
pub mod vfs;

use std::sync::Arc;

use device_core::{BlockDevice, CharDevice};
use hashbrown::HashMap;
use signal::Sig;
use sync::Mutex;
use systype::{EntryFn, SysError, SysResult};

use crate::console::{Console, ConsoleReader};
use crate::event::EventSystem;
use crate::fs::fat::FatVolume;
use crate::fs::path::Path;
use crate::fs::procfs::ProcFs;
use crate::fs::FsManager;
use crate::handle::{HandleKind, HandleRef, HandleTable, KernelObject};
use crate::task::process::Process;

/// Disk letter of the process filesystem.
pub const PROCFS_LETTER: char = '0';

/// Letter assigned to the first disk; disk `i` mounts at `'A' + i`.
pub const FIRST_DISK_LETTER: char = 'A';

pub struct Kernel {
    handles: Arc<HandleTable>,
    events: EventSystem,
    fs: Arc<FsManager>,
    console_reader: Arc<ConsoleReader>,
    console_handle: HandleRef,
    programs: Mutex<HashMap<String, EntryFn>>,
}

impl Kernel {
    /// Bring up a kernel over the given disks and terminal. Each disk is
    /// probed for a filesystem and formatted when none is found; disk `i`
    /// mounts at letter `'A' + i`, the process filesystem at `'0'`.
    pub fn new(
        disks: Vec<Arc<dyn BlockDevice>>,
        tty: Arc<dyn CharDevice>,
    ) -> SysResult<Arc<Kernel>> {
        let handles = HandleTable::new();

        let mut filesystems = FsManager::builder();
        filesystems.mount(PROCFS_LETTER, Arc::new(ProcFs::new(Arc::clone(&handles))));
        for (index, disk) in disks.into_iter().enumerate() {
            let letter = (FIRST_DISK_LETTER as u8 + index as u8) as char;
            match FatVolume::mount(disk) {
                Ok(volume) => {
                    log::info!("[Kernel::new] disk {index} mounted at {letter}:");
                    filesystems.mount(letter, volume);
                }
                Err(err) => {
                    log::error!("[Kernel::new] disk {index} not mounted: {err:?}");
                }
            }
        }
        let fs = Arc::new(filesystems.build());

        let console_reader = ConsoleReader::new(Arc::clone(&tty));
        let console = Console::new(tty, Arc::clone(&console_reader));
        let console_handle = handles.add(KernelObject::File(Arc::new(console)))?;

        Ok(Arc::new(Kernel {
            handles,
            events: EventSystem::new(),
            fs,
            console_reader,
            console_handle,
            programs: Mutex::new(HashMap::new()),
        }))
    }

    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }

    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    pub fn fs(&self) -> &Arc<FsManager> {
        &self.fs
    }

    /// A fresh reference to the shared console handle.
    pub fn console_handle(&self) -> HandleRef {
        self.console_handle.clone()
    }

    /// Register a user program under its symbol name. Later registrations
    /// of the same name win, mirroring symbol lookup in a module.
    pub fn register_program(&self, name: &str, entry: EntryFn) {
        self.programs.lock().insert(name.to_string(), entry);
    }

    pub fn find_program(&self, name: &str) -> Option<EntryFn> {
        self.programs.lock().get(name).copied()
    }

    /// Working directory handed to the first process: the first disk when
    /// one is mounted, the process filesystem otherwise.
    pub fn default_working_directory(&self) -> Path {
        let letter = if self.fs.is_mounted(FIRST_DISK_LETTER) {
            FIRST_DISK_LETTER
        } else {
            PROCFS_LETTER
        };
        Path::parse(&format!("{letter}:\\"))
    }

    /// Run `program` as the initial process on the calling thread and
    /// return its exit code. This is the bootstrap path; everything after
    /// it goes through `Clone`.
    pub fn spawn_root(self: &Arc<Self>, program: &str, cmd_line: &str) -> SysResult<i32> {
        let entry = self.find_program(program).ok_or(SysError::FileNotFound)?;

        let process = Process::create(
            self,
            program,
            cmd_line,
            self.default_working_directory(),
            entry,
            Some(self.console_handle()),
            Some(self.console_handle()),
            true,
        )?;

        let main_thread = process
            .as_process()
            .and_then(|p| p.main_thread())
            .ok_or(SysError::UnknownError)?;
        let code = main_thread
            .as_thread()
            .map(|t| t.exit_code())
            .ok_or(SysError::UnknownError)?;

        Ok(code)
    }

    /// Cooperative shutdown: raise the Terminate signal on every live
    /// thread and stop console input. Threads observe the signal at their
    /// next syscall.
    pub fn shutdown(&self) {
        log::info!("[Kernel::shutdown] raising Terminate on all threads");
        for handle in self
            .handles
            .filter(|_, object| object.kind() == HandleKind::Thread)
        {
            if let Some(thread) = handle.as_thread() {
                thread.raise_signal(Sig::TERMINATE);
            }
        }
        self.console_reader.close();
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.console_reader.close();
    }
}
