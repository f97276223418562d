//! Handle-based object registry.
//!
//! User code never sees kernel objects, only 16-bit handle ids resolved
//! through the process-wide [`HandleTable`]. Every resolved id is an
//! owning [`HandleRef`] whose drop gives the reference back.

mod table;

use std::sync::Arc;

pub use table::{HandleRef, HandleTable};

use crate::task::process::Process;
use crate::task::thread::Thread;
use crate::vfs::FileObject;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleKind {
    File,
    Thread,
    Process,
}

/// Object owned by one handle-table record.
#[derive(Clone)]
pub enum KernelObject {
    File(Arc<dyn FileObject>),
    Thread(Arc<Thread>),
    Process(Arc<Process>),
}

impl KernelObject {
    pub fn kind(&self) -> HandleKind {
        match self {
            KernelObject::File(_) => HandleKind::File,
            KernelObject::Thread(_) => HandleKind::Thread,
            KernelObject::Process(_) => HandleKind::Process,
        }
    }

    pub fn as_file(&self) -> Option<Arc<dyn FileObject>> {
        match self {
            KernelObject::File(file) => Some(Arc::clone(file)),
            _ => None,
        }
    }

    pub fn as_thread(&self) -> Option<Arc<Thread>> {
        match self {
            KernelObject::Thread(thread) => Some(Arc::clone(thread)),
            _ => None,
        }
    }

    pub fn as_process(&self) -> Option<Arc<Process>> {
        match self {
            KernelObject::Process(process) => Some(Arc::clone(process)),
            _ => None,
        }
    }
}
