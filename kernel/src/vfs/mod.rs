//! File-handle objects: anything a user-held file handle can point at.

mod file;

use downcast_rs::{impl_downcast, DowncastSync};
pub use file::DiskFile;
use systype::SysResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    RegularFile,
    Directory,
    Console,
    PipeReadEnd,
    PipeWriteEnd,
}

/// Operations common to every file handle. Position, blocking and
/// permission behavior live in the implementations; the syscall layer
/// downcasts when it needs more than this surface (seek on disk files).
pub trait FileObject: Send + Sync + DowncastSync {
    fn kind(&self) -> FileKind;

    /// Mark the handle closed. Closing is idempotent and does not release
    /// the handle-table record; that happens when the last reference is
    /// dropped.
    fn close(&self);

    fn read(&self, buf: &mut [u8]) -> SysResult<usize>;

    fn write(&self, buf: &[u8]) -> SysResult<usize>;
}

impl_downcast!(sync FileObject);
