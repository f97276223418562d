use std::sync::Arc;

use sync::Mutex;
use systype::{
    DirEntry, FileInfo, SeekBase, SeekCommand, SysError, SysResult,
};

use super::{FileKind, FileObject};
use crate::fs::path::Path;
use crate::fs::FsManager;

struct DiskFileInner {
    pos: u64,
    info: FileInfo,
    open: bool,
}

/// Handle to a file or directory living on a mounted filesystem. The same
/// type serves both; the attribute bits decide which, and a directory
/// handle reads packed [`DirEntry`] records instead of bytes.
pub struct DiskFile {
    fs: Arc<FsManager>,
    path: Path,
    inner: Mutex<DiskFileInner>,
}

impl DiskFile {
    pub fn new(fs: Arc<FsManager>, path: Path, info: FileInfo) -> Self {
        Self {
            fs,
            path,
            inner: Mutex::new(DiskFileInner {
                pos: 0,
                info,
                open: true,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> FileInfo {
        self.inner.lock().info
    }

    fn is_directory(&self) -> bool {
        // attributes never change over the handle's lifetime
        self.inner.lock().info.is_directory()
    }

    fn read_dir_entries(&self, inner: &mut DiskFileInner, buf: &mut [u8]) -> SysResult<usize> {
        let entries = self.fs.read_dir(&self.path)?;

        let room = buf.len() / DirEntry::WIRE_SIZE;
        let start = usize::try_from(inner.pos).unwrap_or(usize::MAX);
        let mut written = 0;
        for entry in entries.iter().skip(start).take(room) {
            entry.write_to(&mut buf[written * DirEntry::WIRE_SIZE..(written + 1) * DirEntry::WIRE_SIZE]);
            written += 1;
        }

        inner.pos += written as u64;
        Ok(written * DirEntry::WIRE_SIZE)
    }

    /// Seek family. `GetPosition` only reports, the others move the
    /// position; `SetSize` additionally resizes the file on disk.
    pub fn seek(
        &self,
        command: SeekCommand,
        base: SeekBase,
        offset: i64,
    ) -> SysResult<u64> {
        let mut inner = self.inner.lock();
        if inner.info.is_read_only() || inner.info.is_directory() || !inner.open {
            return Err(SysError::InvalidArgument);
        }

        // the file may have changed under us through another handle
        match self.fs.query(&self.path) {
            Ok(current) => {
                if current.is_directory() != inner.info.is_directory() {
                    inner.open = false;
                    return Err(SysError::InvalidArgument);
                }
                inner.info.size = current.size;
            }
            Err(err) => {
                inner.open = false;
                return Err(err);
            }
        }

        match command {
            SeekCommand::GetPosition => {
                if base != SeekBase::Beginning {
                    return Err(SysError::InvalidArgument);
                }
                Ok(inner.pos)
            }
            SeekCommand::SetPosition | SeekCommand::SetSize => {
                let anchor = match base {
                    SeekBase::Beginning => 0,
                    SeekBase::Current => inner.pos,
                    SeekBase::End => inner.info.size,
                };
                let new_pos = if offset < 0 {
                    anchor.saturating_sub(offset.unsigned_abs())
                } else {
                    anchor.saturating_add(offset as u64)
                };

                if command == SeekCommand::SetSize {
                    self.fs.resize(&self.path, new_pos)?;
                    inner.info.size = new_pos;
                }
                inner.pos = new_pos;
                Ok(new_pos)
            }
        }
    }
}

impl FileObject for DiskFile {
    fn kind(&self) -> FileKind {
        if self.is_directory() {
            FileKind::Directory
        } else {
            FileKind::RegularFile
        }
    }

    fn close(&self) {
        self.inner.lock().open = false;
    }

    fn read(&self, buf: &mut [u8]) -> SysResult<usize> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(SysError::InvalidArgument);
        }

        if inner.info.is_directory() {
            self.read_dir_entries(&mut inner, buf)
        } else {
            let read = self.fs.read(&self.path, buf, inner.pos)?;
            inner.pos += read as u64;
            Ok(read)
        }
    }

    fn write(&self, buf: &[u8]) -> SysResult<usize> {
        if self.info().is_read_only() {
            return Err(SysError::PermissionDenied);
        }

        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(SysError::InvalidArgument);
        }

        let written = self.fs.write(&self.path, buf, inner.pos)?;
        inner.pos += written as u64;
        if inner.pos > inner.info.size {
            inner.info.size = inner.pos;
        }
        Ok(written)
    }
}
