//! Read-only process filesystem.
//!
//! Synthesised on every access from the live handle table: the root lists
//! one directory per process plus `self`, each process directory holds the
//! four attribute files. Nothing is stored; writes of any kind are
//! refused.

use std::sync::Arc;

use systype::{DirEntry, FileAttributes, FileInfo, HandleId, SysError, SysResult};

use super::path::Path;
use super::FileSystem;
use crate::handle::{HandleKind, HandleTable};
use crate::task;
use crate::task::process::Process;

const PROCESS_FILE_NAMES: [&str; 4] = ["args", "cwd", "name", "threads"];

pub struct ProcFs {
    handles: Arc<HandleTable>,
}

fn parse_handle_id(text: &str) -> HandleId {
    text.parse::<HandleId>().unwrap_or(0)
}

fn attribute_value(process: &Process, attribute: &str) -> Option<String> {
    match attribute {
        "args" => Some(process.cmd_line().to_string()),
        "cwd" => Some(process.working_directory().to_string()),
        "name" => Some(process.name().to_string()),
        "threads" => Some(process.thread_count().to_string()),
        _ => None,
    }
}

impl ProcFs {
    pub fn new(handles: Arc<HandleTable>) -> Self {
        Self { handles }
    }

    /// Resolve the first path component to a process: a decimal handle id
    /// or the literal `self`.
    fn resolve_process(&self, component: &str) -> SysResult<Arc<Process>> {
        if component == "self" {
            return task::current_process().ok_or(SysError::FileNotFound);
        }

        self.handles
            .get_of_kind(parse_handle_id(component), HandleKind::Process)
            .and_then(|handle| handle.as_process())
            .ok_or(SysError::FileNotFound)
    }

    fn live_process_ids(&self) -> Vec<HandleId> {
        let mut ids: Vec<HandleId> = self
            .handles
            .filter(|_, object| object.kind() == HandleKind::Process)
            .iter()
            .map(|handle| handle.id())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl FileSystem for ProcFs {
    fn query(&self, path: &Path) -> SysResult<FileInfo> {
        let directory = FileAttributes::READ_ONLY | FileAttributes::DIRECTORY;

        match path.components() {
            [] => Ok(FileInfo {
                attributes: directory,
                size: 0,
            }),
            [process] => {
                self.resolve_process(process)?;
                Ok(FileInfo {
                    attributes: directory,
                    size: 0,
                })
            }
            [process, attribute] => {
                let process = self.resolve_process(process)?;
                let value =
                    attribute_value(&process, attribute).ok_or(SysError::FileNotFound)?;
                Ok(FileInfo {
                    attributes: FileAttributes::READ_ONLY,
                    size: value.len() as u64,
                })
            }
            _ => Err(SysError::FileNotFound),
        }
    }

    fn read(&self, path: &Path, buf: &mut [u8], offset: u64) -> SysResult<usize> {
        let [process, attribute] = path.components() else {
            return Err(SysError::FileNotFound);
        };

        let process = self.resolve_process(process)?;
        let value = attribute_value(&process, attribute).ok_or(SysError::FileNotFound)?;
        let value = value.as_bytes();

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        if offset > value.len() {
            return Ok(0);
        }

        let mut length = (value.len() - offset).min(buf.len());
        buf[..length].copy_from_slice(&value[offset..offset + length]);

        // values come with a trailing newline when there is room for it
        if length < buf.len() {
            buf[length] = b'\n';
            length += 1;
        }

        Ok(length)
    }

    fn read_dir(&self, path: &Path) -> SysResult<Vec<DirEntry>> {
        let directory = FileAttributes::READ_ONLY | FileAttributes::DIRECTORY;

        match path.components() {
            [] => {
                let mut entries: Vec<DirEntry> = self
                    .live_process_ids()
                    .iter()
                    .map(|id| DirEntry::new(directory, &id.to_string()))
                    .collect();
                entries.push(DirEntry::new(directory, "self"));
                Ok(entries)
            }
            [process] => {
                self.resolve_process(process)?;
                Ok(PROCESS_FILE_NAMES
                    .iter()
                    .map(|name| DirEntry::new(FileAttributes::READ_ONLY, name))
                    .collect())
            }
            _ => Err(SysError::FileNotFound),
        }
    }

    fn write(&self, _path: &Path, _buf: &[u8], _offset: u64) -> SysResult<usize> {
        Err(SysError::PermissionDenied)
    }

    fn create(&self, _path: &Path, _info: FileInfo) -> SysResult<()> {
        Err(SysError::PermissionDenied)
    }

    fn resize(&self, _path: &Path, _size: u64) -> SysResult<()> {
        Err(SysError::PermissionDenied)
    }

    fn remove(&self, _path: &Path) -> SysResult<()> {
        Err(SysError::PermissionDenied)
    }
}
