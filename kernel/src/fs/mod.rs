//! Filesystems and the dispatcher routing paths to them.

pub mod fat;
pub mod path;
pub mod procfs;

use std::sync::Arc;

use hashbrown::HashMap;
use systype::{DirEntry, FileInfo, SysError, SysResult};

use self::path::Path;

/// Operations every mounted filesystem implements. Paths arrive absolute;
/// only their components matter to the filesystem, the letter picked the
/// filesystem in the first place.
pub trait FileSystem: Send + Sync {
    fn query(&self, path: &Path) -> SysResult<FileInfo>;

    fn read(&self, path: &Path, buf: &mut [u8], offset: u64) -> SysResult<usize>;

    fn read_dir(&self, path: &Path) -> SysResult<Vec<DirEntry>>;

    fn write(&self, path: &Path, buf: &[u8], offset: u64) -> SysResult<usize>;

    fn create(&self, path: &Path, info: FileInfo) -> SysResult<()>;

    fn resize(&self, path: &Path, size: u64) -> SysResult<()>;

    fn remove(&self, path: &Path) -> SysResult<()>;
}

/// Mount table, keyed by disk letter. Built once during kernel
/// construction and immutable afterwards, so lookups take no lock.
pub struct FsManager {
    filesystems: HashMap<char, Arc<dyn FileSystem>>,
}

pub struct FsManagerBuilder {
    filesystems: HashMap<char, Arc<dyn FileSystem>>,
}

impl FsManagerBuilder {
    pub fn mount(&mut self, letter: char, filesystem: Arc<dyn FileSystem>) {
        self.filesystems.insert(letter, filesystem);
    }

    pub fn build(self) -> FsManager {
        FsManager {
            filesystems: self.filesystems,
        }
    }
}

impl FsManager {
    pub fn builder() -> FsManagerBuilder {
        FsManagerBuilder {
            filesystems: HashMap::new(),
        }
    }

    pub fn is_mounted(&self, letter: char) -> bool {
        self.filesystems.contains_key(&letter)
    }

    fn resolve(&self, path: &Path) -> SysResult<&Arc<dyn FileSystem>> {
        let letter = path.disk_letter().ok_or(SysError::FileNotFound)?;
        self.filesystems
            .get(&letter)
            .ok_or(SysError::FileNotFound)
    }

    pub fn query(&self, path: &Path) -> SysResult<FileInfo> {
        self.resolve(path)?.query(path)
    }

    pub fn read(&self, path: &Path, buf: &mut [u8], offset: u64) -> SysResult<usize> {
        self.resolve(path)?.read(path, buf, offset)
    }

    pub fn read_dir(&self, path: &Path) -> SysResult<Vec<DirEntry>> {
        self.resolve(path)?.read_dir(path)
    }

    pub fn write(&self, path: &Path, buf: &[u8], offset: u64) -> SysResult<usize> {
        self.resolve(path)?.write(path, buf, offset)
    }

    pub fn create(&self, path: &Path, info: FileInfo) -> SysResult<()> {
        self.resolve(path)?.create(path, info)
    }

    pub fn resize(&self, path: &Path, size: u64) -> SysResult<()> {
        self.resolve(path)?.resize(path, size)
    }

    pub fn remove(&self, path: &Path) -> SysResult<()> {
        self.resolve(path)?.remove(path)
    }
}
