use std::sync::Arc;

use config::handle::MAX_HANDLE_COUNT;
use hashbrown::HashMap;
use sync::Mutex;
use systype::{HandleId, SysError, SysResult};

use super::{HandleKind, KernelObject};

struct HandleEntry {
    object: KernelObject,
    ref_count: u32,
}

struct TableInner {
    entries: HashMap<HandleId, HandleEntry>,
    last_id: HandleId,
}

/// Registry of all live kernel objects, keyed by handle id.
///
/// Records are reference counted by hand: every [`HandleRef`] in existence
/// counts as one, and the record is erased the moment the count reaches
/// zero. Ids come from a wrapping cursor that skips zero and ids still in
/// use.
pub struct HandleTable {
    inner: Mutex<TableInner>,
}

impl HandleTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(TableInner {
                entries: HashMap::new(),
                last_id: 0,
            }),
        })
    }

    /// Register an object and return the first reference to it.
    pub fn add(self: &Arc<Self>, object: KernelObject) -> SysResult<HandleRef> {
        let mut inner = self.inner.lock();

        if inner.entries.len() >= MAX_HANDLE_COUNT {
            log::error!("[HandleTable::add] table full");
            return Err(SysError::OutOfMemory);
        }

        loop {
            inner.last_id = inner.last_id.wrapping_add(1);
            if inner.last_id != 0 && !inner.entries.contains_key(&inner.last_id) {
                break;
            }
        }
        let id = inner.last_id;

        inner.entries.insert(
            id,
            HandleEntry {
                object: object.clone(),
                ref_count: 1,
            },
        );
        log::trace!("[HandleTable::add] {:?} -> {}", object.kind(), id);

        Ok(HandleRef {
            table: Arc::clone(self),
            id,
            object,
        })
    }

    /// Acquire a reference to a live record.
    pub fn get(self: &Arc<Self>, id: HandleId) -> Option<HandleRef> {
        if id == 0 {
            return None;
        }
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(&id)?;
        entry.ref_count += 1;
        let object = entry.object.clone();
        Some(HandleRef {
            table: Arc::clone(self),
            id,
            object,
        })
    }

    pub fn get_of_kind(self: &Arc<Self>, id: HandleId, kind: HandleKind) -> Option<HandleRef> {
        if id == 0 {
            return None;
        }
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(&id)?;
        if entry.object.kind() != kind {
            return None;
        }
        entry.ref_count += 1;
        let object = entry.object.clone();
        Some(HandleRef {
            table: Arc::clone(self),
            id,
            object,
        })
    }

    pub fn has(&self, id: HandleId) -> bool {
        id != 0 && self.inner.lock().entries.contains_key(&id)
    }

    pub fn has_of_kind(&self, id: HandleId, kind: HandleKind) -> bool {
        if id == 0 {
            return false;
        }
        self.inner
            .lock()
            .entries
            .get(&id)
            .is_some_and(|entry| entry.object.kind() == kind)
    }

    /// References to every record matching the predicate, acquired
    /// atomically under the table lock.
    pub fn filter<P>(self: &Arc<Self>, predicate: P) -> Vec<HandleRef>
    where
        P: Fn(HandleId, &KernelObject) -> bool,
    {
        let mut inner = self.inner.lock();
        let matching: Vec<HandleId> = inner
            .entries
            .iter()
            .filter(|(id, entry)| predicate(**id, &entry.object))
            .map(|(id, _)| *id)
            .collect();

        matching
            .into_iter()
            .map(|id| {
                let entry = inner.entries.get_mut(&id).unwrap();
                entry.ref_count += 1;
                HandleRef {
                    table: Arc::clone(self),
                    id,
                    object: entry.object.clone(),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, id: HandleId) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.ref_count += 1;
        }
    }

    fn release(&self, id: HandleId) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.ref_count -= 1;
            if entry.ref_count == 0 {
                inner.entries.remove(&id);
                log::trace!("[HandleTable::release] {id} erased");
            }
        }
    }
}

/// Owning reference to one handle-table record.
///
/// Cloning acquires another reference, dropping gives it back; the record
/// disappears with the last reference. The object is cached inside so no
/// lock is touched after the lookup.
pub struct HandleRef {
    table: Arc<HandleTable>,
    id: HandleId,
    object: KernelObject,
}

impl HandleRef {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn object(&self) -> &KernelObject {
        &self.object
    }

    pub fn kind(&self) -> HandleKind {
        self.object.kind()
    }

    pub fn as_file(&self) -> Option<Arc<dyn crate::vfs::FileObject>> {
        self.object.as_file()
    }

    pub fn as_thread(&self) -> Option<Arc<crate::task::thread::Thread>> {
        self.object.as_thread()
    }

    pub fn as_process(&self) -> Option<Arc<crate::task::process::Process>> {
        self.object.as_process()
    }
}

impl Clone for HandleRef {
    fn clone(&self) -> Self {
        self.table.acquire(self.id);
        Self {
            table: Arc::clone(&self.table),
            id: self.id,
            object: self.object.clone(),
        }
    }
}

impl Drop for HandleRef {
    fn drop(&mut self) {
        self.table.release(self.id);
    }
}

impl std::fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::vfs::{FileKind, FileObject};
    use systype::SysResult;

    struct NullFile;

    impl FileObject for NullFile {
        fn kind(&self) -> FileKind {
            FileKind::RegularFile
        }

        fn close(&self) {}

        fn read(&self, _buf: &mut [u8]) -> SysResult<usize> {
            Ok(0)
        }

        fn write(&self, buf: &[u8]) -> SysResult<usize> {
            Ok(buf.len())
        }
    }

    fn file_object() -> KernelObject {
        KernelObject::File(Arc::new(NullFile))
    }

    #[test]
    fn ids_are_nonzero_and_distinct() {
        let table = HandleTable::new();
        let a = table.add(file_object()).unwrap();
        let b = table.add(file_object()).unwrap();

        assert_ne!(a.id(), 0);
        assert_ne!(b.id(), 0);
        assert_ne!(a.id(), b.id());
        assert!(table.has(a.id()));
        assert!(table.has_of_kind(a.id(), HandleKind::File));
        assert!(!table.has_of_kind(a.id(), HandleKind::Process));
    }

    #[test]
    fn record_lives_exactly_as_long_as_its_references() {
        let table = HandleTable::new();
        let first = table.add(file_object()).unwrap();
        let id = first.id();

        let second = first.clone();
        let third = table.get(id).unwrap();

        drop(first);
        assert!(table.has(id));
        drop(third);
        assert!(table.has(id));
        drop(second);
        assert!(!table.has(id));
        assert!(table.get(id).is_none());
    }

    #[test]
    fn zero_never_resolves() {
        let table = HandleTable::new();
        assert!(table.get(0).is_none());
        assert!(!table.has(0));
    }

    #[test]
    fn filter_acquires_matching_records() {
        let table = HandleTable::new();
        let kept = table.add(file_object()).unwrap();
        let ids: Vec<_> = table
            .filter(|_, object| object.kind() == HandleKind::File)
            .into_iter()
            .map(|h| h.id())
            .collect();
        assert_eq!(ids, vec![kept.id()]);
    }

    #[test]
    fn id_cursor_skips_live_records() {
        let table = HandleTable::new();
        let keep: Vec<_> = (0..5).map(|_| table.add(file_object()).unwrap()).collect();
        // force the cursor back around the kept ids
        {
            let mut inner = table.inner.lock();
            inner.last_id = 0;
        }
        let fresh = table.add(file_object()).unwrap();
        assert!(keep.iter().all(|h| h.id() != fresh.id()));
    }
}
