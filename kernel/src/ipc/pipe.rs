//! Bounded byte pipe with file-handle endpoints.
//!
//! Both ends share one ring and one condition variable. A full ring blocks
//! the writer while the reader is still there; an empty ring blocks the
//! reader while the writer is still there. Either end going away turns the
//! blocked peer around: the writer starts reporting 0-byte writes, the
//! reader drains what is left and then reports EOF.

use std::sync::Arc;

use config::ipc::PIPE_BUF_LEN;
use ring_buffer::RingBuffer;
use sync::{Condvar, Mutex};
use systype::{SysError, SysResult};

use crate::handle::{HandleRef, HandleTable, KernelObject};
use crate::vfs::{FileKind, FileObject};

struct PipeState {
    ring: RingBuffer,
    reader_open: bool,
    writer_open: bool,
}

struct PipeShared {
    state: Mutex<PipeState>,
    cv: Condvar,
}

pub struct Pipe;

impl Pipe {
    /// Create both endpoints and register them in the handle table.
    /// Returns `(read end, write end)`.
    pub fn create(table: &Arc<HandleTable>) -> SysResult<(HandleRef, HandleRef)> {
        let shared = Arc::new(PipeShared {
            state: Mutex::new(PipeState {
                ring: RingBuffer::with_capacity(PIPE_BUF_LEN),
                reader_open: true,
                writer_open: true,
            }),
            cv: Condvar::new(),
        });

        let read_end = table.add(KernelObject::File(Arc::new(PipeReadEnd {
            shared: Arc::clone(&shared),
        })))?;
        let write_end = table.add(KernelObject::File(Arc::new(PipeWriteEnd {
            shared,
        })))?;

        Ok((read_end, write_end))
    }
}

pub struct PipeReadEnd {
    shared: Arc<PipeShared>,
}

pub struct PipeWriteEnd {
    shared: Arc<PipeShared>,
}

impl Drop for PipeReadEnd {
    fn drop(&mut self) {
        // the last reference going away counts as a close
        FileObject::close(self);
    }
}

impl Drop for PipeWriteEnd {
    fn drop(&mut self) {
        FileObject::close(self);
    }
}

impl FileObject for PipeReadEnd {
    fn kind(&self) -> FileKind {
        FileKind::PipeReadEnd
    }

    fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.reader_open {
            state.reader_open = false;
            drop(state);
            // turn around a writer blocked on a full ring
            self.shared.cv.notify_all();
        }
    }

    fn read(&self, buf: &mut [u8]) -> SysResult<usize> {
        let mut state = self.shared.state.lock();

        if !state.reader_open {
            return Err(SysError::InvalidArgument);
        }

        while state.ring.is_empty() {
            if !state.writer_open {
                return Ok(0); // EOF
            }
            state = self.shared.cv.wait(state);
            if !state.reader_open {
                return Err(SysError::InvalidArgument);
            }
        }

        let read = state.ring.pop(buf);
        drop(state);
        self.shared.cv.notify_all();

        Ok(read)
    }

    fn write(&self, _buf: &[u8]) -> SysResult<usize> {
        Err(SysError::InvalidArgument)
    }
}

impl FileObject for PipeWriteEnd {
    fn kind(&self) -> FileKind {
        FileKind::PipeWriteEnd
    }

    fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.writer_open {
            state.writer_open = false;
            drop(state);
            // a blocked reader now sees EOF
            self.shared.cv.notify_all();
        }
    }

    fn read(&self, _buf: &mut [u8]) -> SysResult<usize> {
        Err(SysError::InvalidArgument)
    }

    /// Writes the whole buffer, sleeping whenever the ring is full. A
    /// reader that disappears mid-write makes the write report 0 bytes;
    /// the data already pushed has nobody left to observe it.
    fn write(&self, buf: &[u8]) -> SysResult<usize> {
        let mut state = self.shared.state.lock();

        if !state.writer_open {
            return Err(SysError::InvalidArgument);
        }
        if !state.reader_open {
            return Ok(0);
        }

        let mut written = 0;
        while written < buf.len() {
            written += state.ring.push(&buf[written..]);
            if written == buf.len() {
                break;
            }

            // ring full; hand the lock to the reader
            self.shared.cv.notify_all();
            state = self.shared.cv.wait(state);

            if !state.writer_open {
                return Err(SysError::InvalidArgument);
            }
            if !state.reader_open {
                return Ok(0);
            }
        }

        drop(state);
        self.shared.cv.notify_all();

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::handle::HandleTable;

    fn endpoints() -> (Arc<dyn FileObject>, Arc<dyn FileObject>) {
        let table = HandleTable::new();
        let (read_end, write_end) = Pipe::create(&table).unwrap();
        // keep the objects alive independently of the table records
        (read_end.as_file().unwrap(), write_end.as_file().unwrap())
    }

    #[test]
    fn bytes_flow_in_order() {
        let (read_end, write_end) = endpoints();

        assert_eq!(write_end.write(b"hello\n").unwrap(), 6);
        let mut buf = [0u8; 16];
        assert_eq!(read_end.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf[..6], b"hello\n");
    }

    #[test]
    fn reader_sees_eof_after_writer_closes() {
        let (read_end, write_end) = endpoints();

        write_end.write(b"tail").unwrap();
        write_end.close();

        let mut buf = [0u8; 8];
        assert_eq!(read_end.read(&mut buf).unwrap(), 4);
        assert_eq!(read_end.read(&mut buf).unwrap(), 0);
        assert_eq!(read_end.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn writer_reports_zero_on_closed_reader() {
        let (read_end, write_end) = endpoints();

        read_end.close();
        assert_eq!(write_end.write(b"lost").unwrap(), 0);
    }

    #[test]
    fn closed_end_rejects_its_own_operations() {
        let (read_end, write_end) = endpoints();

        read_end.close();
        let mut buf = [0u8; 4];
        assert_eq!(read_end.read(&mut buf), Err(SysError::InvalidArgument));

        write_end.close();
        assert_eq!(write_end.write(b"x"), Err(SysError::InvalidArgument));
    }

    #[test]
    fn wrong_direction_is_rejected() {
        let (read_end, write_end) = endpoints();
        let mut buf = [0u8; 4];
        assert_eq!(read_end.write(b"x"), Err(SysError::InvalidArgument));
        assert_eq!(write_end.read(&mut buf), Err(SysError::InvalidArgument));
    }

    #[test]
    fn large_transfer_crosses_the_ring_many_times() {
        let (read_end, write_end) = endpoints();
        let payload: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let expected = payload.clone();

        let writer = thread::spawn(move || {
            assert_eq!(write_end.write(&payload).unwrap(), 10_000);
            write_end.close();
        });

        let mut collected = Vec::new();
        let mut buf = [0u8; 333];
        loop {
            let n = read_end.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }

        writer.join().unwrap();
        assert_eq!(collected, expected);
    }

    #[test]
    fn blocked_writer_returns_zero_when_reader_leaves() {
        let (read_end, write_end) = endpoints();

        // more than the ring holds, so the writer must block
        let writer = thread::spawn(move || write_end.write(&[7u8; 4096]).unwrap());

        // let the writer fill the ring, then abandon it
        thread::sleep(std::time::Duration::from_millis(50));
        read_end.close();

        assert_eq!(writer.join().unwrap(), 0);
    }
}
