//! The console: a synchronous writer plus a single line-disciplined
//! reader shared by every process.
//!
//! One worker thread owns the keyboard. It sleeps until somebody wants a
//! line, cooks the input (echo, backspace, CR/LF, control characters) and
//! queues finished lines for the readers. The worker starts lazily with
//! the first read and dies with the kernel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use device_core::CharDevice;
use sync::{Condvar, Mutex};
use systype::SysResult;

use crate::vfs::{FileKind, FileObject};

const ETX: u8 = 3; // Ctrl+C
const EOT: u8 = 4; // Ctrl+D
const SUB: u8 = 26; // Ctrl+Z

struct ReaderState {
    queue: VecDeque<Vec<u8>>,
    worker_running: bool,
}

pub struct ConsoleReader {
    device: Arc<dyn CharDevice>,
    open: AtomicBool,
    reader_count: AtomicU32,
    state: Mutex<ReaderState>,
    reader_cv: Condvar,
    worker_cv: Condvar,
}

impl ConsoleReader {
    pub fn new(device: Arc<dyn CharDevice>) -> Arc<Self> {
        Arc::new(Self {
            device,
            open: AtomicBool::new(true),
            reader_count: AtomicU32::new(0),
            state: Mutex::new(ReaderState {
                queue: VecDeque::new(),
                worker_running: false,
            }),
            reader_cv: Condvar::new(),
            worker_cv: Condvar::new(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Hand out at most one queued line. A line longer than `buf` is
    /// truncated and the tail stays at the head of the queue for the next
    /// read. Returns 0 once the input is closed and drained.
    pub fn read_line(self: &Arc<Self>, buf: &mut [u8]) -> usize {
        let mut state = self.state.lock();

        if state.queue.is_empty() && self.is_open() {
            if !state.worker_running {
                state.worker_running = true;
                let reader = Arc::clone(self);
                if let Err(err) = std::thread::Builder::new()
                    .name("console-reader".into())
                    .spawn(move || reader.worker_loop())
                {
                    log::error!("[ConsoleReader::read_line] no worker thread: {err}");
                    state.worker_running = false;
                    self.open.store(false, Ordering::Relaxed);
                    return 0;
                }
            }

            self.reader_count.fetch_add(1, Ordering::Relaxed);
            self.worker_cv.notify_one();
            while state.queue.is_empty() && self.is_open() {
                state = self.reader_cv.wait(state);
            }
            self.reader_count.fetch_sub(1, Ordering::Relaxed);
        }

        let mut length = 0;
        if let Some(line) = state.queue.front_mut() {
            length = line.len().min(buf.len());
            buf[..length].copy_from_slice(&line[..length]);
            if length < line.len() {
                line.drain(..length);
            } else {
                state.queue.pop_front();
            }
        }

        length
    }

    pub fn close(&self) {
        if self.open.swap(false, Ordering::Relaxed) {
            self.reader_cv.notify_all();
            self.worker_cv.notify_all();
        }
    }

    fn worker_loop(self: Arc<Self>) {
        log::debug!("[ConsoleReader::worker_loop] started");
        loop {
            if !self.wait_for_reader() {
                break;
            }
            match self.cook_line() {
                Some(line) => self.push_line(line),
                None => {
                    // keyboard reported end of input
                    self.close();
                    break;
                }
            }
        }
        log::debug!("[ConsoleReader::worker_loop] stopped");
    }

    fn wait_for_reader(&self) -> bool {
        let mut state = self.state.lock();
        while self.is_open() {
            if self.reader_count.load(Ordering::Relaxed) > 0 {
                return true;
            }
            state = self.worker_cv.wait(state);
        }
        false
    }

    /// Read one line from the keyboard, echoing as the user types.
    fn cook_line(&self) -> Option<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let ch = self.device.read_char()?;

            match ch {
                0 => break,
                b'\x08' => {
                    if line.pop().is_some() {
                        self.device.write_char(b'\x08');
                    }
                }
                b'\n' => {}
                b'\r' => {
                    line.push(b'\n');
                    self.device.write_char(b'\n');
                    break;
                }
                ETX | EOT | SUB | b'\t' => {
                    line.push(ch);
                    break;
                }
                _ => {
                    line.push(ch);
                    self.device.write_char(ch);
                }
            }
        }

        Some(line)
    }

    fn push_line(&self, line: Vec<u8>) {
        let mut state = self.state.lock();
        state.queue.push_back(line);
        drop(state);
        self.reader_cv.notify_one();
    }
}

/// The console file handle. Reads go through the shared [`ConsoleReader`];
/// writes grab the writer lock and go straight to the display device.
pub struct Console {
    device: Arc<dyn CharDevice>,
    reader: Arc<ConsoleReader>,
    writer: Mutex<()>,
}

impl Console {
    pub fn new(device: Arc<dyn CharDevice>, reader: Arc<ConsoleReader>) -> Self {
        Self {
            device,
            reader,
            writer: Mutex::new(()),
        }
    }
}

impl FileObject for Console {
    fn kind(&self) -> FileKind {
        FileKind::Console
    }

    fn close(&self) {
        // the console is shared between processes; input only stops with
        // the kernel
    }

    fn read(&self, buf: &mut [u8]) -> SysResult<usize> {
        Ok(self.reader.read_line(buf))
    }

    fn write(&self, buf: &[u8]) -> SysResult<usize> {
        let _writer = self.writer.lock();
        self.device.write_str(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use sync::Mutex as SyncMutex;

    /// Scripted keyboard plus a captured display.
    struct ScriptedTty {
        input: SyncMutex<VecDeque<u8>>,
        output: SyncMutex<Vec<u8>>,
    }

    impl ScriptedTty {
        fn new(script: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                input: SyncMutex::new(script.iter().copied().collect()),
                output: SyncMutex::new(Vec::new()),
            })
        }

        fn echoed(&self) -> Vec<u8> {
            self.output.lock().clone()
        }
    }

    impl CharDevice for ScriptedTty {
        fn read_char(&self) -> Option<u8> {
            self.input.lock().pop_front()
        }

        fn peek_char(&self) -> Option<u8> {
            self.input.lock().front().copied()
        }

        fn write_str(&self, s: &[u8]) {
            self.output.lock().extend_from_slice(s);
        }

        fn write_char(&self, ch: u8) {
            self.output.lock().push(ch);
        }
    }

    #[test]
    fn lines_are_cooked_and_queued() {
        let tty = ScriptedTty::new(b"ab\x08c\rsecond\r");
        let reader = ConsoleReader::new(tty.clone());

        let mut buf = [0u8; 16];
        let n = reader.read_line(&mut buf);
        assert_eq!(&buf[..n], b"ac\n");

        let n = reader.read_line(&mut buf);
        assert_eq!(&buf[..n], b"second\n");

        // echo: a, b, BS, c, newline, then the second line
        assert_eq!(tty.echoed(), b"ab\x08c\nsecond\n");
    }

    #[test]
    fn truncated_line_keeps_its_tail() {
        let tty = ScriptedTty::new(b"abcdef\r");
        let reader = ConsoleReader::new(tty);

        let mut small = [0u8; 4];
        let n = reader.read_line(&mut small);
        assert_eq!(&small[..n], b"abcd");

        let mut rest = [0u8; 8];
        let n = reader.read_line(&mut rest);
        assert_eq!(&rest[..n], b"ef\n");
    }

    #[test]
    fn control_characters_terminate_the_line_as_is() {
        let tty = ScriptedTty::new(b"x\tno");
        let reader = ConsoleReader::new(tty);

        let mut buf = [0u8; 8];
        let n = reader.read_line(&mut buf);
        assert_eq!(&buf[..n], b"x\t");
    }

    #[test]
    fn end_of_input_reads_zero() {
        let tty = ScriptedTty::new(b"");
        let reader = ConsoleReader::new(tty);

        let mut buf = [0u8; 8];
        assert_eq!(reader.read_line(&mut buf), 0);
        assert!(!reader.is_open());
        assert_eq!(reader.read_line(&mut buf), 0);
    }
}
