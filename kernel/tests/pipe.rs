//! Pipe behavior through the syscall surface.

mod common;

use std::sync::atomic::{AtomicU16, Ordering};

use systype::{Registers, SysError};
use user::rtl;

static WRITE_END: AtomicU16 = AtomicU16::new(0);
static READ_END: AtomicU16 = AtomicU16::new(0);

fn pipe_copy_main(_context: &Registers) -> i32 {
    let (write_end, read_end) = rtl::create_pipe().expect("create pipe");
    WRITE_END.store(write_end, Ordering::SeqCst);
    READ_END.store(read_end, Ordering::SeqCst);

    assert_eq!(rtl::write(write_end, b"hello\n").unwrap(), 6);
    rtl::close(write_end).unwrap();

    let mut buf = [0u8; 32];
    assert_eq!(rtl::read(read_end, &mut buf).unwrap(), 6);
    assert_eq!(&buf[..6], b"hello\n");

    // end of file: success with zero bytes, repeatably
    assert_eq!(rtl::read(read_end, &mut buf).unwrap(), 0);
    assert_eq!(rtl::read(read_end, &mut buf).unwrap(), 0);

    rtl::close(read_end).unwrap();

    // a closed handle is gone from the process's set
    assert_eq!(rtl::read(read_end, &mut buf), Err(SysError::InvalidArgument));
    0
}

#[test]
fn pipe_copy_reaches_eof() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("pipe_copy", pipe_copy_main);
    assert_eq!(kernel.spawn_root("pipe_copy", "").unwrap(), 0);

    // both endpoint records died with their last references
    assert!(!kernel.handles().has(WRITE_END.load(Ordering::SeqCst)));
    assert!(!kernel.handles().has(READ_END.load(Ordering::SeqCst)));
}

fn child_writer(context: &Registers) -> i32 {
    let out = rtl::std_out(context);
    for chunk in 0..100u8 {
        let payload = [chunk; 100];
        assert_eq!(rtl::write(out, &payload).unwrap(), 100);
    }
    rtl::close(out).unwrap();
    0
}

fn pipe_stream_main(_context: &Registers) -> i32 {
    let (write_end, read_end) = rtl::create_pipe().unwrap();

    // the child inherits the write end as its stdout and closes it when
    // done; closing it here too early would cut the child off, since a
    // handle close closes the object for every holder
    let child = rtl::create_process("child_writer", "", 0, write_end).unwrap();

    let mut collected = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = rtl::read(read_end, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }

    assert_eq!(collected.len(), 10_000);
    for (index, &byte) in collected.iter().enumerate() {
        assert_eq!(byte as usize, index / 100, "byte {index} out of order");
    }

    rtl::wait_for(&[child]).unwrap();
    rtl::close(child).unwrap();
    rtl::close(write_end).unwrap();
    rtl::close(read_end).unwrap();
    0
}

#[test]
fn pipe_streams_across_processes_in_order() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("pipe_stream", pipe_stream_main);
    kernel.register_program("child_writer", child_writer);
    assert_eq!(kernel.spawn_root("pipe_stream", "").unwrap(), 0);
}
