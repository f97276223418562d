//! The file-system syscall family over a FAT disk, plus entry rules of
//! the dispatcher itself.

mod common;

use systype::{
    FileAttributes, OpenFlags, Registers, SeekBase, SeekCommand, SysError,
};
use user::rtl;

fn open_semantics_main(_context: &Registers) -> i32 {
    // OPEN_ALWAYS refuses to create
    assert_eq!(
        rtl::open("A:\\missing", OpenFlags::OPEN_ALWAYS, FileAttributes::empty()),
        Err(SysError::FileNotFound)
    );

    // without the flag the file springs into existence
    let file = rtl::open("A:\\fresh.txt", OpenFlags::empty(), FileAttributes::empty()).unwrap();
    assert_eq!(rtl::write(file, b"abcdef").unwrap(), 6);
    rtl::close(file).unwrap();

    // reopening an existing file as a file works, as a directory does not
    let file = rtl::open("A:\\fresh.txt", OpenFlags::OPEN_ALWAYS, FileAttributes::empty()).unwrap();
    rtl::close(file).unwrap();
    assert_eq!(
        rtl::open("A:\\fresh.txt", OpenFlags::OPEN_ALWAYS, FileAttributes::DIRECTORY),
        Err(SysError::InvalidArgument)
    );
    0
}

#[test]
fn open_create_semantics() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("open_semantics", open_semantics_main);
    assert_eq!(kernel.spawn_root("open_semantics", "").unwrap(), 0);
}

fn read_only_main(_context: &Registers) -> i32 {
    // a newly created read-only file is writable through this handle
    let file = rtl::open("A:\\locked", OpenFlags::empty(), FileAttributes::READ_ONLY).unwrap();
    assert_eq!(rtl::write(file, b"sealed").unwrap(), 6);
    rtl::close(file).unwrap();

    // opening it for writing afterwards is denied
    assert_eq!(
        rtl::open("A:\\locked", OpenFlags::OPEN_ALWAYS, FileAttributes::empty()),
        Err(SysError::PermissionDenied)
    );

    // opening read-only works, writing through it does not
    let file = rtl::open("A:\\locked", OpenFlags::OPEN_ALWAYS, FileAttributes::READ_ONLY).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(rtl::read(file, &mut buf).unwrap(), 6);
    assert_eq!(&buf[..6], b"sealed");
    assert_eq!(rtl::write(file, b"nope"), Err(SysError::PermissionDenied));
    rtl::close(file).unwrap();
    0
}

#[test]
fn read_only_files_are_enforced() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("read_only", read_only_main);
    assert_eq!(kernel.spawn_root("read_only", "").unwrap(), 0);
}

fn seek_main(_context: &Registers) -> i32 {
    let file = rtl::open("A:\\seek.bin", OpenFlags::empty(), FileAttributes::empty()).unwrap();
    rtl::write(file, b"0123456789").unwrap();

    // the position advanced with the write
    assert_eq!(
        rtl::seek(file, SeekCommand::GetPosition, SeekBase::Beginning, 0).unwrap(),
        10
    );

    rtl::seek(file, SeekCommand::SetPosition, SeekBase::Beginning, 2).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(rtl::read(file, &mut buf).unwrap(), 4);
    assert_eq!(&buf, b"2345");

    rtl::seek(file, SeekCommand::SetPosition, SeekBase::End, -3).unwrap();
    assert_eq!(rtl::read(file, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"789");

    // a negative result clamps to the start
    assert_eq!(
        rtl::seek(file, SeekCommand::SetPosition, SeekBase::Beginning, -5).unwrap(),
        0
    );

    // truncating through the handle
    rtl::seek(file, SeekCommand::SetSize, SeekBase::Beginning, 4).unwrap();
    rtl::seek(file, SeekCommand::SetPosition, SeekBase::Beginning, 0).unwrap();
    let mut rest = [0u8; 16];
    assert_eq!(rtl::read(file, &mut rest).unwrap(), 4);
    assert_eq!(&rest[..4], b"0123");

    rtl::close(file).unwrap();

    // directories do not seek
    let dir = rtl::open(
        "A:\\",
        OpenFlags::OPEN_ALWAYS,
        FileAttributes::DIRECTORY | FileAttributes::READ_ONLY,
    )
    .unwrap();
    assert_eq!(
        rtl::seek(dir, SeekCommand::GetPosition, SeekBase::Beginning, 0),
        Err(SysError::InvalidArgument)
    );
    rtl::close(dir).unwrap();
    0
}

#[test]
fn seek_moves_resizes_and_reports() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("seek_main", seek_main);
    assert_eq!(kernel.spawn_root("seek_main", "").unwrap(), 0);
}

fn cwd_main(_context: &Registers) -> i32 {
    assert_eq!(rtl::get_working_dir().unwrap(), "A:\\");

    rtl::open("A:\\dir", OpenFlags::empty(), FileAttributes::DIRECTORY)
        .map(|h| rtl::close(h).unwrap())
        .unwrap();
    rtl::set_working_dir("A:\\dir").unwrap();
    assert_eq!(rtl::get_working_dir().unwrap(), "A:\\dir");

    // relative paths resolve against the working directory
    let file = rtl::open("note", OpenFlags::empty(), FileAttributes::empty()).unwrap();
    rtl::write(file, b"rel").unwrap();
    rtl::close(file).unwrap();

    let file = rtl::open(
        "A:\\dir\\note",
        OpenFlags::OPEN_ALWAYS,
        FileAttributes::empty(),
    )
    .unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(rtl::read(file, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"rel");
    rtl::close(file).unwrap();

    // `..` climbs back out
    rtl::set_working_dir("..").unwrap();
    assert_eq!(rtl::get_working_dir().unwrap(), "A:\\");

    // a file is not a working directory
    assert_eq!(
        rtl::set_working_dir("A:\\dir\\note"),
        Err(SysError::InvalidArgument)
    );
    0
}

#[test]
fn working_directory_round_trip() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("cwd_main", cwd_main);
    assert_eq!(kernel.spawn_root("cwd_main", "").unwrap(), 0);
}

fn console_main(context: &Registers) -> i32 {
    let out = rtl::std_out(context);
    rtl::write_line(out, "to the screen").unwrap();

    // console input is closed in this harness: read reports end of file
    let mut buf = [0u8; 8];
    assert_eq!(rtl::read(rtl::std_in(context), &mut buf).unwrap(), 0);
    0
}

#[test]
fn console_writes_reach_the_display() {
    let (kernel, tty) = common::test_kernel();
    kernel.register_program("console_main", console_main);
    assert_eq!(kernel.spawn_root("console_main", "").unwrap(), 0);
    assert_eq!(tty.output(), b"to the screen\n");
}

#[test]
fn syscalls_need_a_kernel_thread() {
    let (_kernel, _tty) = common::test_kernel();

    // this host thread was never started by the kernel
    assert_eq!(rtl::get_working_dir(), Err(SysError::UnrecognizedThread));
    assert_eq!(rtl::shutdown(), Err(SysError::UnrecognizedThread));
}

fn bad_arguments_main(_context: &Registers) -> i32 {
    let mut context = Registers::default();
    context.rax.set_h(0x7F); // no such service family
    kernel::syscall::enter(&mut context);
    assert!(context.flags.carry);
    assert_eq!(context.rax.x(), SysError::InvalidArgument.code());

    // close on a handle the process does not own
    assert_eq!(rtl::close(0xBEEF), Err(SysError::InvalidArgument));

    // unknown disk letter
    assert_eq!(
        rtl::open("Z:\\x", OpenFlags::empty(), FileAttributes::empty()),
        Err(SysError::FileNotFound)
    );
    0
}

#[test]
fn malformed_requests_are_rejected() {
    let (kernel, _tty) = common::test_kernel();
    kernel.register_program("bad_arguments", bad_arguments_main);
    assert_eq!(kernel.spawn_root("bad_arguments", "").unwrap(), 0);
}
