//! Runtime library: typed wrappers around the raw syscall interface.
//!
//! Every wrapper packs its arguments into a register block, traps into the
//! kernel and translates the carry flag back into a `Result`.

use std::ffi::{CStr, CString};

use systype::{
    CloneOp, EntryFn, FileAttributes, FsService, HandleId, OpenFlags, ProcService,
    Registers, SeekBase, SeekCommand, Service, SysError, SysResult,
};

fn syscall(context: &mut Registers) -> SysResult<()> {
    kernel::syscall::enter(context);
    if context.flags.carry {
        Err(SysError::from_repr(context.rax.x()).unwrap_or(SysError::UnknownError))
    } else {
        Ok(())
    }
}

fn fs_context(service: FsService) -> Registers {
    let mut context = Registers::default();
    context.rax.set_h(Service::FileSystem as u8);
    context.rax.set_l(service as u8);
    context
}

fn proc_context(service: ProcService) -> Registers {
    let mut context = Registers::default();
    context.rax.set_h(Service::Process as u8);
    context.rax.set_l(service as u8);
    context
}

/// Standard input handle prefilled in a program's entry context.
pub fn std_in(context: &Registers) -> HandleId {
    context.rax.x()
}

/// Standard output handle prefilled in a program's entry context.
pub fn std_out(context: &Registers) -> HandleId {
    context.rbx.x()
}

/// Command line prefilled in a program's entry context.
pub fn cmd_line(context: &Registers) -> &str {
    let ptr = context.rdi.full();
    if ptr == 0 {
        return "";
    }
    unsafe { CStr::from_ptr(ptr as *const std::ffi::c_char) }
        .to_str()
        .unwrap_or("")
}

/// Signal number delivered to a signal handler's context.
pub fn signal_number(context: &Registers) -> u8 {
    context.rcx.ex() as u8
}

pub fn open(path: &str, flags: OpenFlags, attributes: FileAttributes) -> SysResult<HandleId> {
    let path = CString::new(path).map_err(|_| SysError::InvalidArgument)?;
    let mut context = fs_context(FsService::OpenFile);
    context.rdx.set_full(path.as_ptr() as u64);
    context.rcx.set_l(flags.bits());
    context.rdi.set_x(attributes.bits());
    syscall(&mut context)?;
    Ok(context.rax.x())
}

pub fn write(handle: HandleId, buf: &[u8]) -> SysResult<usize> {
    let mut context = fs_context(FsService::WriteFile);
    context.rdx.set_x(handle);
    context.rdi.set_full(buf.as_ptr() as u64);
    context.rcx.set_full(buf.len() as u64);
    syscall(&mut context)?;
    Ok(context.rax.full() as usize)
}

pub fn read(handle: HandleId, buf: &mut [u8]) -> SysResult<usize> {
    let mut context = fs_context(FsService::ReadFile);
    context.rdx.set_x(handle);
    context.rdi.set_full(buf.as_mut_ptr() as u64);
    context.rcx.set_full(buf.len() as u64);
    syscall(&mut context)?;
    Ok(context.rax.full() as usize)
}

pub fn seek(
    handle: HandleId,
    command: SeekCommand,
    base: SeekBase,
    offset: i64,
) -> SysResult<u64> {
    let mut context = fs_context(FsService::Seek);
    context.rdx.set_x(handle);
    context.rcx.set_l(base as u8);
    context.rcx.set_h(command as u8);
    context.rdi.set_full(offset as u64);
    syscall(&mut context)?;
    Ok(context.rax.full())
}

pub fn close(handle: HandleId) -> SysResult<()> {
    let mut context = fs_context(FsService::CloseHandle);
    context.rdx.set_x(handle);
    syscall(&mut context)
}

pub fn delete(path: &str) -> SysResult<()> {
    let path = CString::new(path).map_err(|_| SysError::InvalidArgument)?;
    let mut context = fs_context(FsService::DeleteFile);
    context.rdx.set_full(path.as_ptr() as u64);
    syscall(&mut context)
}

pub fn set_working_dir(path: &str) -> SysResult<()> {
    let path = CString::new(path).map_err(|_| SysError::InvalidArgument)?;
    let mut context = fs_context(FsService::SetWorkingDir);
    context.rdx.set_full(path.as_ptr() as u64);
    syscall(&mut context)
}

pub fn get_working_dir() -> SysResult<String> {
    let mut buf = [0u8; 512];
    let mut context = fs_context(FsService::GetWorkingDir);
    context.rdx.set_full(buf.as_mut_ptr() as u64);
    context.rcx.set_full(buf.len() as u64);
    syscall(&mut context)?;
    let length = context.rax.full() as usize;
    Ok(String::from_utf8_lossy(&buf[..length]).into_owned())
}

/// Returns `(write end, read end)`.
pub fn create_pipe() -> SysResult<(HandleId, HandleId)> {
    let mut ends = [0 as HandleId; 2];
    let mut context = fs_context(FsService::CreatePipe);
    context.rdx.set_full(ends.as_mut_ptr() as u64);
    syscall(&mut context)?;
    Ok((ends[0], ends[1]))
}

pub fn create_process(
    program: &str,
    cmd_line: &str,
    std_in: HandleId,
    std_out: HandleId,
) -> SysResult<HandleId> {
    let program = CString::new(program).map_err(|_| SysError::InvalidArgument)?;
    let cmd_line = CString::new(cmd_line).map_err(|_| SysError::InvalidArgument)?;

    let mut context = proc_context(ProcService::Clone);
    context.rcx.set_l(CloneOp::CreateProcess as u8);
    context.rdx.set_full(program.as_ptr() as u64);
    context.rdi.set_full(cmd_line.as_ptr() as u64);
    context
        .rbx
        .set_ex((u32::from(std_in) << 16) | u32::from(std_out));
    syscall(&mut context)?;
    Ok(context.rax.x())
}

pub fn create_thread(entry: EntryFn, param: u64) -> SysResult<HandleId> {
    let mut context = proc_context(ProcService::Clone);
    context.rcx.set_l(CloneOp::CreateThread as u8);
    context.rdx.set_full(entry as usize as u64);
    context.rdi.set_full(param);
    syscall(&mut context)?;
    Ok(context.rax.x())
}

pub fn wait_for(handles: &[HandleId]) -> SysResult<u16> {
    let mut context = proc_context(ProcService::WaitFor);
    context.rdx.set_full(handles.as_ptr() as u64);
    context.rcx.set_x(handles.len() as u16);
    syscall(&mut context)?;
    Ok(context.rax.x())
}

pub fn read_exit_code(handle: HandleId) -> SysResult<u16> {
    let mut context = proc_context(ProcService::ReadExitCode);
    context.rdx.set_x(handle);
    syscall(&mut context)?;
    Ok(context.rax.x())
}

pub fn exit(code: u16) -> SysResult<()> {
    let mut context = proc_context(ProcService::Exit);
    context.rcx.set_x(code);
    syscall(&mut context)
}

pub fn shutdown() -> SysResult<()> {
    let mut context = proc_context(ProcService::Shutdown);
    syscall(&mut context)
}

pub fn register_signal_handler(signal: u8, handler: Option<EntryFn>) -> SysResult<()> {
    let mut context = proc_context(ProcService::RegisterSignalHandler);
    context.rcx.set_l(signal);
    context
        .rdx
        .set_full(handler.map_or(0, |entry| entry as usize as u64));
    syscall(&mut context)
}

/// Write a whole string to a handle, newline included.
pub fn write_line(handle: HandleId, line: &str) -> SysResult<()> {
    write(handle, line.as_bytes())?;
    write(handle, b"\n")?;
    Ok(())
}
