//! File-system family of syscalls.

use std::sync::Arc;

use systype::{
    FileAttributes, FileInfo, FsService, HandleId, OpenFlags, Registers, SeekBase,
    SeekCommand, SysError, SysResult,
};

use super::{buf_arg, buf_arg_mut, str_arg};
use crate::fs::path::Path;
use crate::handle::{HandleKind, HandleRef, KernelObject};
use crate::ipc::Pipe;
use crate::task::{self, process::Process};
use crate::vfs::DiskFile;
use crate::Kernel;

pub(super) fn handle(context: &mut Registers) -> SysResult<()> {
    match FsService::from_repr(context.rax.l()) {
        Some(FsService::OpenFile) => open(context),
        Some(FsService::WriteFile) => write(context),
        Some(FsService::ReadFile) => read(context),
        Some(FsService::Seek) => seek(context),
        Some(FsService::CloseHandle) => close(context),
        Some(FsService::DeleteFile) => delete(context),
        Some(FsService::SetWorkingDir) => set_working_dir(context),
        Some(FsService::GetWorkingDir) => get_working_dir(context),
        Some(FsService::CreatePipe) => create_pipe(context),
        None => Err(SysError::InvalidArgument),
    }
}

fn current_process() -> SysResult<Arc<Process>> {
    task::current_process().ok_or(SysError::UnrecognizedThread)
}

fn current_kernel() -> SysResult<Arc<Kernel>> {
    task::current_kernel().ok_or(SysError::UnrecognizedThread)
}

/// Parse a path argument and anchor it to the caller's working directory.
fn absolute_path(process: &Process, text: &str) -> SysResult<Path> {
    let mut path = Path::parse(text);
    if path.is_empty() {
        return Err(SysError::InvalidArgument);
    }
    process.make_path_absolute(&mut path);
    Ok(path)
}

fn open_existing(
    kernel: &Arc<Kernel>,
    path: Path,
    attributes: FileAttributes,
) -> SysResult<HandleRef> {
    let wants_directory = attributes.contains(FileAttributes::DIRECTORY);
    let wants_read_only = attributes.contains(FileAttributes::READ_ONLY);

    let mut info = kernel.fs().query(&path)?;

    if info.is_directory() != wants_directory {
        return Err(SysError::InvalidArgument);
    }
    if info.is_read_only() && !wants_read_only {
        return Err(SysError::PermissionDenied);
    }
    if wants_read_only {
        info.attributes |= FileAttributes::READ_ONLY;
    }

    let file = DiskFile::new(Arc::clone(kernel.fs()), path, info);
    kernel.handles().add(KernelObject::File(Arc::new(file)))
}

fn create_new(
    kernel: &Arc<Kernel>,
    path: Path,
    attributes: FileAttributes,
) -> SysResult<HandleRef> {
    let mut info = FileInfo {
        attributes,
        size: 0,
    };

    kernel.fs().create(&path, info)?;

    // a file just created is open for writing no matter its attribute
    info.attributes -= FileAttributes::READ_ONLY;

    let file = DiskFile::new(Arc::clone(kernel.fs()), path, info);
    kernel.handles().add(KernelObject::File(Arc::new(file)))
}

fn open(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;
    let kernel = current_kernel()?;

    let text = unsafe { str_arg(context.rdx.full())? };
    let flags = OpenFlags::from_bits_truncate(context.rcx.l());
    let attributes = FileAttributes::from_bits_truncate(context.rdi.x());

    let path = absolute_path(&process, text)?;

    let handle = match open_existing(&kernel, path.clone(), attributes) {
        Ok(handle) => handle,
        Err(SysError::FileNotFound) if !flags.contains(OpenFlags::OPEN_ALWAYS) => {
            create_new(&kernel, path, attributes)?
        }
        Err(err) => return Err(err),
    };

    context.rax.set_x(handle.id());
    process.add_handle(handle);
    Ok(())
}

fn write(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;

    let buf = unsafe { buf_arg(context.rdi.full(), context.rcx.full())? };
    let handle = process
        .get_handle_of_kind(context.rdx.x(), HandleKind::File)
        .ok_or(SysError::InvalidArgument)?;
    let file = handle.as_file().ok_or(SysError::InvalidArgument)?;

    let written = file.write(buf)?;
    context.rax.set_full(written as u64);
    Ok(())
}

fn read(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;

    let buf = unsafe { buf_arg_mut(context.rdi.full(), context.rcx.full())? };
    let handle = process
        .get_handle_of_kind(context.rdx.x(), HandleKind::File)
        .ok_or(SysError::InvalidArgument)?;
    let file = handle.as_file().ok_or(SysError::InvalidArgument)?;

    let read = file.read(buf)?;
    context.rax.set_full(read as u64);
    Ok(())
}

fn seek(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;

    let handle = process
        .get_handle_of_kind(context.rdx.x(), HandleKind::File)
        .ok_or(SysError::InvalidArgument)?;
    let file = handle.as_file().ok_or(SysError::InvalidArgument)?;

    // only plain disk files know how to seek
    let file = file
        .downcast_arc::<DiskFile>()
        .map_err(|_| SysError::InvalidArgument)?;

    let base = SeekBase::from_repr(context.rcx.l()).ok_or(SysError::InvalidArgument)?;
    let command =
        SeekCommand::from_repr(context.rcx.h()).ok_or(SysError::InvalidArgument)?;
    let offset = context.rdi.full() as i64;

    let position = file.seek(command, base, offset)?;
    context.rax.set_full(position);
    Ok(())
}

fn close(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;
    let id: HandleId = context.rdx.x();

    let handle = process.get_handle(id).ok_or(SysError::InvalidArgument)?;
    if let Some(file) = handle.as_file() {
        file.close();
    }
    process.remove_handle(id);
    Ok(())
}

fn delete(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;
    let kernel = current_kernel()?;

    let text = unsafe { str_arg(context.rdx.full())? };
    let path = absolute_path(&process, text)?;

    kernel.fs().remove(&path)
}

fn set_working_dir(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;
    let kernel = current_kernel()?;

    let text = unsafe { str_arg(context.rdx.full())? };
    let path = absolute_path(&process, text)?;

    let info = kernel.fs().query(&path)?;
    if !info.is_directory() {
        return Err(SysError::InvalidArgument);
    }

    process.set_working_directory(path);
    Ok(())
}

fn get_working_dir(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;

    let buf = unsafe { buf_arg_mut(context.rdx.full(), context.rcx.full())? };
    let rendered = process.working_directory().to_string();
    let bytes = rendered.as_bytes();

    // truncate to the buffer, NUL-terminated
    let length = bytes.len().min(buf.len() - 1);
    buf[..length].copy_from_slice(&bytes[..length]);
    buf[length] = 0;

    context.rax.set_full(length as u64);
    Ok(())
}

fn create_pipe(context: &mut Registers) -> SysResult<()> {
    let process = current_process()?;
    let kernel = current_kernel()?;

    if context.rdx.full() == 0 {
        return Err(SysError::InvalidArgument);
    }
    let out = unsafe {
        std::slice::from_raw_parts_mut(context.rdx.full() as *mut HandleId, 2)
    };

    let (read_end, write_end) = Pipe::create(kernel.handles())?;
    out[0] = write_end.id();
    out[1] = read_end.id();

    process.add_handle(read_end);
    process.add_handle(write_end);
    Ok(())
}
