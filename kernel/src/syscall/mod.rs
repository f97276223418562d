//! The syscall entry point.
//!
//! One function decodes a register block: rax.h picks the family, rax.l
//! the operation. Success clears the carry flag; failure sets it and
//! leaves the error code in rax. Pending signals of the calling thread
//! are delivered on the way in and again on the way out.

mod fs;
mod process;

use std::ffi::CStr;

use systype::{Registers, Service, SysError, SysResult};

use crate::task;

/// Handle one syscall. Safe to call from any thread; only threads started
/// by the kernel get past `UnrecognizedThread`.
pub fn enter(context: &mut Registers) {
    task::handle_signals();

    let status = match Service::from_repr(context.rax.h()) {
        Some(Service::FileSystem) => fs::handle(context),
        Some(Service::Process) => process::handle(context),
        None => Err(SysError::InvalidArgument),
    };

    match status {
        Ok(()) => context.clear_error(),
        Err(err) => {
            log::debug!("[syscall::enter] {:#06x} -> {err:?}", context.rax.x());
            context.set_error(err.code());
        }
    }

    task::handle_signals();
}

/// NUL-terminated string argument passed by register.
///
/// # Safety
/// `ptr` must point at a valid NUL-terminated string that outlives the
/// syscall; user programs run in-process, so this is the caller's side of
/// the ABI contract.
pub(crate) unsafe fn str_arg<'a>(ptr: u64) -> SysResult<&'a str> {
    if ptr == 0 {
        return Err(SysError::InvalidArgument);
    }
    CStr::from_ptr(ptr as *const std::ffi::c_char)
        .to_str()
        .map_err(|_| SysError::InvalidArgument)
}

/// Byte-buffer argument passed as pointer + length.
///
/// # Safety
/// `ptr..ptr+len` must be valid for reads for the duration of the
/// syscall.
pub(crate) unsafe fn buf_arg<'a>(ptr: u64, len: u64) -> SysResult<&'a [u8]> {
    if ptr == 0 || len == 0 {
        return Err(SysError::InvalidArgument);
    }
    Ok(std::slice::from_raw_parts(ptr as *const u8, len as usize))
}

/// Mutable byte-buffer argument passed as pointer + length.
///
/// # Safety
/// `ptr..ptr+len` must be valid for writes for the duration of the
/// syscall and must not alias kernel state.
pub(crate) unsafe fn buf_arg_mut<'a>(ptr: u64, len: u64) -> SysResult<&'a mut [u8]> {
    if ptr == 0 || len == 0 {
        return Err(SysError::InvalidArgument);
    }
    Ok(std::slice::from_raw_parts_mut(ptr as *mut u8, len as usize))
}
