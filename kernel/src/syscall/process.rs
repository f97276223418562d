//! Process family of syscalls.

use signal::Sig;
use systype::{
    CloneOp, EntryFn, HandleId, ProcService, Registers, SysError, SysResult,
};

use super::str_arg;
use crate::event::EventSet;
use crate::handle::HandleKind;
use crate::task::{self, process::Process, thread::Thread};

pub(super) fn handle(context: &mut Registers) -> SysResult<()> {
    match ProcService::from_repr(context.rax.l()) {
        Some(ProcService::Clone) => clone(context),
        Some(ProcService::WaitFor) => wait_for(context),
        Some(ProcService::ReadExitCode) => read_exit_code(context),
        Some(ProcService::Exit) => exit(context),
        Some(ProcService::Shutdown) => shutdown(),
        Some(ProcService::RegisterSignalHandler) => register_signal_handler(context),
        None => Err(SysError::InvalidArgument),
    }
}

fn clone(context: &mut Registers) -> SysResult<()> {
    match CloneOp::from_repr(context.rcx.l()) {
        Some(CloneOp::CreateProcess) => create_process(context),
        Some(CloneOp::CreateThread) => create_thread(context),
        None => Err(SysError::InvalidArgument),
    }
}

fn create_process(context: &mut Registers) -> SysResult<()> {
    let parent = task::current_process().ok_or(SysError::UnrecognizedThread)?;
    let kernel = task::current_kernel().ok_or(SysError::UnrecognizedThread)?;

    let program = unsafe { str_arg(context.rdx.full())? };
    let cmd_line = if context.rdi.full() == 0 {
        ""
    } else {
        unsafe { str_arg(context.rdi.full())? }
    };
    let std_in_id = (context.rbx.ex() >> 16) as HandleId;
    let std_out_id = context.rbx.ex() as HandleId;

    // the program name resolves against the user-program module
    let entry = kernel
        .find_program(program)
        .ok_or(SysError::FileNotFound)?;

    let std_in = if std_in_id != 0 {
        Some(
            parent
                .get_handle_of_kind(std_in_id, HandleKind::File)
                .ok_or(SysError::InvalidArgument)?,
        )
    } else {
        None
    };
    let std_out = if std_out_id != 0 {
        Some(
            parent
                .get_handle_of_kind(std_out_id, HandleKind::File)
                .ok_or(SysError::InvalidArgument)?,
        )
    } else {
        None
    };

    let child = Process::create(
        &kernel,
        program,
        cmd_line,
        parent.working_directory(),
        entry,
        std_in,
        std_out,
        false,
    )?;

    context.rax.set_x(child.id());
    parent.add_handle(child);
    Ok(())
}

fn create_thread(context: &mut Registers) -> SysResult<()> {
    let process = task::current_process().ok_or(SysError::UnrecognizedThread)?;
    let kernel = task::current_kernel().ok_or(SysError::UnrecognizedThread)?;
    let process_ref = task::with_env(|env| env.process.clone())
        .ok_or(SysError::UnrecognizedThread)?;

    if context.rdx.full() == 0 {
        return Err(SysError::InvalidArgument);
    }
    // the entry pointer travels through the register block like any other
    // argument
    let entry: EntryFn = unsafe { std::mem::transmute(context.rdx.full() as usize) };

    let mut thread_context = Registers::default();
    thread_context.rdi.set_full(context.rdi.full());

    let thread = Thread::spawn(&kernel, entry, thread_context, &process_ref)?;

    context.rax.set_x(thread.id());
    process.add_handle(thread);
    Ok(())
}

fn wait_for(context: &mut Registers) -> SysResult<()> {
    let kernel = task::current_kernel().ok_or(SysError::UnrecognizedThread)?;

    let count = usize::from(context.rcx.x());
    if context.rdx.full() == 0 || count == 0 {
        return Err(SysError::InvalidArgument);
    }
    let handles = unsafe {
        std::slice::from_raw_parts(context.rdx.full() as *const HandleId, count)
    };

    let index = kernel
        .events()
        .wait_for_any(handles, EventSet::THREAD_END | EventSet::PROCESS_END)?;
    context.rax.set_x(index);
    Ok(())
}

fn read_exit_code(context: &mut Registers) -> SysResult<()> {
    let process = task::current_process().ok_or(SysError::UnrecognizedThread)?;

    let handle = process
        .get_handle(context.rdx.x())
        .ok_or(SysError::InvalidArgument)?;

    let code = match handle.kind() {
        HandleKind::Thread => handle
            .as_thread()
            .ok_or(SysError::InvalidArgument)?
            .exit_code(),
        HandleKind::Process => handle
            .as_process()
            .and_then(|p| p.main_thread())
            .and_then(|main| main.as_thread().map(|t| t.exit_code()))
            .ok_or(SysError::InvalidArgument)?,
        HandleKind::File => return Err(SysError::InvalidArgument),
    };

    context.rax.set_x(code as u16);
    Ok(())
}

fn exit(context: &mut Registers) -> SysResult<()> {
    let thread = task::current_thread().ok_or(SysError::UnrecognizedThread)?;

    // only the exit code is recorded; the thread terminates by returning
    // from its entry function
    thread.set_exit_code(i32::from(context.rcx.x()));
    Ok(())
}

fn shutdown() -> SysResult<()> {
    let kernel = task::current_kernel().ok_or(SysError::UnrecognizedThread)?;
    kernel.shutdown();
    Ok(())
}

fn register_signal_handler(context: &mut Registers) -> SysResult<()> {
    let thread = task::current_thread().ok_or(SysError::UnrecognizedThread)?;

    let sig = Sig::from_number(context.rcx.l()).ok_or(SysError::InvalidArgument)?;

    if context.rdx.full() != 0 {
        let handler: EntryFn = unsafe { std::mem::transmute(context.rdx.full() as usize) };
        thread.set_signal_enabled(sig, true);
        thread.set_signal_handler(Some(handler));
    } else {
        thread.set_signal_enabled(sig, false);
    }

    Ok(())
}
