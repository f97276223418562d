use systype::Registers;

use crate::rtl;

/// The first process. Prints a banner, pipes a greeting through a child
/// `echo`, then asks the kernel to shut down.
pub fn main(context: &Registers) -> i32 {
    let out = rtl::std_out(context);
    let _ = rtl::write_line(out, "WrenOS is up.");

    if let Err(err) = run_demo(out) {
        let _ = rtl::write_line(out, "init: demo failed");
        log::warn!("[init] {err:?}");
    }

    let _ = rtl::shutdown();
    0
}

fn run_demo(out: systype::HandleId) -> systype::SysResult<()> {
    let (pipe_write, pipe_read) = rtl::create_pipe()?;

    let child = rtl::create_process("echo", "hello from a pipe", 0, pipe_write)?;
    rtl::wait_for(&[child])?;
    let code = rtl::read_exit_code(child)?;
    rtl::close(child)?;
    rtl::close(pipe_write)?;

    let mut buf = [0u8; 128];
    loop {
        let n = rtl::read(pipe_read, &mut buf)?;
        if n == 0 {
            break;
        }
        rtl::write(out, &buf[..n])?;
    }
    rtl::close(pipe_read)?;

    if code != 0 {
        log::warn!("[init] echo exited with {code}");
    }
    Ok(())
}
