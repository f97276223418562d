use systype::Registers;

use crate::rtl;

/// Write the command line to standard output, newline-terminated.
pub fn main(context: &Registers) -> i32 {
    let out = rtl::std_out(context);
    match rtl::write_line(out, rtl::cmd_line(context)) {
        Ok(()) => 0,
        Err(err) => {
            log::warn!("[echo] write failed: {err:?}");
            1
        }
    }
}
