mod abi;
mod error;
mod file;

pub use abi::*;
pub use error::*;
pub use file::*;

/// Handle identifier handed out to user code. Zero never names a handle.
pub type HandleId = u16;

pub const INVALID_HANDLE: HandleId = 0;

/// Entry point of a user program, thread or signal handler. The context
/// carries the arguments in its registers; the return value becomes the
/// thread's exit code unless the thread already exited explicitly.
pub type EntryFn = fn(&Registers) -> i32;
