//! User programs and the runtime wrappers they use.
//!
//! Programs are plain functions with the entry signature; the bootstrap
//! registers them with the kernel by name, which is what `CreateProcess`
//! resolves against.

pub mod rtl;

mod echo;
mod init;

use systype::EntryFn;

/// Every program this module exports, by symbol name.
pub fn programs() -> Vec<(&'static str, EntryFn)> {
    vec![("init", init::main), ("echo", echo::main)]
}
