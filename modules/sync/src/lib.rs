//! Blocking primitives used throughout the kernel.
//!
//! Thin wrappers over `std::sync` that recover the data from a poisoned
//! lock instead of propagating the panic of an unrelated thread. Every
//! blocking wait in the kernel goes through these.

pub mod mutex;

pub use mutex::{Condvar, Mutex, MutexGuard};
