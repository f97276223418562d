mod pending;
mod sigset;

pub use pending::SigPending;
pub use sigset::{Sig, SigSet};
