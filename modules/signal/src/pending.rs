use core::sync::atomic::{AtomicU32, Ordering};

use crate::{Sig, SigSet};

/// Pending-signal bitmask of one thread. Raising is an atomic OR from any
/// thread; delivery swaps the whole mask to zero at a syscall boundary.
#[derive(Default, Debug)]
pub struct SigPending(AtomicU32);

impl SigPending {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn raise(&self, sig: Sig) {
        let mut set = SigSet::empty();
        set.add(sig);
        self.0.fetch_or(set.bits(), Ordering::Relaxed);
    }

    /// Take every pending signal at once.
    pub fn take(&self) -> SigSet {
        SigSet::from_bits_retain(self.0.swap(0, Ordering::Relaxed))
    }

    /// Drop a pending signal without delivering it.
    pub fn discard(&self, sig: Sig) {
        let mut set = SigSet::empty();
        set.add(sig);
        self.0.fetch_and(!set.bits(), Ordering::Relaxed);
    }

    pub fn is_empty(&self) -> bool {
        self.0.load(Ordering::Relaxed) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_drains_everything_exactly_once() {
        let pending = SigPending::new();
        pending.raise(Sig::TERMINATE);
        pending.raise(Sig::from_number(1).unwrap());

        let taken = pending.take();
        assert!(taken.contains_sig(Sig::TERMINATE));
        assert!(taken.contains_sig(Sig::from_number(1).unwrap()));
        assert!(pending.take().is_empty());
    }

    #[test]
    fn discard_clears_only_its_bit() {
        let pending = SigPending::new();
        pending.raise(Sig::from_number(3).unwrap());
        pending.raise(Sig::from_number(9).unwrap());
        pending.discard(Sig::from_number(3).unwrap());

        let taken = pending.take();
        assert!(!taken.contains_sig(Sig::from_number(3).unwrap()));
        assert!(taken.contains_sig(Sig::from_number(9).unwrap()));
    }
}
