use core::fmt;

use bitflags::bitflags;
use config::signal::NSIG;

/// One signal number. Zero is the empty signal; 1..=NSIG are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Sig(u8);

impl Sig {
    /// Sent to every live thread on kernel shutdown.
    pub const TERMINATE: Sig = Sig(15);

    pub fn from_number(number: u8) -> Option<Sig> {
        if number == 0 || number as usize > NSIG {
            None
        } else {
            Some(Sig(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    fn bit(self) -> u32 {
        1 << (self.0 - 1)
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Bitmap over signals 1..=32; bit n-1 stands for signal n.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct SigSet: u32 {
        const TERMINATE = 1 << 14;
    }
}

impl SigSet {
    pub fn add(&mut self, sig: Sig) {
        *self |= SigSet::from_bits_retain(sig.bit());
    }

    pub fn remove_sig(&mut self, sig: Sig) {
        *self &= !SigSet::from_bits_retain(sig.bit());
    }

    pub fn contains_sig(&self, sig: Sig) -> bool {
        self.bits() & sig.bit() != 0
    }

    /// Signals present in the set, ascending.
    pub fn iter_sigs(self) -> impl Iterator<Item = Sig> {
        (1..=NSIG as u8)
            .filter_map(Sig::from_number)
            .filter(move |sig| self.contains_sig(*sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_is_one_based() {
        assert!(Sig::from_number(0).is_none());
        assert!(Sig::from_number(33).is_none());
        let one = Sig::from_number(1).unwrap();
        let mut set = SigSet::empty();
        set.add(one);
        assert_eq!(set.bits(), 1);
        assert!(set.contains_sig(one));
    }

    #[test]
    fn terminate_matches_its_flag() {
        let mut set = SigSet::empty();
        set.add(Sig::TERMINATE);
        assert_eq!(set, SigSet::TERMINATE);
    }

    #[test]
    fn iteration_is_ascending() {
        let mut set = SigSet::empty();
        for n in [7u8, 2, 31] {
            set.add(Sig::from_number(n).unwrap());
        }
        let numbers: Vec<u8> = set.iter_sigs().map(Sig::number).collect();
        assert_eq!(numbers, vec![2, 7, 31]);
    }
}
