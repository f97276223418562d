/// Number of signals; valid signal numbers are 1..=NSIG.
pub const NSIG: usize = 32;
