/// Upper bound on simultaneously live handles; ids are 16-bit and zero is
/// reserved as "no handle".
pub const MAX_HANDLE_COUNT: usize = u16::MAX as usize;
