use strum::FromRepr;

pub type SysResult<T> = Result<T, SysError>;

/// Result of one syscall: the value placed in the result register on
/// success, or the error code reported through the carry flag.
pub type SyscallResult = SysResult<u64>;

/// Error kinds crossing the syscall boundary. The discriminants are the
/// wire codes written to the result register when the carry flag is set.
#[derive(FromRepr, Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum SysError {
    /// Malformed request: bad handle, bad pointer, wrong object kind.
    InvalidArgument = 1,
    /// Path did not resolve, or no filesystem mounted for the letter.
    FileNotFound = 2,
    /// Directory still has entries and cannot be removed.
    DirectoryNotEmpty = 3,
    /// FAT or directory cluster exhausted.
    NotEnoughDiskSpace = 4,
    /// Kernel resource exhausted (handle table full).
    OutOfMemory = 5,
    /// Write or resize on a read-only object.
    PermissionDenied = 6,
    /// Device reported a failure.
    IoError = 7,
    /// Syscall issued from a thread the kernel never started.
    UnrecognizedThread = 0xA000,
    UnknownError = 0xFFFF,
}

impl SysError {
    pub fn code(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for err in [
            SysError::InvalidArgument,
            SysError::FileNotFound,
            SysError::DirectoryNotEmpty,
            SysError::NotEnoughDiskSpace,
            SysError::OutOfMemory,
            SysError::PermissionDenied,
            SysError::IoError,
            SysError::UnrecognizedThread,
            SysError::UnknownError,
        ] {
            assert_eq!(SysError::from_repr(err.code()), Some(err));
        }
        assert_eq!(SysError::from_repr(0), None);
    }
}
