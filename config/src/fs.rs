/// Preferred cluster payload in bytes; the formatter derives sectors per
/// cluster from this and the disk's sector size.
pub const PREFERRED_CLUSTER_BYTES: usize = 1024;

/// Boot record size on disk after alignment padding.
pub const BOOT_RECORD_SIZE: usize = 272;

/// Volume description field length inside the boot record.
pub const DESCRIPTION_LEN: usize = 250;

/// Signature field length inside the boot record.
pub const SIGNATURE_LEN: usize = 9;

/// Number of FAT copies written by the formatter.
pub const FAT_COPIES: u8 = 1;

/// On-disk directory entry size.
pub const DIR_ENTRY_SIZE: usize = 24;

/// Directory entry name field, terminating NUL included.
pub const MAX_NAME_LEN: usize = 12;

/// Longest run of physically contiguous clusters transferred in one
/// device call.
pub const MAX_CLUSTER_RUN: usize = 1000;

/// Name field of the directory entry surfaced to user code.
pub const DIR_NAME_LEN: usize = 62;
