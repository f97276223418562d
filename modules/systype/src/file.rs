use bitflags::bitflags;
use config::fs::DIR_NAME_LEN;

bitflags! {
    /// File attribute bits, stored on disk and reported by `query`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct FileAttributes: u16 {
        const READ_ONLY = 1 << 0;
        const HIDDEN    = 1 << 1;
        const SYSTEM    = 1 << 2;
        const VOLUME_ID = 1 << 3;
        const DIRECTORY = 1 << 4;
        const ARCHIVE   = 1 << 5;
    }
}

bitflags! {
    /// Flags of the Open_File operation (rcx.l).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct OpenFlags: u8 {
        /// Only open an existing file, never create one.
        const OPEN_ALWAYS = 1 << 0;
    }
}

/// Metadata of one file or directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub attributes: FileAttributes,
    pub size: u64,
}

impl FileInfo {
    pub fn is_read_only(&self) -> bool {
        self.attributes.contains(FileAttributes::READ_ONLY)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

/// Directory entry as read from a directory handle: attribute bits plus a
/// NUL-terminated name.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct DirEntry {
    pub attributes: u16,
    pub name: [u8; DIR_NAME_LEN],
}

impl DirEntry {
    pub fn new(attributes: FileAttributes, name: &str) -> Self {
        let mut entry = DirEntry {
            attributes: attributes.bits(),
            name: [0; DIR_NAME_LEN],
        };
        let len = name.len().min(DIR_NAME_LEN - 1);
        entry.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        entry
    }

    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::from_bits_truncate(self.attributes)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes().contains(FileAttributes::DIRECTORY)
    }

    /// Byte size of one serialized entry.
    pub const WIRE_SIZE: usize = 2 + DIR_NAME_LEN;

    /// Serialize into the layout read from a directory handle:
    /// attributes little-endian, then the NUL-terminated name.
    pub fn write_to(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.attributes.to_le_bytes());
        out[2..2 + DIR_NAME_LEN].copy_from_slice(&self.name);
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut name = [0; DIR_NAME_LEN];
        name.copy_from_slice(&bytes[2..2 + DIR_NAME_LEN]);
        DirEntry {
            attributes: u16::from_le_bytes([bytes[0], bytes[1]]),
            name,
        }
    }
}

impl std::fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirEntry")
            .field("attributes", &self.attributes())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_entry_truncates_long_names() {
        let long = "x".repeat(100);
        let entry = DirEntry::new(FileAttributes::empty(), &long);
        assert_eq!(entry.name().len(), DIR_NAME_LEN - 1);
        assert_eq!(entry.name[DIR_NAME_LEN - 1], 0);
    }

    #[test]
    fn dir_entry_layout_is_stable() {
        assert_eq!(std::mem::size_of::<DirEntry>(), DirEntry::WIRE_SIZE);
        assert_eq!(DirEntry::WIRE_SIZE, 64);
    }

    #[test]
    fn dir_entry_wire_round_trip() {
        let entry = DirEntry::new(FileAttributes::DIRECTORY, "logs");
        let mut wire = [0u8; DirEntry::WIRE_SIZE];
        entry.write_to(&mut wire);

        let back = DirEntry::from_bytes(&wire);
        assert_eq!(back.name(), "logs");
        assert!(back.is_directory());
    }
}
