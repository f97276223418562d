use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use device_core::{BlockDevice, DiskError, DriveParams};
use sync::Mutex;

/// Disk backed by an image file on the host. The usable size is the file
/// length rounded down to whole sectors.
pub struct ImageDisk {
    params: DriveParams,
    read_only: bool,
    file: Mutex<File>,
}

impl ImageDisk {
    pub fn open(
        path: &Path,
        bytes_per_sector: u16,
        read_only: bool,
    ) -> io::Result<Self> {
        assert!(bytes_per_sector > 0);
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)?;
        let byte_size = file.metadata()?.len();
        let params = DriveParams {
            bytes_per_sector,
            sector_count: byte_size / u64::from(bytes_per_sector),
        };
        log::info!(
            "[ImageDisk::open] {} -> {} sectors of {} bytes",
            path.display(),
            params.sector_count,
            bytes_per_sector
        );
        Ok(Self {
            params,
            read_only,
            file: Mutex::new(file),
        })
    }
}

impl BlockDevice for ImageDisk {
    fn params(&self) -> DriveParams {
        self.params
    }

    fn read_sectors(&self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        super::check_access(&self.params, lba, buf.len())?;
        let offset = lba * u64::from(self.params.bytes_per_sector);
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(buf))
            .map_err(|err| {
                log::error!("[ImageDisk::read_sectors] lba {lba}: {err}");
                DiskError::BadSector
            })
    }

    fn write_sectors(&self, lba: u64, buf: &[u8]) -> Result<(), DiskError> {
        if self.read_only {
            return Err(DiskError::WriteFault);
        }
        super::check_access(&self.params, lba, buf.len())?;
        let offset = lba * u64::from(self.params.bytes_per_sector);
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(buf))
            .and_then(|_| file.flush())
            .map_err(|err| {
                log::error!("[ImageDisk::write_sectors] lba {lba}: {err}");
                DiskError::WriteFault
            })
    }
}
