use device_core::{BlockDevice, DiskError, DriveParams};
use sync::Mutex;

/// Volatile disk held in host memory. The size is rounded down to whole
/// sectors at construction.
pub struct RamDisk {
    params: DriveParams,
    read_only: bool,
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(byte_size: usize, bytes_per_sector: u16) -> Self {
        Self::with_options(byte_size, bytes_per_sector, false)
    }

    pub fn with_options(byte_size: usize, bytes_per_sector: u16, read_only: bool) -> Self {
        assert!(bytes_per_sector > 0);
        let sector_count = byte_size as u64 / u64::from(bytes_per_sector);
        let params = DriveParams {
            bytes_per_sector,
            sector_count,
        };
        log::debug!(
            "[RamDisk::new] {} sectors of {} bytes",
            sector_count,
            bytes_per_sector
        );
        Self {
            params,
            read_only,
            data: Mutex::new(vec![0; params.byte_size() as usize]),
        }
    }
}

impl BlockDevice for RamDisk {
    fn params(&self) -> DriveParams {
        self.params
    }

    fn read_sectors(&self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        super::check_access(&self.params, lba, buf.len())?;
        let offset = (lba * u64::from(self.params.bytes_per_sector)) as usize;
        let data = self.data.lock();
        buf.copy_from_slice(&data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_sectors(&self, lba: u64, buf: &[u8]) -> Result<(), DiskError> {
        if self.read_only {
            return Err(DiskError::WriteFault);
        }
        super::check_access(&self.params, lba, buf.len())?;
        let offset = (lba * u64::from(self.params.bytes_per_sector)) as usize;
        let mut data = self.data.lock();
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(())
    }
}
