//! Host-backed devices: the "hardware" of the simulation.

mod image;
mod ram;
mod tty;

pub use image::ImageDisk;
pub use ram::RamDisk;
pub use tty::HostTty;

use device_core::{DiskError, DriveParams};

/// Shared bounds check of the disk drivers.
fn check_access(
    params: &DriveParams,
    lba: u64,
    len: usize,
) -> Result<(), DiskError> {
    let sector = u64::from(params.bytes_per_sector);
    if len % sector as usize != 0 {
        return Err(DiskError::BadCommand);
    }
    let count = len as u64 / sector;
    if lba + count > params.sector_count {
        return Err(DiskError::SectorNotFound);
    }
    Ok(())
}
