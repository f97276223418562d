//! Host bootstrap: assemble the simulated hardware, load the kernel,
//! start the first process on this thread.

mod cmos;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use device_core::BlockDevice;
use driver::{HostTty, ImageDisk, RamDisk};
use kernel::Kernel;

use crate::cmos::BootConfig;

fn build_disks(config: &BootConfig) -> Vec<Arc<dyn BlockDevice>> {
    let mut disks: Vec<Arc<dyn BlockDevice>> = Vec::new();

    for (index, drive) in config.drives() {
        if let Some(image) = &drive.disk_image {
            match ImageDisk::open(image, drive.bytes_per_sector, drive.read_only) {
                Ok(disk) => disks.push(Arc::new(disk)),
                Err(err) => {
                    log::error!("[boot] drive {index}: cannot open image: {err}");
                }
            }
        } else if drive.ram_disk {
            disks.push(Arc::new(RamDisk::with_options(
                drive.ram_disk_size() as usize,
                drive.bytes_per_sector,
                drive.read_only,
            )));
        } else {
            log::warn!("[boot] drive {index}: neither ram_disk nor disk_image, skipped");
        }
    }

    disks
}

fn main() -> ExitCode {
    logging::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| cmos::DEFAULT_CONFIG_FILE.to_string());

    let config = match cmos::load(Path::new(&config_path)) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("[boot] {err}; using the default configuration");
            BootConfig::default()
        }
    };

    let disks = build_disks(&config);
    let tty = Arc::new(HostTty::new());

    let kernel = match Kernel::new(disks, tty) {
        Ok(kernel) => kernel,
        Err(err) => {
            eprintln!("kernel bring-up failed: {err:?}");
            return ExitCode::FAILURE;
        }
    };

    for (name, entry) in user::programs() {
        kernel.register_program(name, entry);
    }

    log::info!("[boot] starting '{}'", config.init);
    match kernel.spawn_root(&config.init, &config.cmd_line) {
        Ok(code) => {
            kernel.shutdown();
            ExitCode::from(code as u8)
        }
        Err(err) => {
            eprintln!("cannot start '{}': {err:?}", config.init);
            ExitCode::FAILURE
        }
    }
}
