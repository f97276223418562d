//! Shared scaffolding for the end-to-end tests: a quiet terminal and a
//! fresh kernel over a RAM disk per test.
#![allow(dead_code)]

use std::sync::Arc;

use device_core::CharDevice;
use driver::RamDisk;
use kernel::Kernel;
use sync::Mutex;

/// Terminal with no input and a captured display.
#[derive(Default)]
pub struct SilentTty {
    output: Mutex<Vec<u8>>,
}

impl SilentTty {
    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }
}

impl CharDevice for SilentTty {
    fn read_char(&self) -> Option<u8> {
        None
    }

    fn peek_char(&self) -> Option<u8> {
        None
    }

    fn write_str(&self, s: &[u8]) {
        self.output.lock().extend_from_slice(s);
    }

    fn write_char(&self, ch: u8) {
        self.output.lock().push(ch);
    }
}

pub fn test_kernel() -> (Arc<Kernel>, Arc<SilentTty>) {
    test_kernel_with_disk(1024 * 1024)
}

pub fn test_kernel_with_disk(disk_bytes: usize) -> (Arc<Kernel>, Arc<SilentTty>) {
    logging::init();
    let tty = Arc::new(SilentTty::default());
    let disks: Vec<Arc<dyn device_core::BlockDevice>> =
        vec![Arc::new(RamDisk::new(disk_bytes, 512))];
    let kernel = Kernel::new(disks, tty.clone()).expect("kernel bring-up");
    (kernel, tty)
}
