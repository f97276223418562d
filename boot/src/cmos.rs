//! Boot configuration, the simulation's "CMOS".
//!
//! `boot.toml` enumerates the drives and names the first program:
//!
//! ```toml
//! init = "init"
//! cmd_line = ""
//!
//! [drive.0]
//! ram_disk = true
//! ram_disk_size = 1048576
//!
//! [drive.1]
//! disk_image = "disk1.img"
//! read_only = true
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "boot.toml";

const DEFAULT_RAM_DISK_SIZE: u64 = 1024 * 1024;

fn default_init() -> String {
    "init".to_string()
}

fn default_bytes_per_sector() -> u16 {
    512
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootConfig {
    /// Program started as the first process.
    #[serde(default = "default_init")]
    pub init: String,

    /// Command line of the first process.
    #[serde(default)]
    pub cmd_line: String,

    /// Drives keyed by decimal index; the index decides the disk letter.
    #[serde(default)]
    pub drive: BTreeMap<String, DriveConfig>,
}

impl BootConfig {
    /// Drives in index order, bad keys dropped with a warning.
    pub fn drives(&self) -> Vec<(u8, &DriveConfig)> {
        let mut drives: Vec<(u8, &DriveConfig)> = self
            .drive
            .iter()
            .filter_map(|(key, config)| match key.parse::<u8>() {
                Ok(index) => Some((index, config)),
                Err(_) => {
                    log::warn!("[cmos] ignoring drive with non-numeric key '{key}'");
                    None
                }
            })
            .collect();
        drives.sort_by_key(|(index, _)| *index);
        drives
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    #[serde(default)]
    pub ram_disk: bool,

    #[serde(default)]
    pub ram_disk_size: Option<u64>,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub disk_image: Option<PathBuf>,

    #[serde(default = "default_bytes_per_sector")]
    pub bytes_per_sector: u16,
}

impl DriveConfig {
    pub fn ram_disk_size(&self) -> u64 {
        self.ram_disk_size.unwrap_or(DEFAULT_RAM_DISK_SIZE)
    }
}

impl Default for BootConfig {
    /// One volatile megabyte-sized drive and the stock init program; used
    /// when no configuration file is present.
    fn default() -> Self {
        let mut drive = BTreeMap::new();
        drive.insert(
            "0".to_string(),
            DriveConfig {
                ram_disk: true,
                ram_disk_size: Some(DEFAULT_RAM_DISK_SIZE),
                read_only: false,
                disk_image: None,
                bytes_per_sector: default_bytes_per_sector(),
            },
        );
        BootConfig {
            init: default_init(),
            cmd_line: String::new(),
            drive,
        }
    }
}

pub fn load(path: &std::path::Path) -> Result<BootConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    toml::from_str(&text).map_err(|err| format!("cannot parse {}: {err}", path.display()))
}
