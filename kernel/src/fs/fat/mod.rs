//! The FAT-like volume.
//!
//! One mutex serialises everything a volume does, disk I/O included; the
//! boot record and the FAT live in memory behind it and every mutation is
//! written through before the operation reports success.

pub mod layout;

use std::sync::Arc;

use config::fs::{
    BOOT_RECORD_SIZE, DESCRIPTION_LEN, FAT_COPIES, MAX_CLUSTER_RUN, MAX_NAME_LEN,
    PREFERRED_CLUSTER_BYTES, SIGNATURE_LEN,
};
use device_core::{BlockDevice, DiskError};
use sync::Mutex;
use systype::{DirEntry, FileAttributes, FileInfo, SysError, SysResult};

use self::layout::{
    BootRecord, DirRecord, FAT_DIRECTORY, FAT_FILE_END, FAT_UNUSED, NO_CLUSTER, ROOT_CLUSTER,
};
use super::path::Path;
use super::FileSystem;

pub const VOLUME_DESCRIPTION: &str = "WrenOS volume.";
pub const VOLUME_SIGNATURE: &str = "wren-os";

/// Internal status of the FAT layer; collapsed into [`SysError`] at the
/// dispatcher surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatError {
    NoFilesystem,
    DiskOperation,
    NotADir,
    NotAFile,
    FileNotFound,
    FullDisk,
    FullDir,
    IncompatibleDisk,
    FileAlreadyExists,
    FileNameTooLong,
    DirectoryNotEmpty,
    RootForbidden,
}

impl From<DiskError> for FatError {
    fn from(err: DiskError) -> Self {
        log::error!("[fat] disk error {err:?}");
        FatError::DiskOperation
    }
}

impl From<FatError> for SysError {
    fn from(err: FatError) -> Self {
        match err {
            FatError::NotADir
            | FatError::NotAFile
            | FatError::FileAlreadyExists
            | FatError::FileNameTooLong
            | FatError::RootForbidden => SysError::InvalidArgument,
            FatError::FileNotFound => SysError::FileNotFound,
            FatError::FullDisk | FatError::FullDir => SysError::NotEnoughDiskSpace,
            FatError::DirectoryNotEmpty => SysError::DirectoryNotEmpty,
            FatError::NoFilesystem | FatError::DiskOperation | FatError::IncompatibleDisk => {
                SysError::IoError
            }
        }
    }
}

/// Where a path resolution ended up.
enum Located {
    Found { record: DirRecord, parent: DirRecord },
    /// The walk fell off at a missing name. `matched` counts the
    /// components that did resolve; `parent` is the directory searched
    /// last. `create` uses both to tell "parent missing" from "only the
    /// leaf missing".
    Missing { matched: usize, parent: DirRecord },
}

struct VolumeState {
    boot: BootRecord,
    fat: Vec<i32>,
}

pub struct FatVolume {
    device: Arc<dyn BlockDevice>,
    state: Mutex<VolumeState>,
}

fn root_record() -> DirRecord {
    DirRecord {
        name: [0; MAX_NAME_LEN],
        is_file: false,
        flags: FileAttributes::DIRECTORY.bits() as u8,
        size: 0,
        start_cluster: ROOT_CLUSTER,
    }
}

/// Next link of a chain; a corrupt index terminates the chain instead of
/// tearing down the kernel.
fn next_cluster(fat: &[i32], cluster: i32) -> i32 {
    match fat.get(cluster as usize) {
        Some(&value) => value,
        None => {
            log::error!("[fat] cluster {cluster} out of range");
            FAT_FILE_END
        }
    }
}

fn is_chain_link(value: i32) -> bool {
    value != FAT_FILE_END && value != FAT_DIRECTORY
}

fn get_free_cluster(fat: &[i32]) -> i32 {
    fat.iter()
        .position(|&entry| entry == FAT_UNUSED)
        .map_or(NO_CLUSTER, |index| index as i32)
}

fn count_free_clusters(fat: &[i32]) -> usize {
    fat.iter().filter(|&&entry| entry == FAT_UNUSED).count()
}

fn count_chain_clusters(fat: &[i32], start: i32) -> usize {
    let mut count = 1;
    let mut cluster = start;
    while is_chain_link(next_cluster(fat, cluster)) {
        cluster = next_cluster(fat, cluster);
        count += 1;
    }
    count
}

fn last_chain_cluster(fat: &[i32], start: i32) -> i32 {
    let mut cluster = start;
    while is_chain_link(next_cluster(fat, cluster)) {
        cluster = next_cluster(fat, cluster);
    }
    cluster
}

/// Cluster holding byte `offset` of the chain.
fn cluster_by_offset(fat: &[i32], start: i32, offset: u64, cluster_bytes: usize) -> i32 {
    let mut remaining = offset / cluster_bytes as u64;
    let mut cluster = start;
    while remaining > 0 && is_chain_link(next_cluster(fat, cluster)) {
        cluster = next_cluster(fat, cluster);
        remaining -= 1;
    }
    cluster
}

/// Split a chain into runs of physically contiguous clusters, each run at
/// most [`MAX_CLUSTER_RUN`] long, so a run moves in one device call.
fn chain_runs(fat: &[i32], start: i32) -> Vec<(i32, u32)> {
    let mut runs = Vec::new();
    let mut run_start = start;
    let mut run_len: u32 = 1;
    let mut cluster = start;

    loop {
        let next = next_cluster(fat, cluster);
        if is_chain_link(next) && next == cluster + 1 && (run_len as usize) < MAX_CLUSTER_RUN {
            run_len += 1;
        } else {
            runs.push((run_start, run_len));
            if !is_chain_link(next) {
                break;
            }
            run_start = next;
            run_len = 1;
        }
        cluster = next;
    }

    runs
}

/// Link `count` fresh clusters to the end of a chain, first-fit.
fn allocate_clusters(
    fat: &mut [i32],
    last_cluster: i32,
    count: usize,
) -> Result<(), FatError> {
    if count_free_clusters(fat) < count {
        return Err(FatError::FullDisk);
    }

    let mut tail = last_cluster;
    for _ in 0..count {
        let fresh = get_free_cluster(fat);
        fat[tail as usize] = fresh;
        fat[fresh as usize] = FAT_FILE_END;
        tail = fresh;
    }

    Ok(())
}

impl FatVolume {
    /// Probe the device for a volume; format it when none is there.
    pub fn mount(device: Arc<dyn BlockDevice>) -> SysResult<Arc<FatVolume>> {
        let params = device.params();

        let state = match load_boot_record(device.as_ref()) {
            Ok(boot) if boot.is_valid(params.bytes_per_sector) => {
                let fat = load_fat(device.as_ref(), &boot).map_err(SysError::from)?;
                log::info!(
                    "[FatVolume::mount] existing volume, {} clusters of {} bytes",
                    boot.usable_cluster_count,
                    boot.cluster_bytes()
                );
                VolumeState { boot, fat }
            }
            Ok(_) => format(device.as_ref()).map_err(SysError::from)?,
            Err(err) => {
                log::warn!("[FatVolume::mount] probe failed ({err:?}), formatting");
                format(device.as_ref()).map_err(SysError::from)?
            }
        };

        Ok(Arc::new(FatVolume {
            device,
            state: Mutex::new(state),
        }))
    }

    fn find_file(&self, state: &VolumeState, path: &Path) -> Result<Located, FatError> {
        let components = path.components();
        if components.is_empty() {
            return Ok(Located::Found {
                record: root_record(),
                parent: root_record(),
            });
        }

        let mut parent = root_record();
        let mut items = self.load_dir_records(state, &parent)?;

        for (index, component) in components.iter().enumerate() {
            let found = items
                .iter()
                .find(|item| !item.is_free() && item.name_str() == component.as_str())
                .copied();

            match found {
                Some(record) if index == components.len() - 1 => {
                    return Ok(Located::Found { record, parent });
                }
                Some(record) if record.is_file => {
                    // a file in the middle of the path
                    return Err(FatError::NotADir);
                }
                Some(record) => {
                    parent = record;
                    items = self.load_dir_records(state, &parent)?;
                }
                None => {
                    return Ok(Located::Missing {
                        matched: index,
                        parent,
                    });
                }
            }
        }

        unreachable!("loop always returns on the last component")
    }

    fn located(&self, state: &VolumeState, path: &Path) -> Result<(DirRecord, DirRecord), FatError> {
        match self.find_file(state, path)? {
            Located::Found { record, parent } => Ok((record, parent)),
            Located::Missing { .. } => Err(FatError::FileNotFound),
        }
    }

    fn load_dir_records(
        &self,
        state: &VolumeState,
        dir: &DirRecord,
    ) -> Result<Vec<DirRecord>, FatError> {
        if dir.is_file {
            return Err(FatError::NotADir);
        }

        let cluster = self.read_cluster(state, dir.start_cluster)?;
        Ok(cluster
            .chunks_exact(config::fs::DIR_ENTRY_SIZE)
            .take(state.boot.max_dir_entries())
            .map(DirRecord::decode)
            .collect())
    }

    fn read_cluster(&self, state: &VolumeState, cluster: i32) -> Result<Vec<u8>, FatError> {
        let mut buf = vec![0u8; state.boot.cluster_bytes()];
        self.device
            .read_sectors(state.boot.cluster_to_sector(cluster), &mut buf)?;
        Ok(buf)
    }

    fn write_cluster(
        &self,
        state: &VolumeState,
        cluster: i32,
        data: &[u8],
    ) -> Result<(), FatError> {
        self.device
            .write_sectors(state.boot.cluster_to_sector(cluster), data)?;
        Ok(())
    }

    /// Copy `runs` of a chain into `out`, skipping `skip` bytes of the
    /// first cluster.
    fn read_chain(
        &self,
        state: &VolumeState,
        first_cluster: i32,
        mut skip: usize,
        out: &mut [u8],
    ) -> Result<usize, FatError> {
        let cluster_bytes = state.boot.cluster_bytes();
        let mut total = 0;

        for (run_start, run_len) in chain_runs(&state.fat, first_cluster) {
            if total == out.len() {
                break;
            }

            let run_bytes = run_len as usize * cluster_bytes;
            let mut buf = vec![0u8; run_bytes];
            self.device
                .read_sectors(state.boot.cluster_to_sector(run_start), &mut buf)?;

            let available = run_bytes - skip;
            let wanted = (out.len() - total).min(available);
            out[total..total + wanted].copy_from_slice(&buf[skip..skip + wanted]);
            total += wanted;
            skip = 0;
        }

        Ok(total)
    }

    /// Extend a chain by `add` clusters and zero them, so any gap left
    /// between the old end and a later write reads as zeros.
    fn grow_chain(
        &self,
        state: &mut VolumeState,
        start: i32,
        add: usize,
    ) -> Result<(), FatError> {
        if add == 0 {
            return Ok(());
        }
        let tail = last_chain_cluster(&state.fat, start);
        allocate_clusters(&mut state.fat, tail, add)?;

        let zeros = vec![0u8; state.boot.cluster_bytes()];
        let mut cursor = next_cluster(&state.fat, tail);
        for _ in 0..add {
            self.write_cluster(state, cursor, &zeros)?;
            cursor = next_cluster(&state.fat, cursor);
        }
        Ok(())
    }

    /// Rewrite one entry of `parent`, located by its current name. A
    /// zeroed replacement frees the slot.
    fn update_dir_entry(
        &self,
        state: &VolumeState,
        parent: &DirRecord,
        name: &str,
        replacement: &DirRecord,
    ) -> Result<(), FatError> {
        let mut cluster = self.read_cluster(state, parent.start_cluster)?;
        let entry_size = config::fs::DIR_ENTRY_SIZE;

        let slot = cluster
            .chunks_exact(entry_size)
            .take(state.boot.max_dir_entries())
            .position(|chunk| {
                let record = DirRecord::decode(chunk);
                !record.is_free() && record.name_str() == name
            })
            .ok_or(FatError::FileNotFound)?;

        cluster[slot * entry_size..(slot + 1) * entry_size]
            .copy_from_slice(&replacement.encode());
        self.write_cluster(state, parent.start_cluster, &cluster)
    }

    /// Persist the boot record and every FAT copy.
    fn flush_fat(&self, state: &VolumeState) -> Result<(), FatError> {
        flush_metadata(self.device.as_ref(), &state.boot, &state.fat)
    }

    fn write_file(
        &self,
        state: &mut VolumeState,
        record: &mut DirRecord,
        parent: &DirRecord,
        buf: &[u8],
        offset: u64,
    ) -> Result<usize, FatError> {
        if !record.is_file {
            return Err(FatError::NotAFile);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let end = offset + buf.len() as u64;
        if end > u64::from(u32::MAX) {
            return Err(FatError::FullDisk);
        }

        let cluster_bytes = state.boot.cluster_bytes() as u64;
        let allocated =
            count_chain_clusters(&state.fat, record.start_cluster) as u64 * cluster_bytes;

        // grow the chain far enough to cover the write; fresh clusters are
        // zeroed, which also covers any gap between the old end and the
        // write offset
        if end > allocated {
            let grow_by = (end - allocated).div_ceil(cluster_bytes) as usize;
            self.grow_chain(state, record.start_cluster, grow_by)?;
        }

        // payload: read-modify-write at the ragged edges, whole clusters
        // in between
        let mut cluster = cluster_by_offset(
            &state.fat,
            record.start_cluster,
            offset,
            cluster_bytes as usize,
        );
        let mut in_cluster = (offset % cluster_bytes) as usize;
        let mut written = 0;
        while written < buf.len() {
            let chunk = (cluster_bytes as usize - in_cluster).min(buf.len() - written);
            if chunk == cluster_bytes as usize {
                self.write_cluster(state, cluster, &buf[written..written + chunk])?;
            } else {
                let mut scratch = self.read_cluster(state, cluster)?;
                scratch[in_cluster..in_cluster + chunk]
                    .copy_from_slice(&buf[written..written + chunk]);
                self.write_cluster(state, cluster, &scratch)?;
            }
            written += chunk;
            in_cluster = 0;
            if written < buf.len() {
                cluster = next_cluster(&state.fat, cluster);
            }
        }

        if end > u64::from(record.size) {
            record.size = end as u32;
        }

        // both the data and the metadata are on disk before success
        self.update_dir_entry(state, parent, record.name_str(), record)?;
        self.flush_fat(state)?;

        Ok(written)
    }
}

impl FileSystem for FatVolume {
    fn query(&self, path: &Path) -> SysResult<FileInfo> {
        let state = self.state.lock();
        let (record, _) = self.located(&state, path)?;

        let mut attributes = FileAttributes::from_bits_truncate(u16::from(record.flags));
        if !record.is_file {
            attributes |= FileAttributes::DIRECTORY;
        }
        Ok(FileInfo {
            attributes,
            size: u64::from(record.size),
        })
    }

    fn read(&self, path: &Path, buf: &mut [u8], offset: u64) -> SysResult<usize> {
        let state = self.state.lock();
        let (record, _) = self.located(&state, path)?;

        if !record.is_file {
            return Err(FatError::NotAFile.into());
        }
        if offset >= u64::from(record.size) || buf.is_empty() {
            return Ok(0);
        }

        let cluster_bytes = state.boot.cluster_bytes();
        let wanted = (u64::from(record.size) - offset).min(buf.len() as u64) as usize;
        let first = cluster_by_offset(&state.fat, record.start_cluster, offset, cluster_bytes);
        let skip = (offset % cluster_bytes as u64) as usize;

        let read = self
            .read_chain(&state, first, skip, &mut buf[..wanted])
            .map_err(SysError::from)?;
        Ok(read)
    }

    fn read_dir(&self, path: &Path) -> SysResult<Vec<DirEntry>> {
        let state = self.state.lock();
        let (record, _) = self.located(&state, path)?;

        let items = self.load_dir_records(&state, &record)?;
        Ok(items
            .iter()
            .filter(|item| !item.is_free())
            .map(|item| {
                let mut attributes = FileAttributes::from_bits_truncate(u16::from(item.flags));
                if !item.is_file {
                    attributes |= FileAttributes::DIRECTORY;
                }
                DirEntry::new(attributes, item.name_str())
            })
            .collect())
    }

    fn write(&self, path: &Path, buf: &[u8], offset: u64) -> SysResult<usize> {
        let mut state = self.state.lock();
        let (mut record, parent) = self.located(&state, path)?;

        let written = self
            .write_file(&mut state, &mut record, &parent, buf, offset)
            .map_err(SysError::from)?;
        Ok(written)
    }

    fn create(&self, path: &Path, info: FileInfo) -> SysResult<()> {
        let components = path.components();
        if components.is_empty() {
            return Err(FatError::RootForbidden.into());
        }
        let name = components.last().unwrap();
        if name.len() >= MAX_NAME_LEN {
            return Err(FatError::FileNameTooLong.into());
        }

        let mut state = self.state.lock();
        let parent = match self.find_file(&state, path).map_err(SysError::from)? {
            Located::Found { .. } => return Err(FatError::FileAlreadyExists.into()),
            Located::Missing { matched, parent } if matched == components.len() - 1 => parent,
            Located::Missing { .. } => return Err(FatError::FileNotFound.into()),
        };

        let start_cluster = get_free_cluster(&state.fat);
        if start_cluster == NO_CLUSTER {
            return Err(FatError::FullDisk.into());
        }

        let mut record = DirRecord {
            name: [0; MAX_NAME_LEN],
            is_file: !info.is_directory(),
            flags: info.attributes.bits() as u8,
            size: 0,
            start_cluster,
        };
        record.set_name(name);

        // the new entry goes into the parent's first free slot
        let entry_size = config::fs::DIR_ENTRY_SIZE;
        let mut cluster = self
            .read_cluster(&state, parent.start_cluster)
            .map_err(SysError::from)?;
        let slot = cluster
            .chunks_exact(entry_size)
            .take(state.boot.max_dir_entries())
            .position(|chunk| DirRecord::decode(chunk).is_free())
            .ok_or(SysError::from(FatError::FullDir))?;
        cluster[slot * entry_size..(slot + 1) * entry_size].copy_from_slice(&record.encode());
        self.write_cluster(&state, parent.start_cluster, &cluster)
            .map_err(SysError::from)?;

        // fresh content reads as zeros whether file or directory
        let zeros = vec![0u8; state.boot.cluster_bytes()];
        self.write_cluster(&state, start_cluster, &zeros)
            .map_err(SysError::from)?;

        state.fat[start_cluster as usize] = if record.is_file {
            FAT_FILE_END
        } else {
            FAT_DIRECTORY
        };
        self.flush_fat(&state).map_err(SysError::from)?;

        log::debug!(
            "[FatVolume::create] {} at cluster {start_cluster}",
            path
        );
        Ok(())
    }

    fn resize(&self, path: &Path, size: u64) -> SysResult<()> {
        if path.components().is_empty() {
            return Err(FatError::RootForbidden.into());
        }
        if size > u64::from(u32::MAX) {
            return Err(FatError::FullDisk.into());
        }

        let mut state = self.state.lock();
        let (mut record, parent) = self.located(&state, path)?;
        if !record.is_file {
            return Err(FatError::NotAFile.into());
        }

        let cluster_bytes = state.boot.cluster_bytes() as u64;
        let have = count_chain_clusters(&state.fat, record.start_cluster);
        // even an empty file keeps its start cluster
        let need = (size.div_ceil(cluster_bytes) as usize).max(1);

        if need > have {
            self.grow_chain(&mut state, record.start_cluster, need - have)
                .map_err(SysError::from)?;
        } else if need < have {
            // cut the chain after the last kept cluster; freed data is not
            // zeroed
            let mut last_kept = record.start_cluster;
            for _ in 1..need {
                last_kept = next_cluster(&state.fat, last_kept);
            }
            let mut cursor = next_cluster(&state.fat, last_kept);
            state.fat[last_kept as usize] = FAT_FILE_END;
            while is_chain_link(cursor) {
                let following = next_cluster(&state.fat, cursor);
                if let Some(entry) = state.fat.get_mut(cursor as usize) {
                    *entry = FAT_UNUSED;
                }
                cursor = following;
            }
        }

        record.size = size as u32;
        self.update_dir_entry(&state, &parent, record.name_str(), &record)
            .map_err(SysError::from)?;
        self.flush_fat(&state).map_err(SysError::from)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> SysResult<()> {
        if path.components().is_empty() {
            return Err(FatError::RootForbidden.into());
        }

        let mut state = self.state.lock();
        let (record, parent) = self.located(&state, path)?;

        if !record.is_file {
            let items = self.load_dir_records(&state, &record).map_err(SysError::from)?;
            if items.iter().any(|item| !item.is_free()) {
                return Err(FatError::DirectoryNotEmpty.into());
            }
        }

        // free the slot, then the chain
        self.update_dir_entry(&state, &parent, record.name_str(), &DirRecord::default())
            .map_err(SysError::from)?;

        let mut cursor = record.start_cluster;
        loop {
            let following = next_cluster(&state.fat, cursor);
            if let Some(entry) = state.fat.get_mut(cursor as usize) {
                *entry = FAT_UNUSED;
            }
            if !is_chain_link(following) {
                break;
            }
            cursor = following;
        }

        self.flush_fat(&state).map_err(SysError::from)?;
        Ok(())
    }
}

/// Read and decode the boot record from sector 0.
pub fn load_boot_record(device: &dyn BlockDevice) -> Result<BootRecord, FatError> {
    let params = device.params();
    let sector = usize::from(params.bytes_per_sector);
    let sectors = BOOT_RECORD_SIZE.div_ceil(sector);
    if params.sector_count < sectors as u64 {
        return Err(FatError::IncompatibleDisk);
    }

    let mut buf = vec![0u8; sectors * sector];
    device.read_sectors(0, &mut buf)?;
    Ok(BootRecord::decode(&buf))
}

/// Load the first FAT copy described by `boot`.
pub fn load_fat(device: &dyn BlockDevice, boot: &BootRecord) -> Result<Vec<i32>, FatError> {
    let sector = usize::from(boot.bytes_per_sector);
    let covered = BOOT_RECORD_SIZE + boot.fat_bytes();
    let sectors = covered.div_ceil(sector);

    let mut buf = vec![0u8; sectors * sector];
    device.read_sectors(0, &mut buf)?;

    Ok(buf[BOOT_RECORD_SIZE..covered]
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn flush_metadata(
    device: &dyn BlockDevice,
    boot: &BootRecord,
    fat: &[i32],
) -> Result<(), FatError> {
    let sector = usize::from(boot.bytes_per_sector);
    let sectors = boot.first_data_sector() as usize;
    let mut buf = vec![0u8; sectors * sector];

    buf[..BOOT_RECORD_SIZE].copy_from_slice(&boot.encode());
    for copy in 0..usize::from(boot.fat_copies) {
        let base = BOOT_RECORD_SIZE + copy * boot.fat_bytes();
        for (index, entry) in fat.iter().enumerate() {
            buf[base + index * 4..base + index * 4 + 4]
                .copy_from_slice(&entry.to_le_bytes());
        }
    }

    device.write_sectors(0, &buf)?;
    Ok(())
}

/// Lay a fresh volume onto the device: pick the cluster size, fit the
/// largest FAT that still leaves room for its clusters, zero the root.
fn format(device: &dyn BlockDevice) -> Result<VolumeState, FatError> {
    let params = device.params();
    let sector = u64::from(params.bytes_per_sector);
    let disk_bytes = params.byte_size();

    let sectors_per_cluster = (PREFERRED_CLUSTER_BYTES as u64 / sector).clamp(1, 0xFFFF);
    let cluster_bytes = sectors_per_cluster * sector;

    if disk_bytes <= BOOT_RECORD_SIZE as u64 {
        return Err(FatError::IncompatibleDisk);
    }

    let fat_entry = 4 * u64::from(FAT_COPIES);
    let mut count = (disk_bytes - BOOT_RECORD_SIZE as u64) / (cluster_bytes + fat_entry);
    count = count.min(u64::from(u32::MAX));

    // shave clusters until metadata and data both fit the disk
    let base_sectors = |count: u64| {
        (BOOT_RECORD_SIZE as u64 + count * fat_entry).div_ceil(sector)
    };
    while count > 0
        && base_sectors(count) + count * sectors_per_cluster > params.sector_count
    {
        count -= 1;
    }
    if count == 0 {
        return Err(FatError::IncompatibleDisk);
    }

    let mut description = [0u8; DESCRIPTION_LEN];
    description[..VOLUME_DESCRIPTION.len()].copy_from_slice(VOLUME_DESCRIPTION.as_bytes());
    let mut signature = [0u8; SIGNATURE_LEN];
    signature[..VOLUME_SIGNATURE.len()].copy_from_slice(VOLUME_SIGNATURE.as_bytes());

    let boot = BootRecord {
        description,
        fat_type: 8,
        fat_copies: FAT_COPIES,
        sectors_per_cluster: sectors_per_cluster as u16,
        usable_cluster_count: count as u32,
        bytes_per_sector: params.bytes_per_sector,
        signature,
    };

    let mut fat = vec![FAT_UNUSED; count as usize];
    fat[ROOT_CLUSTER as usize] = FAT_DIRECTORY;

    flush_metadata(device, &boot, &fat)?;

    // the root directory starts empty
    let zeros = vec![0u8; boot.cluster_bytes()];
    device.write_sectors(boot.cluster_to_sector(ROOT_CLUSTER), &zeros)?;

    log::info!(
        "[fat::format] {} clusters of {} bytes, data at sector {}",
        count,
        boot.cluster_bytes(),
        boot.first_data_sector()
    );

    Ok(VolumeState { boot, fat })
}
