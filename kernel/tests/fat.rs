//! FAT volume: formatting, the on-disk layout, file and directory
//! operations, persistence across mounts.

use std::sync::Arc;

use driver::RamDisk;
use kernel::fs::fat::layout::{FAT_DIRECTORY, FAT_UNUSED};
use kernel::fs::fat::{load_boot_record, load_fat, FatVolume, VOLUME_SIGNATURE};
use kernel::fs::path::Path;
use kernel::fs::FileSystem;
use systype::{FileAttributes, FileInfo, SysError};

fn fresh_volume(disk_bytes: usize) -> (Arc<RamDisk>, Arc<FatVolume>) {
    logging::init();
    let disk = Arc::new(RamDisk::new(disk_bytes, 512));
    let volume = FatVolume::mount(disk.clone()).expect("format");
    (disk, volume)
}

fn file_info() -> FileInfo {
    FileInfo::default()
}

fn dir_info() -> FileInfo {
    FileInfo {
        attributes: FileAttributes::DIRECTORY,
        size: 0,
    }
}

#[test]
fn format_writes_what_load_reads_back() {
    let (disk, _volume) = fresh_volume(1024 * 1024);

    let boot = load_boot_record(disk.as_ref()).unwrap();
    assert!(boot.is_valid(512));
    assert_eq!(boot.bytes_per_sector, 512);
    assert_eq!(boot.sectors_per_cluster, 2); // 1024-byte clusters
    assert_eq!(boot.fat_copies, 1);
    assert_eq!(
        &boot.signature[..VOLUME_SIGNATURE.len()],
        VOLUME_SIGNATURE.as_bytes()
    );

    // metadata and clusters both fit the disk
    let used = boot.first_data_sector()
        + u64::from(boot.usable_cluster_count) * u64::from(boot.sectors_per_cluster);
    assert!(used <= 2048);

    let fat = load_fat(disk.as_ref(), &boot).unwrap();
    assert_eq!(fat.len(), boot.usable_cluster_count as usize);
    assert_eq!(fat[0], FAT_DIRECTORY);
    assert!(fat[1..].iter().all(|&entry| entry == FAT_UNUSED));
}

#[test]
fn mounting_twice_does_not_reformat() {
    let (disk, volume) = fresh_volume(1024 * 1024);

    let path = Path::parse("A:\\keep.txt");
    volume.create(&path, file_info()).unwrap();
    volume.write(&path, b"still here", 0).unwrap();
    drop(volume);

    let volume = FatVolume::mount(disk).expect("remount");
    let mut buf = [0u8; 16];
    assert_eq!(volume.read(&path, &mut buf, 0).unwrap(), 10);
    assert_eq!(&buf[..10], b"still here");
}

#[test]
fn sparse_write_reads_back_with_zero_gap() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    let path = Path::parse("A:\\f.txt");
    volume.create(&path, file_info()).unwrap();

    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(volume.write(&path, &payload, 0).unwrap(), 3000);

    let tail = [0xA1, 0xB2, 0xC3, 0xD4, 0xE5];
    assert_eq!(volume.write(&path, &tail, 8000).unwrap(), 5);

    assert_eq!(volume.query(&path).unwrap().size, 8005);

    let mut buf = vec![0xFFu8; 10_000];
    assert_eq!(volume.read(&path, &mut buf, 0).unwrap(), 8005);
    assert_eq!(&buf[..3000], &payload[..]);
    assert!(buf[3000..8000].iter().all(|&b| b == 0), "gap must be zeros");
    assert_eq!(&buf[8000..8005], &tail);
}

#[test]
fn reads_respect_offset_and_size() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    let path = Path::parse("A:\\data.bin");
    volume.create(&path, file_info()).unwrap();
    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 241) as u8).collect();
    volume.write(&path, &payload, 0).unwrap();

    // offset inside the file, buffer larger than the remainder
    let mut buf = vec![0u8; 4096];
    let read = volume.read(&path, &mut buf, 2500).unwrap();
    assert_eq!(read, 2500);
    assert_eq!(&buf[..2500], &payload[2500..]);

    // offset at and past the end
    assert_eq!(volume.read(&path, &mut buf, 5000).unwrap(), 0);
    assert_eq!(volume.read(&path, &mut buf, 9999).unwrap(), 0);
}

#[test]
fn directories_nest_and_list() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    volume.create(&Path::parse("A:\\docs"), dir_info()).unwrap();
    volume
        .create(&Path::parse("A:\\docs\\inner"), dir_info())
        .unwrap();
    volume
        .create(&Path::parse("A:\\docs\\inner\\note.txt"), file_info())
        .unwrap();
    volume
        .write(&Path::parse("A:\\docs\\inner\\note.txt"), b"hi", 0)
        .unwrap();

    let root = volume.read_dir(&Path::parse("A:\\")).unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].name(), "docs");
    assert!(root[0].is_directory());

    let inner = volume.read_dir(&Path::parse("A:\\docs\\inner")).unwrap();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].name(), "note.txt");
    assert!(!inner[0].is_directory());

    let info = volume
        .query(&Path::parse("A:\\docs\\inner\\note.txt"))
        .unwrap();
    assert_eq!(info.size, 2);
    assert!(!info.is_directory());
}

#[test]
fn path_shape_errors() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    volume.create(&Path::parse("A:\\file"), file_info()).unwrap();

    // a file in the middle of a path
    assert_eq!(
        volume.query(&Path::parse("A:\\file\\below")),
        Err(SysError::InvalidArgument)
    );

    // missing parent
    assert_eq!(
        volume.create(&Path::parse("A:\\nodir\\x"), file_info()),
        Err(SysError::FileNotFound)
    );

    // duplicate create
    assert_eq!(
        volume.create(&Path::parse("A:\\file"), file_info()),
        Err(SysError::InvalidArgument)
    );

    // the root itself
    assert_eq!(
        volume.create(&Path::parse("A:\\"), dir_info()),
        Err(SysError::InvalidArgument)
    );

    // the name field holds 11 characters plus the terminator
    assert_eq!(
        volume.create(&Path::parse("A:\\twelve_chars"), file_info()),
        Err(SysError::InvalidArgument)
    );
    volume
        .create(&Path::parse("A:\\elevenchars"), file_info())
        .unwrap();
}

#[test]
fn resize_grows_and_truncates() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    let path = Path::parse("A:\\sz");
    volume.create(&path, file_info()).unwrap();
    let payload = vec![7u8; 4000];
    volume.write(&path, &payload, 0).unwrap();

    volume.resize(&path, 1500).unwrap();
    assert_eq!(volume.query(&path).unwrap().size, 1500);
    let mut buf = vec![0u8; 4096];
    assert_eq!(volume.read(&path, &mut buf, 0).unwrap(), 1500);
    assert!(buf[..1500].iter().all(|&b| b == 7));

    // shrinking to zero keeps the file openable and writable
    volume.resize(&path, 0).unwrap();
    assert_eq!(volume.query(&path).unwrap().size, 0);
    volume.write(&path, b"again", 0).unwrap();
    assert_eq!(volume.read(&path, &mut buf, 0).unwrap(), 5);
    assert_eq!(&buf[..5], b"again");

    // growing a fresh file reads back as zeros past its content
    let fresh = Path::parse("A:\\fresh");
    volume.create(&fresh, file_info()).unwrap();
    volume.write(&fresh, b"again", 0).unwrap();
    volume.resize(&fresh, 3000).unwrap();
    assert_eq!(volume.query(&fresh).unwrap().size, 3000);
    assert_eq!(volume.read(&fresh, &mut buf, 0).unwrap(), 3000);
    assert_eq!(&buf[..5], b"again");
    assert!(buf[5..3000].iter().all(|&b| b == 0));
}

#[test]
fn delete_frees_clusters_for_reuse() {
    // a tiny disk: a handful of clusters
    let (_disk, volume) = fresh_volume(64 * 1024);

    let path = Path::parse("A:\\big");
    volume.create(&path, file_info()).unwrap();
    let payload = vec![1u8; 40 * 1024];
    volume.write(&path, &payload, 0).unwrap();

    // no room for a second file of the same size
    let other = Path::parse("A:\\other");
    volume.create(&other, file_info()).unwrap();
    assert_eq!(
        volume.write(&other, &payload, 0),
        Err(SysError::NotEnoughDiskSpace)
    );

    volume.remove(&path).unwrap();
    assert_eq!(volume.query(&path), Err(SysError::FileNotFound));

    // the freed clusters are usable again
    assert_eq!(volume.write(&other, &payload, 0).unwrap(), payload.len());
}

#[test]
fn remove_refuses_nonempty_directories() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    volume.create(&Path::parse("A:\\d"), dir_info()).unwrap();
    volume
        .create(&Path::parse("A:\\d\\child"), file_info())
        .unwrap();

    assert_eq!(
        volume.remove(&Path::parse("A:\\d")),
        Err(SysError::DirectoryNotEmpty)
    );

    volume.remove(&Path::parse("A:\\d\\child")).unwrap();
    volume.remove(&Path::parse("A:\\d")).unwrap();
    assert_eq!(
        volume.query(&Path::parse("A:\\d")),
        Err(SysError::FileNotFound)
    );
}

#[test]
fn a_disk_too_small_for_metadata_fails_to_mount() {
    logging::init();
    let disk = Arc::new(RamDisk::new(256, 256));
    assert!(FatVolume::mount(disk).is_err());
}

#[test]
fn full_directory_reports_out_of_space() {
    let (_disk, volume) = fresh_volume(1024 * 1024);

    // one cluster of 1024 bytes holds 42 directory entries
    let capacity = 1024 / 24;
    for index in 0..capacity {
        volume
            .create(&Path::parse(&format!("A:\\f{index}")), file_info())
            .unwrap();
    }
    assert_eq!(
        volume.create(&Path::parse("A:\\overflow"), file_info()),
        Err(SysError::NotEnoughDiskSpace)
    );
}
