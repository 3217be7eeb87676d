use std::convert::TryFrom;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;

use crate::alloc::{self, Bitmap, NextAvailableAllocation};
use crate::io::{BlockStorage, FileBlockEmulator, FileBlockEmulatorBuilder};
use crate::node::{self, InodeTable, TABLE_SIZE};
use crate::sb::{SuperBlock, SB_SIZE};
use crate::{BLOCK_SIZE, NAME_LEN, RESERVED_BLOCKS, SB_MAGIC, TOTAL_BLOCKS};

use thiserror::Error;

/// Superblock followed by the inode table, written as one unit.
const HEADER_SIZE: usize = SB_SIZE + TABLE_SIZE;
const HEADER_BLOCKS: usize = (HEADER_SIZE + BLOCK_SIZE - 1) / BLOCK_SIZE;

const _: () = assert!(HEADER_BLOCKS <= RESERVED_BLOCKS);

#[derive(Error, Debug)]
pub enum FsError {
    #[error("file {0:?} already exists")]
    DuplicateName(String),
    #[error("inode table is full")]
    TableFull,
    #[error("no free data blocks left")]
    StoreExhausted,
    #[error("content of {len} bytes does not fit in a block (limit {})", BLOCK_SIZE - 1)]
    ContentTooLarge { len: usize },
    #[error("found no file named {0:?}")]
    NotFound(String),
    #[error("file name must be non-empty and contain no zero bytes")]
    InvalidName,
    #[error("file name of {len} bytes exceeds the {} byte limit", NAME_LEN - 1)]
    NameTooLong { len: usize },
    #[error("not a formatted image (magic {found:#x})")]
    BadMagic { found: u32 },
    #[error("image holds {found} blocks, expected {expected}")]
    Geometry { found: usize, expected: usize },
    #[error("inode points at block {index}, outside the data region")]
    BadBlockIndex { index: i32 },
    #[error("disk image I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// One live file as reported by `list`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub block_index: usize,
    pub size: usize,
}

/// Live files in inode slot order. Renders as `name,block,size;` per file, or
/// `NONE` when there are none.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing(Vec<FileEntry>);

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_entries(self) -> Vec<FileEntry> {
        self.0
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("NONE");
        }
        for entry in &self.0 {
            write!(f, "{},{},{};", entry.name, entry.block_index, entry.size)?;
        }
        Ok(())
    }
}

/// Outcome of the repair pass a mount runs when it finds the dirty flag set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recovery {
    /// Free block count found in the superblock.
    pub stored_free: u32,
    /// Free block count implied by the live inodes, now on disk.
    pub actual_free: u32,
}

impl Recovery {
    pub fn repaired(&self) -> bool {
        self.stored_free != self.actual_free
    }
}

/// Snapshot of the superblock counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub dirty: bool,
    pub files: usize,
}

/// A mounted image: the in-memory superblock and inode table plus the device they
/// came from.
///
/// # Layout
/// ==============================================================
/// | SuperBlock + Inodes | reserved | Data Region (one per file) |
/// ==============================================================
/// 0                     1          RESERVED_BLOCKS              TOTAL_BLOCKS
pub struct FlatFs<T: BlockStorage> {
    dev: T,
    super_block: SuperBlock,
    inodes: InodeTable,
    recovery: Option<Recovery>,
}

impl FlatFs<FileBlockEmulator> {
    /// Opens the image at `path`, formatting a new one if the file does not exist.
    pub fn mount<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Opening existing image {}.", path.display());
            let dev = FileBlockEmulator::open_disk(path, TOTAL_BLOCKS)?;
            return FlatFs::open(dev);
        }

        info!("No image at {}, formatting a new one.", path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        let dev = FileBlockEmulatorBuilder::from(file)
            .with_block_count(TOTAL_BLOCKS)
            // format zero fills the blocks itself.
            .clear_medium(false)
            .build();
        discard_on_error(path, dev.map_err(FsError::from).and_then(FlatFs::format))
    }
}

impl<T: BlockStorage> FlatFs<T> {
    /// Lays a fresh filesystem onto `dev`, zeroing every block.
    pub fn format(mut dev: T) -> Result<Self> {
        check_device(&dev)?;
        let zero = [0; BLOCK_SIZE];
        for blocknr in 0..TOTAL_BLOCKS {
            dev.write_block(blocknr, &zero)?;
        }

        let mut fs = FlatFs {
            dev,
            super_block: SuperBlock::new(),
            inodes: InodeTable::new(),
            recovery: None,
        };
        fs.persist()?;
        Ok(fs)
    }

    /// Loads the metadata header from `dev`, repairing it first if the previous
    /// session never cleared the dirty flag.
    pub fn open(mut dev: T) -> Result<Self> {
        check_device(&dev)?;
        let mut header = vec![0; HEADER_BLOCKS * BLOCK_SIZE];
        for (blocknr, chunk) in header.chunks_mut(BLOCK_SIZE).enumerate() {
            dev.read_block(blocknr, chunk)?;
        }

        let super_block = SuperBlock::parse(&header);
        if super_block.magic != SB_MAGIC {
            return Err(FsError::BadMagic {
                found: super_block.magic,
            });
        }
        if super_block.total_blocks as usize != TOTAL_BLOCKS {
            return Err(FsError::Geometry {
                found: super_block.total_blocks as usize,
                expected: TOTAL_BLOCKS,
            });
        }

        let mut fs = FlatFs {
            dev,
            super_block,
            inodes: InodeTable::parse(&header[SB_SIZE..]),
            recovery: None,
        };
        if fs.super_block.is_dirty() {
            fs.recovery = Some(fs.recover()?);
        }
        Ok(fs)
    }

    /// What the mount-time repair found, if the image was dirty.
    pub fn recovery(&self) -> Option<&Recovery> {
        self.recovery.as_ref()
    }

    pub fn stat(&self) -> Stat {
        Stat {
            total_blocks: self.super_block.total_blocks,
            free_blocks: self.super_block.free_blocks,
            dirty: self.super_block.is_dirty(),
            files: self.inodes.used_count(),
        }
    }

    /// Stores `content` as a new file and returns the data block it landed in.
    pub fn create(&mut self, name: &str, content: &[u8]) -> Result<usize> {
        let encoded = node::encode_name(name)?;
        if self.inodes.find(name).is_some() {
            return Err(FsError::DuplicateName(name.to_string()));
        }
        let slot = alloc::find_free_inode(&self.inodes).ok_or(FsError::TableFull)?;
        let block = alloc::find_free_block(&self.inodes).ok_or(FsError::StoreExhausted)?;
        check_content(content)?;
        debug!("Allocated inode {} and block {} for {:?}.", slot, block, name);

        self.begin()?;
        self.write_content(block, content)?;
        self.inodes.get_mut(slot).occupy(encoded, content.len(), block);
        self.super_block.free_blocks -= 1;
        self.commit()?;

        info!("Created {:?} ({} bytes) at block {}.", name, content.len(), block);
        Ok(block)
    }

    /// Returns exactly the `size` bytes of content stored for `name`.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let slot = self.lookup(name)?;
        let node = *self.inodes.get(slot);

        let mut buf = vec![0; BLOCK_SIZE];
        self.dev.read_block(data_block(node.block())?, &mut buf)?;
        buf.truncate(node.size().min(BLOCK_SIZE));
        Ok(buf)
    }

    /// Rewrites the content of `name` in place, keeping its block.
    pub fn update(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let slot = self.lookup(name)?;
        check_content(content)?;
        let block = data_block(self.inodes.get(slot).block())?;

        self.begin()?;
        self.write_content(block, content)?;
        self.inodes.get_mut(slot).set_size(content.len());
        self.commit()?;

        info!("Updated {:?} ({} bytes) at block {}.", name, content.len(), block);
        Ok(())
    }

    /// Frees the inode of `name`. The block content stays on disk until reused.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let slot = self.lookup(name)?;

        self.begin()?;
        self.inodes.get_mut(slot).release();
        self.super_block.free_blocks += 1;
        self.commit()?;

        info!("Deleted {:?}.", name);
        Ok(())
    }

    pub fn list(&self) -> Listing {
        Listing(
            self.inodes
                .iter_used()
                .map(|(_, node)| FileEntry {
                    name: node.name().into_owned(),
                    block_index: node.block() as usize,
                    size: node.size(),
                })
                .collect(),
        )
    }

    /// Packs every live file into a contiguous run of blocks starting at
    /// RESERVED_BLOCKS, and their inodes into the leading slots, both in the
    /// current slot order. Returns how many files were rewritten.
    pub fn compact(&mut self) -> Result<usize> {
        self.begin()?;

        let mut files = Vec::with_capacity(self.inodes.used_count());
        for (_, node) in self.inodes.iter_used() {
            let mut content = vec![0; BLOCK_SIZE];
            self.dev.read_block(data_block(node.block())?, &mut content)?;
            files.push((*node, content));
        }

        self.inodes.clear();
        let mut blocks = NextAvailableAllocation::new(Bitmap::new());
        for (slot, (node, content)) in files.iter().enumerate() {
            let block = blocks.next().ok_or(FsError::StoreExhausted)?;
            self.dev.write_block(block, content)?;
            debug!("Moved {:?} from block {} to {}.", node.name(), node.block(), block);

            let target = self.inodes.get_mut(slot);
            *target = *node;
            target.relocate(block);
        }
        self.commit()?;

        info!("Compacted {} files.", files.len());
        Ok(files.len())
    }

    /// Marks the image dirty and abandons the session without ever clearing the
    /// flag, exactly as if the process died mid-mutation. The next mount repairs it.
    pub fn force_halt(mut self) -> Result<()> {
        self.super_block.set_dirty(true);
        self.persist()?;
        warn!("Halting with the dirty flag set.");
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.inodes
            .find(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// Recomputes the free block count from the live inodes and clears the dirty flag.
    fn recover(&mut self) -> Result<Recovery> {
        warn!("Unclean shutdown detected, checking free block count.");
        let report = Recovery {
            stored_free: self.super_block.free_blocks,
            actual_free: SuperBlock::expected_free(self.inodes.used_count()),
        };
        if report.repaired() {
            info!(
                "Repaired free block count: {} -> {}.",
                report.stored_free, report.actual_free
            );
            self.super_block.free_blocks = report.actual_free;
        }
        self.super_block.set_dirty(false);
        self.persist()?;
        Ok(report)
    }

    /// Announces a mutation in progress.
    fn begin(&mut self) -> Result<()> {
        self.super_block.set_dirty(true);
        self.persist()
    }

    /// Announces the mutation complete and the header consistent again.
    fn commit(&mut self) -> Result<()> {
        self.super_block.set_dirty(false);
        self.persist()
    }

    /// Writes the superblock and inode table as a single header at block 0.
    fn persist(&mut self) -> Result<()> {
        let mut header = vec![0; HEADER_BLOCKS * BLOCK_SIZE];
        header[..SB_SIZE].copy_from_slice(self.super_block.serialize());
        self.inodes.serialize_into(&mut header[SB_SIZE..]);

        for (blocknr, chunk) in header.chunks(BLOCK_SIZE).enumerate() {
            self.dev.write_block(blocknr, chunk)?;
        }
        self.dev.sync_disk()?;
        Ok(())
    }

    fn write_content(&mut self, block: usize, content: &[u8]) -> Result<()> {
        let mut buf = [0; BLOCK_SIZE];
        buf[..content.len()].copy_from_slice(content);
        self.dev.write_block(block, &buf)?;
        Ok(())
    }
}

/// Removes a half-formatted image so the next mount formats it again instead of
/// failing on its missing magic.
fn discard_on_error<T>(path: &Path, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!("Formatting {} failed ({}), removing it.", path.display(), e);
        if let Err(rm) = std::fs::remove_file(path) {
            warn!("Could not remove {}: {}; delete it by hand.", path.display(), rm);
        }
    }
    result
}

fn check_device<T: BlockStorage>(dev: &T) -> Result<()> {
    if dev.block_count() < TOTAL_BLOCKS {
        return Err(FsError::Geometry {
            found: dev.block_count(),
            expected: TOTAL_BLOCKS,
        });
    }
    Ok(())
}

/// One byte of every block is kept for the terminator.
fn check_content(content: &[u8]) -> Result<()> {
    if content.len() >= BLOCK_SIZE {
        return Err(FsError::ContentTooLarge { len: content.len() });
    }
    Ok(())
}

/// Converts a stored block index into a data block number, refusing anything
/// outside the data region.
fn data_block(index: i32) -> Result<usize> {
    match usize::try_from(index) {
        Ok(block) if (RESERVED_BLOCKS..TOTAL_BLOCKS).contains(&block) => Ok(block),
        _ => Err(FsError::BadBlockIndex { index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_device() -> FileBlockEmulator {
        let dev = tempfile::tempfile().unwrap();
        FileBlockEmulatorBuilder::from(dev)
            .with_block_count(TOTAL_BLOCKS)
            .build()
            .expect("Could not initialize disk emulator.")
    }

    fn check_free_count<T: BlockStorage>(fs: &FlatFs<T>) {
        let stat = fs.stat();
        assert!(!stat.dirty);
        assert_eq!(stat.free_blocks, SuperBlock::expected_free(stat.files));
    }

    /// Passes everything through except data block writes, which fail once armed,
    /// cutting a mutation short after its header announced it.
    struct FailingDataWrites {
        inner: FileBlockEmulator,
        armed: bool,
    }

    impl BlockStorage for FailingDataWrites {
        fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize) -> std::io::Result<Self> {
            Ok(FailingDataWrites {
                inner: FileBlockEmulator::open_disk(path, nblocks)?,
                armed: false,
            })
        }

        fn read_block(&mut self, blocknr: usize, buf: &mut [u8]) -> std::io::Result<()> {
            self.inner.read_block(blocknr, buf)
        }

        fn write_block(&mut self, blocknr: usize, buf: &[u8]) -> std::io::Result<()> {
            if self.armed && blocknr >= RESERVED_BLOCKS {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"));
            }
            self.inner.write_block(blocknr, buf)
        }

        fn sync_disk(&mut self) -> std::io::Result<()> {
            self.inner.sync_disk()
        }

        fn block_count(&self) -> usize {
            self.inner.block_count()
        }
    }

    /// Formats an image holding "a" and "b", then reopens it with data writes failing.
    fn interrupted_image() -> (tempfile::NamedTempFile, FlatFs<FailingDataWrites>) {
        let disk = tempfile::NamedTempFile::new().unwrap();
        let dev = FileBlockEmulatorBuilder::from(disk.reopen().unwrap())
            .with_block_count(TOTAL_BLOCKS)
            .build()
            .unwrap();
        let mut fs = FlatFs::format(dev).unwrap();
        fs.create("a", b"alpha").unwrap();
        fs.create("b", b"beta").unwrap();
        fs.delete("a").unwrap();
        drop(fs);

        let mut dev = FailingDataWrites::open_disk(disk.path(), TOTAL_BLOCKS).unwrap();
        dev.armed = true;
        (disk, FlatFs::open(dev).unwrap())
    }

    /// Remounts after a failed mutation and checks the flag was on disk and that
    /// nothing but the flag changed.
    fn assert_interrupted_mutation_recovers(disk: &tempfile::NamedTempFile) {
        let dev = FileBlockEmulator::open_disk(disk.path(), TOTAL_BLOCKS).unwrap();
        let mut fs = FlatFs::open(dev).unwrap();

        let recovery = *fs.recovery().expect("dirty flag was not persisted");
        assert!(!recovery.repaired());
        assert_eq!(fs.list().to_string(), "b,6,4;");
        assert_eq!(fs.read("b").unwrap(), b"beta");
        check_free_count(&fs);
        assert_eq!(fs.stat().free_blocks, SuperBlock::expected_free(1));
    }

    #[test]
    fn failed_create_leaves_image_dirty() {
        let (disk, mut fs) = interrupted_image();
        assert!(matches!(fs.create("c", b"gamma"), Err(FsError::Io(_))));
        drop(fs);
        assert_interrupted_mutation_recovers(&disk);
    }

    #[test]
    fn failed_update_leaves_image_dirty() {
        let (disk, mut fs) = interrupted_image();
        assert!(matches!(fs.update("b", b"changed"), Err(FsError::Io(_))));
        drop(fs);
        assert_interrupted_mutation_recovers(&disk);
    }

    #[test]
    fn failed_compact_leaves_image_dirty() {
        let (disk, mut fs) = interrupted_image();
        assert!(matches!(fs.compact(), Err(FsError::Io(_))));
        drop(fs);
        assert_interrupted_mutation_recovers(&disk);
    }

    #[test]
    fn failed_format_removes_partial_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vdisk.dat");
        std::fs::write(&path, b"partial").unwrap();

        let failed: Result<()> = Err(FsError::StoreExhausted);
        assert!(discard_on_error(&path, failed).is_err());
        assert!(!path.exists());

        std::fs::write(&path, b"kept").unwrap();
        assert!(discard_on_error(&path, Ok(())).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn mount_after_discarded_format_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vdisk.dat");
        let _ = discard_on_error::<()>(&path, Err(FsError::StoreExhausted));

        let fs = FlatFs::mount(&path).unwrap();
        assert_eq!(fs.stat().free_blocks, SuperBlock::expected_free(0));
    }

    #[test]
    fn formatted_filesystem_is_empty_and_clean() {
        let fs = FlatFs::format(create_test_device()).unwrap();
        assert_eq!(
            fs.stat(),
            Stat {
                total_blocks: TOTAL_BLOCKS as u32,
                free_blocks: (TOTAL_BLOCKS - RESERVED_BLOCKS) as u32,
                dirty: false,
                files: 0,
            }
        );
        assert!(fs.list().is_empty());
        assert!(fs.recovery().is_none());
    }

    #[test]
    fn create_then_read_returns_content() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        assert_eq!(fs.create("a", b"hello").unwrap(), RESERVED_BLOCKS);
        assert_eq!(fs.read("a").unwrap(), b"hello");
        check_free_count(&fs);
    }

    #[test]
    fn read_is_trimmed_to_size_and_keeps_zero_bytes() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        fs.create("bin", b"a\0b\0").unwrap();
        assert_eq!(fs.read("bin").unwrap(), b"a\0b\0");

        fs.create("empty", b"").unwrap();
        assert_eq!(fs.read("empty").unwrap(), b"");
    }

    #[test]
    fn duplicate_name_leaves_table_unchanged() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        fs.create("a", b"hello").unwrap();
        let before = fs.list();

        match fs.create("a", b"x").unwrap_err() {
            FsError::DuplicateName(name) => assert_eq!(name, "a"),
            e => panic!("Unexpected error type {:?}.", e),
        }
        assert_eq!(fs.list(), before);
        assert_eq!(fs.read("a").unwrap(), b"hello");
        check_free_count(&fs);
    }

    #[test]
    fn full_table_rejects_create() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        for i in 0..crate::MAX_FILES {
            fs.create(&format!("f{}", i), b"x").unwrap();
        }
        assert!(matches!(fs.create("extra", b"x"), Err(FsError::TableFull)));
        check_free_count(&fs);
    }

    #[test]
    fn oversized_content_is_rejected_without_writing() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        let big = vec![b'z'; BLOCK_SIZE];
        match fs.create("big", &big).unwrap_err() {
            FsError::ContentTooLarge { len } => assert_eq!(len, BLOCK_SIZE),
            e => panic!("Unexpected error type {:?}.", e),
        }
        assert!(fs.list().is_empty());

        fs.create("a", b"hello").unwrap();
        assert!(matches!(
            fs.update("a", &big),
            Err(FsError::ContentTooLarge { .. })
        ));
        assert_eq!(fs.read("a").unwrap(), b"hello");

        // The largest content that still fits.
        let max = vec![b'y'; BLOCK_SIZE - 1];
        fs.update("a", &max).unwrap();
        assert_eq!(fs.read("a").unwrap(), max);
    }

    #[test]
    fn update_rewrites_in_place() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        fs.create("a", b"first version").unwrap();
        fs.create("b", b"other").unwrap();

        fs.update("a", b"v2").unwrap();
        assert_eq!(fs.read("a").unwrap(), b"v2");
        let entries = fs.list().into_entries();
        assert_eq!(entries[0].block_index, RESERVED_BLOCKS);
        assert_eq!(entries[0].size, 2);
        check_free_count(&fs);

        assert!(matches!(fs.update("missing", b"x"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn delete_then_read_is_not_found() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        fs.create("a", b"hello").unwrap();
        fs.delete("a").unwrap();

        assert!(matches!(fs.read("a"), Err(FsError::NotFound(_))));
        assert!(matches!(fs.delete("a"), Err(FsError::NotFound(_))));
        assert_eq!(fs.stat().free_blocks, 45);
    }

    #[test]
    fn deleted_block_is_reused_lowest_first() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        fs.create("a", b"1").unwrap();
        fs.create("b", b"2").unwrap();
        fs.create("c", b"3").unwrap();
        fs.delete("b").unwrap();

        assert_eq!(fs.create("d", b"4").unwrap(), RESERVED_BLOCKS + 1);
        // "d" took the freed slot 1, so it lists before "c".
        assert_eq!(fs.list().to_string(), "a,5,1;d,6,1;c,7,1;");
    }

    #[test]
    fn listing_uses_none_sentinel() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        assert_eq!(fs.list().to_string(), "NONE");
        fs.create("a", b"hello").unwrap();
        assert_eq!(fs.list().to_string(), "a,5,5;");
    }

    #[test]
    fn compact_packs_files_and_keeps_content() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        for (name, content) in &[("a", "alpha"), ("b", "beta"), ("c", "gamma"), ("d", "delta")] {
            fs.create(name, content.as_bytes()).unwrap();
        }
        fs.delete("a").unwrap();
        fs.delete("c").unwrap();

        assert_eq!(fs.compact().unwrap(), 2);

        assert_eq!(fs.list().to_string(), "b,5,4;d,6,5;");
        assert_eq!(fs.read("b").unwrap(), b"beta");
        assert_eq!(fs.read("d").unwrap(), b"delta");
        check_free_count(&fs);

        // The next allocation follows the packed run.
        assert_eq!(fs.create("e", b"eps").unwrap(), RESERVED_BLOCKS + 2);
    }

    #[test]
    fn compacting_empty_filesystem_is_a_no_op() {
        let mut fs = FlatFs::format(create_test_device()).unwrap();
        assert_eq!(fs.compact().unwrap(), 0);
        assert!(fs.list().is_empty());
        check_free_count(&fs);
    }

    #[test]
    fn unformatted_device_is_rejected() {
        match FlatFs::open(create_test_device()) {
            Err(FsError::BadMagic { found }) => assert_eq!(found, 0),
            Err(e) => panic!("Unexpected error type {:?}.", e),
            Ok(_) => panic!("Opened an unformatted device."),
        }
    }

    #[test]
    fn undersized_device_is_rejected() {
        let dev = FileBlockEmulatorBuilder::from(tempfile::tempfile().unwrap())
            .with_block_count(RESERVED_BLOCKS)
            .build()
            .unwrap();
        assert!(matches!(
            FlatFs::format(dev),
            Err(FsError::Geometry { found: RESERVED_BLOCKS, .. })
        ));
    }

    #[test]
    fn header_is_a_single_block() {
        assert_eq!(HEADER_SIZE, 456);
        assert_eq!(HEADER_BLOCKS, 1);
    }

    #[test]
    fn stored_block_index_outside_data_region_is_refused() {
        for &index in &[-1, 0, TOTAL_BLOCKS as i32] {
            match data_block(index) {
                Err(FsError::BadBlockIndex { index: found }) => assert_eq!(found, index),
                other => panic!("Unexpected result {:?}.", other),
            }
        }
        assert_eq!(data_block(RESERVED_BLOCKS as i32).unwrap(), RESERVED_BLOCKS);
    }
}
