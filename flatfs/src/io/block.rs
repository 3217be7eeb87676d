use std::path::Path;

/// The block number to access ranging from 0 (the first block) to n - 1 (the last
/// block) where n is number of blocks available.
pub type BlockNumber = usize;

/// Whole-block positioned access to a backing medium.
///
/// Block numbers outside `0..block_count()` are a caller bug; implementations
/// report them as `InvalidInput` rather than touching the medium.
pub trait BlockStorage {
    /// Opens an existing disk at the specified path. This method does not validate the
    /// storage blocks, it is up for clients to ensure disks are appropriately initialized.
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized;
    /// Reads disk block number into the first block-size bytes of `buf`.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range, or into a buffer smaller than a
    /// block, will return an error.
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Writes provided buffer into the specified block number.
    ///
    /// # Errors
    ///
    /// Attempting to write a block out of range will return an error.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()>;
    /// Flush any buffered disk IO from memory. The dirty flag protocol relies on
    /// this to order the "in progress" marker before the mutation it covers.
    fn sync_disk(&mut self) -> std::io::Result<()>;
    /// Number of blocks the medium holds.
    fn block_count(&self) -> usize;
}
