use crate::{RESERVED_BLOCKS, SB_MAGIC, TOTAL_BLOCKS};
use zerocopy::{AsBytes, FromBytes};

/// Encoded length of a superblock record.
pub const SB_SIZE: usize = std::mem::size_of::<SuperBlock>();

/// The global record at offset 0 of the image, identifying the disk as formatted and
/// carrying the allocation counter plus the dirty flag.
///
/// Fields are laid out exactly as a natively packed C struct of three 32-bit integers
/// and a bool, so the padding after `dirty` is spelled out rather than left to the
/// compiler.
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Clone, Copy, PartialEq)]
pub struct SuperBlock {
    /// A 32-bit identifying constant, `SB_MAGIC` on a formatted image.
    pub magic: u32,
    /// Capacity of the image, reserved blocks included.
    pub total_blocks: u32,
    /// Blocks available to new files. Excludes the reserved blocks.
    pub free_blocks: u32,
    /// Non-zero while a mutation is in flight.
    dirty: u8,
    _pad: [u8; 3],
}

impl SuperBlock {
    /// A freshly formatted superblock: everything outside the reserved region is free.
    pub fn new() -> Self {
        Self {
            magic: SB_MAGIC,
            total_blocks: TOTAL_BLOCKS as u32,
            free_blocks: (TOTAL_BLOCKS - RESERVED_BLOCKS) as u32,
            dirty: 0,
            _pad: [0; 3],
        }
    }

    /// Reads the superblock from the front of `buf` without validating it.
    /// Passing a buffer shorter than a record will result in a panic.
    pub fn parse(buf: &[u8]) -> Self {
        assert!(
            buf.len() >= SB_SIZE,
            "Length of buffer to parse must hold a superblock."
        );
        let mut sb = Self::new();
        sb.as_bytes_mut().copy_from_slice(&buf[..SB_SIZE]);
        sb
    }

    pub fn serialize(&self) -> &[u8] {
        self.as_bytes()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty as u8;
    }

    /// The free count implied by `used` live inodes.
    pub fn expected_free(used: usize) -> u32 {
        (TOTAL_BLOCKS - RESERVED_BLOCKS - used) as u32
    }
}
