use crate::node::InodeTable;
use crate::{RESERVED_BLOCKS, TOTAL_BLOCKS};

const WORDS: usize = (TOTAL_BLOCKS + 63) / 64;

#[derive(Debug, PartialEq)]
pub enum State {
    Free,
    Used,
}

/// One bit per block of the image. Never persisted: it is rebuilt from the inode
/// table whenever an allocation decision is needed.
#[derive(Clone, Copy)]
pub struct Bitmap {
    bitmap: [u64; WORDS],
}

impl Bitmap {
    /// A map with only the reserved region marked used.
    pub fn new() -> Self {
        let mut bmp = Self { bitmap: [0; WORDS] };
        for blocknr in 0..RESERVED_BLOCKS {
            bmp.set_reserved(blocknr);
        }
        bmp
    }

    /// Occupancy implied by the live inodes. Block indices outside the image are
    /// skipped rather than trusted.
    pub fn from_table(table: &InodeTable) -> Self {
        let mut bmp = Self::new();
        for (_, node) in table.iter_used() {
            let block = node.block();
            if block >= 0 && (block as usize) < TOTAL_BLOCKS {
                bmp.set_reserved(block as usize);
            }
        }
        bmp
    }

    pub fn get(&self, blocknr: usize) -> State {
        assert!(blocknr < TOTAL_BLOCKS);
        let inner_offset = blocknr % 64;
        match (self.bitmap[blocknr / 64] >> inner_offset) & 0b01 {
            0 => State::Free,
            _ => State::Used,
        }
    }

    pub fn set_reserved(&mut self, blocknr: usize) {
        assert!(blocknr < TOTAL_BLOCKS);
        self.bitmap[blocknr / 64] |= 0b01_u64 << (blocknr % 64);
    }
}

/// Hands out free data blocks in increasing order. The first call on a map built
/// from the inode table yields the lowest free data block; successive calls on a
/// fresh map yield a contiguous run starting at RESERVED_BLOCKS, which is what
/// compaction relies on.
pub struct NextAvailableAllocation {
    /// Keeps track of the next starting place for looking for available blocks.
    marker: usize,
    bitmap: Bitmap,
}

impl NextAvailableAllocation {
    pub fn new(bitmap: Bitmap) -> Self {
        Self {
            marker: RESERVED_BLOCKS,
            bitmap,
        }
    }
}

impl Iterator for NextAvailableAllocation {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        for i in self.marker..TOTAL_BLOCKS {
            if let State::Free = self.bitmap.get(i) {
                self.bitmap.set_reserved(i);
                self.marker = i + 1;
                return Some(i);
            }
        }
        self.marker = TOTAL_BLOCKS;
        None
    }
}

/// Lowest free inode slot.
pub fn find_free_inode(table: &InodeTable) -> Option<usize> {
    table
        .iter()
        .find(|(_, node)| !node.is_used())
        .map(|(slot, _)| slot)
}

/// Lowest data block no live inode points at.
pub fn find_free_block(table: &InodeTable) -> Option<usize> {
    NextAvailableAllocation::new(Bitmap::from_table(table)).next()
}
