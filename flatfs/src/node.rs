use std::borrow::Cow;

use crate::fs::FsError;
use crate::{MAX_FILES, NAME_LEN};

use zerocopy::{AsBytes, FromBytes};

/// Encoded length of one inode record.
pub const NODE_SIZE: usize = std::mem::size_of::<Inode>();
/// Encoded length of the whole inode table.
pub const TABLE_SIZE: usize = NODE_SIZE * MAX_FILES;

/// Block index stored in slots that have never held a file.
const NO_BLOCK: i32 = -1;

#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone, Debug, PartialEq)]
/// One file: where its single block lives and how much of it is content.
pub struct Inode {
  /// Zero terminated, zero padded.
  name: [u8; NAME_LEN],
  /// Bytes of content stored in the block, always below BLOCK_SIZE.
  size: u32,
  /// Data block holding the content, only meaningful while `used` is set.
  block_index: i32,
  used: u8,
  _pad: [u8; 3],
}

impl Inode {
  fn unused() -> Self {
    Self {
      name: [0; NAME_LEN],
      size: 0,
      block_index: NO_BLOCK,
      used: 0,
      _pad: [0; 3],
    }
  }

  pub fn is_used(&self) -> bool {
    self.used != 0
  }

  /// Raw name bytes up to the terminator.
  pub fn name_bytes(&self) -> &[u8] {
    let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    &self.name[..end]
  }

  pub fn name(&self) -> Cow<'_, str> {
    String::from_utf8_lossy(self.name_bytes())
  }

  pub fn size(&self) -> usize {
    self.size as usize
  }

  pub fn set_size(&mut self, size: usize) {
    self.size = size as u32;
  }

  pub fn block(&self) -> i32 {
    self.block_index
  }

  /// Claims the slot for a file.
  pub fn occupy(&mut self, name: [u8; NAME_LEN], size: usize, block: usize) {
    self.name = name;
    self.size = size as u32;
    self.block_index = block as i32;
    self.used = 1;
  }

  /// Points a live file at a new block, as compaction does.
  pub fn relocate(&mut self, block: usize) {
    self.block_index = block as i32;
    self.used = 1;
  }

  /// Frees the slot. Name, size and block are left behind like the block content is.
  pub fn release(&mut self) {
    self.used = 0;
  }
}

/// Encodes a file name into its fixed on-disk buffer, leaving room for the terminator.
pub fn encode_name(name: &str) -> Result<[u8; NAME_LEN], FsError> {
  let bytes = name.as_bytes();
  if bytes.is_empty() || bytes.contains(&0) {
    return Err(FsError::InvalidName);
  }
  if bytes.len() >= NAME_LEN {
    return Err(FsError::NameTooLong { len: bytes.len() });
  }
  let mut buf = [0; NAME_LEN];
  buf[..bytes.len()].copy_from_slice(bytes);
  Ok(buf)
}

/// The fixed-capacity inode arena. Slot indices are stable and double as the
/// listing order.
#[derive(Clone, Debug, PartialEq)]
pub struct InodeTable {
  nodes: [Inode; MAX_FILES],
}

impl InodeTable {
  /// A formatted table with every slot free.
  pub fn new() -> Self {
    Self {
      nodes: [Inode::unused(); MAX_FILES],
    }
  }

  /// Decodes the table from the front of `buf`. Panics if `buf` is shorter than
  /// TABLE_SIZE.
  pub fn parse(buf: &[u8]) -> Self {
    assert!(buf.len() >= TABLE_SIZE, "Buffer too short for inode table.");
    let mut table = Self::new();
    for (node, raw) in table.nodes.iter_mut().zip(buf.chunks_exact(NODE_SIZE)) {
      node.as_bytes_mut().copy_from_slice(raw);
    }
    table
  }

  /// Encodes the table into the front of `buf`.
  pub fn serialize_into(&self, buf: &mut [u8]) {
    for (node, raw) in self.nodes.iter().zip(buf[..TABLE_SIZE].chunks_exact_mut(NODE_SIZE)) {
      raw.copy_from_slice(node.as_bytes());
    }
  }

  pub fn get(&self, slot: usize) -> &Inode {
    &self.nodes[slot]
  }

  pub fn get_mut(&mut self, slot: usize) -> &mut Inode {
    &mut self.nodes[slot]
  }

  /// Slot of the live file called `name`.
  pub fn find(&self, name: &str) -> Option<usize> {
    self
      .iter_used()
      .find(|(_, node)| node.name_bytes() == name.as_bytes())
      .map(|(slot, _)| slot)
  }

  /// Every slot, free ones included, in slot order.
  pub fn iter(&self) -> impl Iterator<Item = (usize, &Inode)> {
    self.nodes.iter().enumerate()
  }

  /// Live files in slot order.
  pub fn iter_used(&self) -> impl Iterator<Item = (usize, &Inode)> {
    self.iter().filter(|(_, node)| node.is_used())
  }

  pub fn used_count(&self) -> usize {
    self.iter_used().count()
  }

  /// Marks every slot free.
  pub fn clear(&mut self) {
    self.nodes.iter_mut().for_each(Inode::release);
  }
}
