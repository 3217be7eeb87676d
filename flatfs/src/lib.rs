//! A tiny single-block-per-file filesystem living inside one flat disk image.
//!
//! # Layout
//! ===========================================================================
//! | SuperBlock | Inodes (MAX_FILES) | .. reserved .. | Data Region (1/file) |
//! ===========================================================================
//!
//! The superblock and inode table are written together as one header at the
//! start of the image. Every mutating operation brackets its work between a
//! header write with the dirty flag set and a header write with it cleared, so
//! a mount that finds the flag still set knows the previous run was cut short.
#[macro_use]
extern crate log;

mod alloc;
pub mod fs;
pub mod io;
mod node;
mod sb;

pub use crate::fs::{FileEntry, FlatFs, FsError, Listing, Recovery, Result, Stat};

/// Size in bytes of every block in the image.
pub const BLOCK_SIZE: usize = 1024;
/// Number of blocks in the image, reserved ones included.
pub const TOTAL_BLOCKS: usize = 50;
/// Leading blocks holding the metadata header, never handed out to files.
pub const RESERVED_BLOCKS: usize = 5;
/// Capacity of the inode table.
pub const MAX_FILES: usize = 10;
/// Identifies a formatted image.
pub const SB_MAGIC: u32 = 0xF5DE;
/// Bytes reserved for a file name, including its terminating zero byte.
pub const NAME_LEN: usize = 32;

/// Image file used when the caller does not name one.
pub const DEFAULT_IMAGE: &str = "vdisk.dat";
