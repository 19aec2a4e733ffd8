//! Inode identity.
//!
//! Every entry's inode number is derived from its name alone, so the same
//! name always maps to the same inode across lookups and listings without
//! any shared state. The root is pinned to the reserved FUSE root id and is
//! never hashed.

/// The reserved FUSE root inode id.
pub const ROOT_INO: u64 = 1;

/// Derive the inode number for a directory entry name (64-bit FNV-1a).
pub fn ino_for_name(name: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
