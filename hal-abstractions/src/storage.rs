//! Removable storage seam
//!
//! A `LogVolume` is the root directory of a FAT volume on removable media.
//! Implementations are expected to be cheap to mount and unmount: callers
//! mount around every operation and never assume the volume stays mounted
//! between calls.

/// Longest entry name a volume reports (8.3 short names fit with room to spare)
pub const MAX_NAME_LEN: usize = 32;

/// Name of a root directory entry
pub type EntryName = heapless::String<MAX_NAME_LEN>;

/// One entry of the root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: EntryName,
    pub is_dir: bool,
    /// Size in bytes, 0 for directories
    pub size: u32,
}

/// Root directory of a mountable volume
///
/// All file operations take a name relative to the root. Errors carry an
/// [`embedded_io::ErrorKind`] so callers can tell a full card
/// ([`embedded_io::ErrorKind::OutOfMemory`]) from a missing one.
pub trait LogVolume {
    type Error: embedded_io::Error;

    /// Bring up the card and open the root directory
    fn mount(&mut self) -> Result<(), Self::Error>;

    /// Close everything opened by [`LogVolume::mount`]
    fn unmount(&mut self);

    /// Call `f` once per root directory entry, in on-disk order
    fn read_root<F>(&mut self, f: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry);

    fn exists(&mut self, name: &str) -> Result<bool, Self::Error>;

    /// Create an empty file, truncating it if it already exists
    fn create(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Append `data` to an existing file
    ///
    /// Returns the number of bytes that actually reached the media, which
    /// may be short when the card fills up.
    fn append(&mut self, name: &str, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read from `offset` into `buf`, returning 0 at end of file
    fn read_at(&mut self, name: &str, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn remove(&mut self, name: &str) -> Result<(), Self::Error>;
}
