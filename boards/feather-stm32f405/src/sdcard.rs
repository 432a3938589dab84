//! FAT root directory on the microSD card
//!
//! Wraps an `embedded-sdmmc` volume manager behind [`LogVolume`]. Mounting
//! opens volume 0 and its root directory, every file operation opens and
//! closes its own handle so nothing stays open across calls.

use core::fmt::{Debug, Write as _};

use defmt::{warn, Debug2Format};
use embedded_sdmmc::{
    BlockDevice, Error as FsError, Mode, RawDirectory, RawFile, RawVolume, VolumeIdx,
    VolumeManager,
};
use hal_abstractions::{DirEntry, EntryName, LogVolume};

use crate::time::FatClock;

/// Card or filesystem failure
#[derive(Debug)]
pub enum VolumeError<E: Debug> {
    /// Operation on a volume that was not mounted
    NotMounted,
    Fs(FsError<E>),
}

impl<E: Debug> From<FsError<E>> for VolumeError<E> {
    fn from(e: FsError<E>) -> Self {
        Self::Fs(e)
    }
}

impl<E: Debug> core::fmt::Display for VolumeError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotMounted => write!(f, "Volume not mounted"),
            Self::Fs(e) => write!(f, "Filesystem error: {:?}", e),
        }
    }
}

impl<E: Debug> core::error::Error for VolumeError<E> {}

impl<E: Debug> embedded_io::Error for VolumeError<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;
        match self {
            Self::NotMounted => ErrorKind::NotConnected,
            Self::Fs(FsError::DiskFull | FsError::NotEnoughSpace) => ErrorKind::OutOfMemory,
            Self::Fs(FsError::NotFound) => ErrorKind::NotFound,
            Self::Fs(FsError::FileAlreadyExists) => ErrorKind::AlreadyExists,
            Self::Fs(FsError::ReadOnly) => ErrorKind::PermissionDenied,
            Self::Fs(FsError::DeviceError(_)) => ErrorKind::Interrupted,
            Self::Fs(_) => ErrorKind::Other,
        }
    }
}

/// Root directory of the first FAT volume on a block device
pub struct SdVolume<D: BlockDevice> {
    mgr: VolumeManager<D, FatClock>,
    volume: Option<RawVolume>,
    root: Option<RawDirectory>,
}

impl<D> SdVolume<D>
where
    D: BlockDevice,
    D::Error: Debug,
{
    pub fn new(device: D) -> Self {
        Self {
            mgr: VolumeManager::new(device, FatClock),
            volume: None,
            root: None,
        }
    }

    fn root(&self) -> Result<RawDirectory, VolumeError<D::Error>> {
        self.root.ok_or(VolumeError::NotMounted)
    }

    /// Open `name`, run `op` on the handle and close it again
    fn with_file<T, F>(&mut self, name: &str, mode: Mode, op: F) -> Result<T, VolumeError<D::Error>>
    where
        F: FnOnce(&mut VolumeManager<D, FatClock>, RawFile) -> Result<T, FsError<D::Error>>,
    {
        let root = self.root()?;
        let file = self.mgr.open_file_in_dir(root, name, mode)?;
        let result = op(&mut self.mgr, file);
        let closed = self.mgr.close_file(file);
        let value = result?;
        closed?;
        Ok(value)
    }
}

impl<D> LogVolume for SdVolume<D>
where
    D: BlockDevice,
    D::Error: Debug,
{
    type Error = VolumeError<D::Error>;

    fn mount(&mut self) -> Result<(), Self::Error> {
        let volume = self.mgr.open_raw_volume(VolumeIdx(0))?;
        match self.mgr.open_root_dir(volume) {
            Ok(root) => {
                self.volume = Some(volume);
                self.root = Some(root);
                Ok(())
            }
            Err(e) => {
                let _ = self.mgr.close_volume(volume);
                Err(e.into())
            }
        }
    }

    fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            if let Err(e) = self.mgr.close_dir(root) {
                warn!("Closing root directory failed: {:?}", Debug2Format(&e));
            }
        }
        if let Some(volume) = self.volume.take() {
            if let Err(e) = self.mgr.close_volume(volume) {
                warn!("Closing volume failed: {:?}", Debug2Format(&e));
            }
        }
    }

    fn read_root<F>(&mut self, mut f: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry),
    {
        let root = self.root()?;
        self.mgr.iterate_dir(root, |entry| {
            if entry.attributes.is_volume() {
                return;
            }
            let mut name = EntryName::new();
            if write!(name, "{}", entry.name).is_err() {
                return;
            }
            f(&DirEntry {
                name,
                is_dir: entry.attributes.is_directory(),
                size: entry.size,
            });
        })?;
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, Self::Error> {
        let root = self.root()?;
        match self.mgr.find_directory_entry(root, name) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&mut self, name: &str) -> Result<(), Self::Error> {
        self.with_file(name, Mode::ReadWriteCreateOrTruncate, |_, _| Ok(()))
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<usize, Self::Error> {
        self.with_file(name, Mode::ReadWriteAppend, |mgr, file| {
            let before = mgr.file_length(file)?;
            match mgr.write(file, data) {
                Ok(()) => Ok(data.len()),
                // whatever made it before the card filled up stays in the file
                Err(FsError::DiskFull | FsError::NotEnoughSpace) => {
                    let after = mgr.file_length(file)?;
                    Ok(after.saturating_sub(before) as usize)
                }
                Err(e) => Err(e),
            }
        })
    }

    fn read_at(&mut self, name: &str, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.with_file(name, Mode::ReadOnly, |mgr, file| {
            mgr.file_seek_from_start(file, offset)?;
            mgr.read(file, buf)
        })
    }

    fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
        let root = self.root()?;
        self.mgr.delete_file_in_dir(root, name)?;
        Ok(())
    }
}
