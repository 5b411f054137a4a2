//! SD card driver boundary.
//!
//! The filesystem itself lives outside this crate. The SD card recorder only needs to mount
//! the card, keep one file open and append bytes to it.

use crate::error::SdCardError;

/// How [`SdCard::open_file`] treats an existing file.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FileOpenMode {
    /// Truncate the file, or create it.
    Overwrite,
    /// Write after the existing content, or create the file.
    #[default]
    Append,
}

/// An SD card with a mounted filesystem and at most one open file.
pub trait SdCard {
    /// Mounts the filesystem.
    fn mount(&mut self) -> Result<(), SdCardError> {
        Ok(())
    }

    /// Unmounts the filesystem. Any open file must be closed first.
    fn unmount(&mut self) -> Result<(), SdCardError> {
        Ok(())
    }

    /// Opens `name`.
    ///
    /// # Errors
    /// [`SdCardError::InvalidParameter`] for an empty name, [`SdCardError::NotMounted`],
    /// [`SdCardError::AlreadyOpen`] or [`SdCardError::OpenFailed`].
    fn open_file(&mut self, name: &str, mode: FileOpenMode) -> Result<(), SdCardError>;

    /// Writes all of `bytes` to the open file.
    ///
    /// # Errors
    /// [`SdCardError::NoFileOpen`], [`SdCardError::WriteFailed`],
    /// [`SdCardError::WriteIncomplete`] or [`SdCardError::SyncFailed`].
    fn write(&mut self, bytes: &[u8]) -> Result<(), SdCardError>;

    /// Closes the open file.
    fn close_file(&mut self) -> Result<(), SdCardError>;
}

impl<T: SdCard + ?Sized> SdCard for &mut T {
    fn mount(&mut self) -> Result<(), SdCardError> {
        T::mount(self)
    }

    fn unmount(&mut self) -> Result<(), SdCardError> {
        T::unmount(self)
    }

    fn open_file(&mut self, name: &str, mode: FileOpenMode) -> Result<(), SdCardError> {
        T::open_file(self, name, mode)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SdCardError> {
        T::write(self, bytes)
    }

    fn close_file(&mut self) -> Result<(), SdCardError> {
        T::close_file(self)
    }
}
