//! Temporary storage for sampled frames.
//!
//! Each run gets its own freshly created directory, so concurrent runs never
//! share frames. The directory and everything in it is removed when the
//! [`FrameStore`] is dropped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::DynamicImage;
use tempfile::{Builder as TempDirBuilder, TempDir};

use crate::{
    conversion, error::ScreeningError, sampler::SampledFrame, timestamp::FrameTimestamp,
};

const DIRECTORY_PREFIX: &str = "framescreen-frames-";

/// A frame written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFrame {
    /// Grid point of the frame.
    pub timestamp: FrameTimestamp,
    /// Location of the PNG file.
    pub path: PathBuf,
}

impl StoredFrame {
    /// Read the frame back, downscale it if needed, and JPEG-encode it.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or re-encoded.
    pub fn load_for_upload(&self) -> Result<Vec<u8>, ScreeningError> {
        let image = image::open(&self.path)?;
        conversion::encode_for_upload(&image)
    }
}

/// An exclusive, self-cleaning frames directory.
#[derive(Debug)]
pub struct FrameStore {
    directory: TempDir,
    frames: Vec<StoredFrame>,
}

impl FrameStore {
    /// Create a store under the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::IoError`] if the directory cannot be made.
    pub fn create() -> Result<Self, ScreeningError> {
        let directory = TempDirBuilder::new().prefix(DIRECTORY_PREFIX).tempdir()?;
        Ok(Self::with_directory(directory))
    }

    /// Create a store under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::IoError`] if the directory cannot be made.
    pub fn create_in<P: AsRef<Path>>(root: P) -> Result<Self, ScreeningError> {
        fs::create_dir_all(root.as_ref())?;
        let directory = TempDirBuilder::new()
            .prefix(DIRECTORY_PREFIX)
            .tempdir_in(root)?;
        Ok(Self::with_directory(directory))
    }

    fn with_directory(directory: TempDir) -> Self {
        log::debug!("Created frames directory {}", directory.path().display());
        Self {
            directory,
            frames: Vec::new(),
        }
    }

    /// The directory frames are written to.
    pub fn path(&self) -> &Path {
        self.directory.path()
    }

    /// Write a sampled frame as `<hh-mm-ss.ff>.png`.
    ///
    /// # Errors
    ///
    /// Fails if the image cannot be encoded or written.
    pub fn save(&mut self, frame: &SampledFrame) -> Result<&StoredFrame, ScreeningError> {
        self.save_image(frame.timestamp, &frame.image)
    }

    /// Write an image under the given timestamp.
    ///
    /// # Errors
    ///
    /// Fails if the image cannot be encoded or written.
    pub fn save_image(
        &mut self,
        timestamp: FrameTimestamp,
        image: &DynamicImage,
    ) -> Result<&StoredFrame, ScreeningError> {
        let path = self.directory.path().join(format!("{timestamp}.png"));
        image.save(&path)?;

        let index = self.frames.len();
        self.frames.push(StoredFrame { timestamp, path });
        Ok(&self.frames[index])
    }

    /// Stored frames, in the order they were saved.
    pub fn frames(&self) -> &[StoredFrame] {
        &self.frames
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Copy every stored frame into `destination`, creating it if needed.
    ///
    /// Returns the copied file paths.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::IoError`] on any filesystem failure.
    pub fn persist_to<P: AsRef<Path>>(
        &self,
        destination: P,
    ) -> Result<Vec<PathBuf>, ScreeningError> {
        let destination = destination.as_ref();
        fs::create_dir_all(destination)?;

        self.frames
            .iter()
            .map(|frame| {
                let target = destination.join(format!("{}.png", frame.timestamp));
                fs::copy(&frame.path, &target)?;
                Ok(target)
            })
            .collect()
    }
}
