//! Image references and the dimension-probe collaborator.

use std::path::{Path, PathBuf};

use crate::error::ImportError;

/// A reference to a source image: its path plus dimensions when known.
///
/// Sizes are `(height, width)` pairs. A size is attached up front when the
/// dataset ships an image size index; otherwise it stays unknown until a
/// normalized-coordinate record forces a probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    path: PathBuf,
    size: Option<(u32, u32)>,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: None,
        }
    }

    pub fn with_size(path: impl Into<PathBuf>, size: (u32, u32)) -> Self {
        Self {
            path: path.into(),
            size: Some(size),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Known `(height, width)`, if any.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: (u32, u32)) {
        self.size = Some(size);
    }
}

/// Resolves image dimensions on demand.
///
/// The default implementation reads headers only; a caller can substitute a
/// full pixel decoder. Probe failures propagate as item-level materialization
/// failures.
pub trait ImageSizeProbe {
    /// Returns `(height, width)` for the image at `path`.
    fn probe(&self, path: &Path) -> Result<(u32, u32), ImportError>;
}

/// Header-only probe backed by the `imagesize` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileProbe;

impl ImageSizeProbe for FileProbe {
    fn probe(&self, path: &Path) -> Result<(u32, u32), ImportError> {
        let size = imagesize::size(path).map_err(|source| ImportError::ImageProbe {
            path: path.to_path_buf(),
            source,
        })?;

        let height: u32 = size.height.try_into().map_err(|_| ImportError::InvalidImage {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;
        let width: u32 = size.width.try_into().map_err(|_| ImportError::InvalidImage {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;

        Ok((height, width))
    }
}
