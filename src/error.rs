use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("resized image would be {width}x{height}, above the {max}px limit")]
    TooLarge { width: u64, height: u64, max: u32 },

    #[error("failed to encode {format}: {message}")]
    Encode { format: String, message: String },

    #[error("permission denied writing to '{0}'")]
    PermissionDenied(PathBuf),

    #[error("not enough disk space in '{0}'")]
    DiskFull(PathBuf),

    #[error("failed to write to '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("conversion crashed: {0}")]
    Panicked(String),
}

impl ConvertError {
    /// Sorts a write failure into the permission / disk-full / other buckets.
    pub fn from_write(folder: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied(folder),
            io::ErrorKind::StorageFull => ConvertError::DiskFull(folder),
            _ => ConvertError::Write {
                path: folder,
                source,
            },
        }
    }
}
