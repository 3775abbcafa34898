use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("path does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("unsupported image format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("could not decode {path}: {message}")]
    CorruptImage { path: PathBuf, message: String },

    #[error("no supported images in {dir}")]
    EmptyDirectory { dir: PathBuf },

    #[error("{path} is not in the index of {dir}")]
    NotInIndex { path: PathBuf, dir: PathBuf },

    #[error("file is gone, nothing to move: {path}")]
    FileMissing { path: PathBuf },

    #[error("{path} is the last image in its folder, not moving it")]
    LastImage { path: PathBuf },

    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("cannot restore, path is occupied: {path}")]
    RestoreConflict { path: PathBuf },

    #[error("nothing to undo")]
    EmptyUndo,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    pub fn from_image(path: PathBuf, err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(_) => Self::UnsupportedFormat { path },
            image::ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound { path }
            }
            other => Self::CorruptImage {
                path,
                message: other.to_string(),
            },
        }
    }
}
