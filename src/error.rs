use thiserror::Error;

/// Library error type for previous-images operations.
///
/// None of these ever cross the manager's public API; they stay inside the
/// decode pipeline and the worker, where a failure is logged and the affected
/// record is marked [`Failed`](crate::record::LoadState::Failed).
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying IO error while reading image bytes or spawning the worker.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The image bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
