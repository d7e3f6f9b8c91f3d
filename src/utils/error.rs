//! Error Handling Module
//!
//! Defines custom error types for the dogvision library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for dogvision operations
#[derive(Error, Debug)]
pub enum DogvisionError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{}': {}", .0.display(), .1)]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model operations
    #[error("Model error: {0}")]
    Model(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Path not found
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
}

/// Convenience Result type for dogvision operations
pub type Result<T> = std::result::Result<T, DogvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DogvisionError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "Dataset error: test error");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/image.jpg");
        let err = DogvisionError::ImageLoad(path.clone(), "file not found".to_string());
        assert!(format!("{}", err).contains("image.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DogvisionError = io_err.into();
        assert!(matches!(err, DogvisionError::Io(_)));
    }
}
