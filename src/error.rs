use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The value is neither an existing file, an open handle, nor a parseable URI
    #[error("image must be a filepath, file, url, or Google Cloud Storage url (got {0:?})")]
    InvalidImageReference(String),

    #[error("failed to read image from {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read image from handle: {0}")]
    ReadHandle(#[source] std::io::Error),

    #[error("max_results must be positive (got {0})")]
    InvalidMaxResults(i32),

    #[error("unknown feature method: {0}")]
    UnknownFeature(String),

    #[error("invalid request metadata: {0}")]
    InvalidMetadata(String),

    /// Failure returned by the remote `BatchAnnotateImages` call, untouched
    #[error(transparent)]
    Rpc(#[from] tonic::Status),

    #[error("failed to connect: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_errors_display() {
        let err = Error::ReadFile {
            path: PathBuf::from("/images/face.jpg"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read image from /images/face.jpg: denied"
        );

        let err = Error::ReadHandle(io::Error::new(io::ErrorKind::Other, "device gone"));
        assert_eq!(
            err.to_string(),
            "failed to read image from handle: device gone"
        );
    }
}
