use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeekCryptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header: {0}")]
    HeaderFormat(String),

    #[error("truncated header: expected {expected} bytes of {field}, found {actual}")]
    TruncatedHeader {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("failed to unwrap symmetric key: {0}")]
    KeyUnwrap(String),

    #[error("failed to wrap symmetric key: {0}")]
    KeyWrap(String),

    #[error("unsupported cipher mode: {0}")]
    UnsupportedMode(String),
}

impl From<SeekCryptError> for std::io::Error {
    fn from(err: SeekCryptError) -> Self {
        match err {
            SeekCryptError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeekCryptError>;
