use std::io;

/// Errors surfaced by the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("varint is longer than 10 bytes")]
    VarIntTooLong,
    #[error("invalid boolean byte {0:#04x}, expected 0x00 or 0x01")]
    InvalidBool(u8),
    #[error("string length {0} is out of range")]
    BadStringLength(i32),
    #[error("packet frame length {0} is out of range")]
    BadFrameLength(i32),
    #[error("string is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the peer closed the stream. EOF between packets is a clean
    /// disconnect, not a fault.
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }
}
