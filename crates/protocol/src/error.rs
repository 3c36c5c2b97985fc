/// Errors produced while reading a message off the wire.
///
/// [`FrameError::UnterminatedMessage`] and [`FrameError::InvalidUploadLength`]
/// are wire errors: the connection worker reports them to the client as
/// `error <msg>\r\n` and keeps the connection open. [`FrameError::ConnectionClosed`]
/// and [`FrameError::Io`] are transport errors: the worker ends the
/// connection silently.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("message not terminated with CRLF")]
    UnterminatedMessage,

    #[error("invalid length field of upload message")]
    InvalidUploadLength,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether this error should be reported back to the client as a wire
    /// error, as opposed to silently ending the connection.
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            FrameError::UnterminatedMessage | FrameError::InvalidUploadLength
        )
    }
}
