use std::io;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Short response: got {0} of 9 bytes")]
    ShortRead(usize),

    #[error("Checksum mismatch: expected {expected:#04x}, received {received:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },
}
