//! MH-Z19 CO2 sensor UART framing.
//!
//! Every frame is nine bytes. The last byte is the two's complement of the
//! sum of bytes 1 to 7. A gas concentration reply carries the ppm value big
//! endian in bytes 2 and 3.

use std::io::{ErrorKind, Read, Write};

use crate::errors::FrameError;

pub const FRAME_LEN: usize = 9;

// one spare byte so a trailing byte of line noise does not split the frame
const READ_CAPACITY: usize = FRAME_LEN + 1;

/// "Read gas concentration" command addressed to sensor 1.
pub const READ_REQUEST: [u8; FRAME_LEN] = [0xFF, 0x01, 0x86, 0x00, 0x00, 0x00, 0x00, 0x00, 0x79];

pub fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    let sum = frame[1..8].iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    (sum ^ 0xFF).wrapping_add(1)
}

/// Extracts the CO2 concentration in ppm from a reply frame.
///
/// Only the checksum is verified; the sensor does not always echo the
/// command byte.
pub fn decode(frame: &[u8]) -> Result<u16, FrameError> {
    let frame: &[u8; FRAME_LEN] = frame
        .get(..FRAME_LEN)
        .and_then(|head| head.try_into().ok())
        .ok_or(FrameError::ShortRead(frame.len()))?;

    let expected = checksum(frame);
    if expected != frame[8] {
        return Err(FrameError::ChecksumMismatch { expected, received: frame[8] });
    }

    Ok(u16::from_be_bytes([frame[2], frame[3]]))
}

/// Sends [`READ_REQUEST`] and decodes the reply.
///
/// Reads until a full frame has arrived, the link reports end of stream, or
/// the link's read timeout expires.
pub fn exchange<L>(link: &mut L) -> Result<u16, FrameError>
where
    L: Read + Write + ?Sized,
{
    link.write_all(&READ_REQUEST)?;
    link.flush()?;

    let mut frame = [0u8; READ_CAPACITY];
    let mut received = 0;

    while received < FRAME_LEN {
        match link.read(&mut frame[received..]) {
            Ok(0) => break,
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }

    if received < FRAME_LEN {
        return Err(FrameError::ShortRead(received));
    }

    decode(&frame[..received])
}
