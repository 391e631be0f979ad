//! Length-prefixed JSON framing.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ JSON                     │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! The same framing is used by the request gateway and the latched
//! publisher. Oversized inbound frames are rejected before the payload is
//! read; the connection is then unusable and must be closed.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::WireError;

/// Default inbound frame limit (64 MiB, large enough for a full grid).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Serialize `msg` and write it as one frame.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), WireError> {
    let payload = serde_json::to_vec(msg)?;
    let len = u32::try_from(payload.len()).map_err(|_| WireError::FrameTooLarge {
        size: payload.len(),
        limit: u32::MAX as usize,
    })?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame and deserialize it.
///
/// `buf` is reused between calls to avoid per-frame allocation.
pub fn read_frame<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_frame_bytes: usize,
) -> Result<T, WireError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_bytes {
        return Err(WireError::FrameTooLarge {
            size: len,
            limit: max_frame_bytes,
        });
    }

    buf.clear();
    buf.resize(len, 0);
    reader.read_exact(buf)?;

    Ok(serde_json::from_slice(buf)?)
}

/// Read one frame from a socket with a read timeout.
///
/// Returns `Ok(None)` when the timeout expires before any byte of a new
/// frame arrived, so the caller can poll its shutdown flag. Once a frame has
/// started, timeouts are waited out as long as `keep_waiting()` holds; the
/// frame is never abandoned half read.
pub fn poll_frame<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_frame_bytes: usize,
    keep_waiting: impl Fn() -> bool,
) -> Result<Option<T>, WireError> {
    let mut len_buf = [0u8; 4];
    if !fill(reader, &mut len_buf, false, &keep_waiting)? {
        return Ok(None);
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_bytes {
        return Err(WireError::FrameTooLarge {
            size: len,
            limit: max_frame_bytes,
        });
    }

    buf.clear();
    buf.resize(len, 0);
    fill(reader, buf, true, &keep_waiting)?;

    Ok(Some(serde_json::from_slice(buf)?))
}

/// Fill `dst` completely. Returns false if idle (nothing read, frame not started).
fn fill<R: Read>(
    reader: &mut R,
    dst: &mut [u8],
    started: bool,
    keep_waiting: &impl Fn() -> bool,
) -> Result<bool, WireError> {
    let mut filled = 0;
    while filled < dst.len() {
        match reader.read(&mut dst[filled..]) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                if filled == 0 && !started {
                    return Ok(false);
                }
                if !keep_waiting() {
                    return Err(e.into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}
