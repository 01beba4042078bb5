//! Framed transport (C3): a blocking TCP socket with `TCP_NODELAY`, a
//! reader that extracts complete FIX frames from a growable buffer, and a
//! writer serialized by a single lock so frames never interleave on the
//! wire.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;
use thiserror::Error;

use crate::codec::SOH;

/// Errors raised by the framed transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying socket returned an I/O error.
    #[error("transport io error: {0}")]
    Io(#[from] io::Error),
    /// The peer closed the connection (EOF).
    #[error("peer closed connection")]
    Eof,
}

/// Connects a `TcpStream` with `TCP_NODELAY` set, as the session reader
/// and writer both require.
pub fn connect(addr: &str) -> Result<TcpStream, TransportError> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Appends bytes read from a socket into a growable buffer and extracts
/// complete FIX frames by locating `\x0110=` followed by the next SOH.
pub struct FrameReader {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl FrameReader {
    /// Wrap a connected stream for frame extraction.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Block for one socket read, append to the internal buffer, then
    /// drain and return every complete frame now available. An empty
    /// result with `Ok` means the read succeeded but no full frame has
    /// arrived yet.
    pub fn read_frames(&mut self) -> Result<Vec<Vec<u8>>, TransportError> {
        let mut chunk = [0u8; 4096];
        let n = self.stream.read(&mut chunk)?;
        if n == 0 {
            return Err(TransportError::Eof);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(extract_frames(&mut self.buf))
    }
}

/// Pull every complete frame (`8=FIX...\x0110=NNN\x01`) out of `buf`,
/// leaving any trailing partial frame in place.
fn extract_frames(buf: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    loop {
        let Some(frame_end) = find_frame_end(buf) else {
            break;
        };
        let frame: Vec<u8> = buf.drain(..frame_end).collect();
        frames.push(frame);
    }
    frames
}

/// Find the end (exclusive) of the first complete frame in `buf`: the
/// byte index just past the SOH that terminates the `10=NNN` checksum
/// field, or `None` if no complete checksum field is present yet.
fn find_frame_end(buf: &[u8]) -> Option<usize> {
    let marker = [SOH, b'1', b'0', b'='];
    let marker_pos = buf
        .windows(marker.len())
        .position(|w| w == marker)?;
    let value_start = marker_pos + marker.len();
    let soh_pos = buf[value_start..].iter().position(|&b| b == SOH)?;
    Some(value_start + soh_pos + 1)
}

/// Serializes outbound frame writes so two writers can never interleave
/// their bytes on the wire.
pub struct FrameWriter {
    stream: Mutex<TcpStream>,
}

impl FrameWriter {
    /// Wrap a connected stream for serialized writes. Clones the socket
    /// handle so reader and writer can each own a `TcpStream`.
    pub fn new(stream: TcpStream) -> Result<Self, TransportError> {
        Ok(Self {
            stream: Mutex::new(stream),
        })
    }

    /// Write a complete frame atomically with respect to other callers of
    /// `send`.
    pub fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.write_all(frame)?;
        guard.flush()?;
        Ok(())
    }
}
