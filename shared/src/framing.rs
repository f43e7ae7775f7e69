//! Length-prefixed message framing over a byte stream.
//!
//! Every frame is a fixed-width ASCII decimal length header, right-padded with
//! spaces to [`HEADER_SIZE`] bytes, followed by exactly that many payload
//! bytes. The header always describes the serialized bytes actually written,
//! never an estimate of an in-memory size.
//!
//! Reads use `read_exact`, so short reads from the socket are retried until
//! the header or payload is complete. A stream that closes mid-frame surfaces
//! as [`NetError::Disconnected`].

use crate::error::{NetError, ProtocolError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Width of the length header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Largest payload either side will send or accept.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Renders the header announcing a payload of `len` bytes.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_SIZE], ProtocolError> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::Oversized {
            size: len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    let digits = len.to_string();
    let mut header = [b' '; HEADER_SIZE];
    header[..digits.len()].copy_from_slice(digits.as_bytes());
    Ok(header)
}

/// Parses a header: ASCII digits followed only by space padding.
pub fn parse_header(header: &[u8]) -> Result<usize, ProtocolError> {
    let bad = || ProtocolError::BadHeader(String::from_utf8_lossy(header).into_owned());

    let digits_end = header
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(header.len());
    if digits_end == 0 || header[digits_end..].iter().any(|&b| b != b' ') {
        return Err(bad());
    }

    // Only ASCII digits remain, so the slice is valid UTF-8.
    let digits = std::str::from_utf8(&header[..digits_end]).map_err(|_| bad())?;
    let len: usize = digits.parse().map_err(|_| bad())?;
    if len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::Oversized {
            size: len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(len)
}

/// Writes one frame carrying `payload`.
pub async fn send_blob<W>(writer: &mut W, payload: &[u8]) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
{
    let header = encode_header(payload.len())?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes one frame carrying the UTF-8 bytes of `text`.
pub async fn send_text<W>(writer: &mut W, text: &str) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
{
    send_blob(writer, text.as_bytes()).await
}

/// Serializes `value` with bincode and writes it as one frame.
pub async fn send_message<W, T>(writer: &mut W, value: &T) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(value).map_err(ProtocolError::Codec)?;
    send_blob(writer, &payload).await
}

/// Reads one frame and returns its raw payload.
pub async fn recv_blob<R>(reader: &mut R) -> Result<Vec<u8>, NetError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let len = parse_header(&header)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Reads one frame and decodes it as UTF-8 text.
pub async fn recv_text<R>(reader: &mut R) -> Result<String, NetError>
where
    R: AsyncRead + Unpin,
{
    let payload = recv_blob(reader).await?;
    String::from_utf8(payload).map_err(|_| ProtocolError::NotUtf8.into())
}

/// Reads one frame and decodes it with bincode.
pub async fn recv_message<R, T>(reader: &mut R) -> Result<T, NetError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = recv_blob(reader).await?;
    let value = bincode::deserialize(&payload).map_err(ProtocolError::Codec)?;
    Ok(value)
}
