//! RFC 5734 message framing: a 4-byte big-endian total length (header
//! included) followed by the XML payload.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Framing failures; all of them end the connection.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame length {0} exceeds the configured maximum")]
    TooLarge(u32),

    #[error("frame length {0} is shorter than the length header itself")]
    TooShort(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads one framed document. Returns `None` on a clean EOF at a frame
/// boundary.
pub async fn read_frame<S>(stream: &mut S, max_bytes: usize) -> Result<Option<Vec<u8>>, FrameError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match stream.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let total = u32::from_be_bytes(header);
    if (total as usize) > max_bytes {
        return Err(FrameError::TooLarge(total));
    }
    if total < 4 {
        return Err(FrameError::TooShort(total));
    }
    let mut payload = vec![0u8; total as usize - 4];
    stream.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Writes one framed document.
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> Result<(), FrameError>
where
    S: AsyncWrite + Unpin,
{
    let total = u32::try_from(payload.len() + 4)
        .map_err(|_| FrameError::TooLarge(u32::MAX))?;
    stream.write_all(&total.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_frame(&mut client, b"<epp/>").await.unwrap();
        let frame = read_frame(&mut server, 1024).await.unwrap().unwrap();
        assert_eq!(frame, b"<epp/>");
    }

    #[tokio::test]
    async fn clean_eof_is_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert!(read_frame(&mut server, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversize_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        // Header promises more than the maximum.
        client.write_all(&10_000u32.to_be_bytes()).await.unwrap();
        let result = read_frame(&mut server, 1024).await;
        assert!(matches!(result, Err(FrameError::TooLarge(10_000))));
    }

    #[tokio::test]
    async fn undersize_header_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&2u32.to_be_bytes()).await.unwrap();
        let result = read_frame(&mut server, 1024).await;
        assert!(matches!(result, Err(FrameError::TooShort(2))));
    }
}
