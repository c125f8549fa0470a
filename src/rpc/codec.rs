//! `Content-Length` framing for JSON-RPC over byte streams.
//!
//! Each message is `Content-Length: <n>\r\n\r\n` followed by exactly `n`
//! bytes of UTF-8 JSON. Other headers (e.g. `Content-Type`) are accepted and
//! ignored.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::RpcError;

/// Largest frame body accepted from the peer.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Write one framed message and flush it.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Incremental reader yielding one frame body at a time.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    line: String,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Read the next frame body.
    ///
    /// Returns `Ok(None)` on a clean end of stream between frames.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, RpcError> {
        let mut content_length: Option<usize> = None;
        let mut saw_header = false;

        loop {
            self.line.clear();
            let read = self.inner.read_line(&mut self.line).await?;
            if read == 0 {
                if saw_header {
                    return Err(RpcError::Protocol(
                        "stream ended inside a frame header".to_string(),
                    ));
                }
                return Ok(None);
            }

            let header = self.line.trim_end_matches(&['\r', '\n'][..]);
            if header.is_empty() {
                if saw_header {
                    break;
                }
                continue;
            }
            saw_header = true;

            let Some((name, value)) = header.split_once(':') else {
                return Err(RpcError::Protocol(format!(
                    "malformed frame header `{header}`"
                )));
            };
            if name.trim().eq_ignore_ascii_case("content-length") {
                let parsed = value.trim().parse::<usize>().map_err(|_| {
                    RpcError::Protocol(format!("invalid Content-Length `{}`", value.trim()))
                })?;
                content_length = Some(parsed);
            }
        }

        let length = content_length
            .ok_or_else(|| RpcError::Protocol("frame header missing Content-Length".into()))?;
        if length > MAX_FRAME_BYTES {
            return Err(RpcError::Protocol(format!(
                "frame of {length} bytes exceeds limit of {MAX_FRAME_BYTES}"
            )));
        }

        let mut body = vec![0u8; length];
        self.inner.read_exact(&mut body).await?;
        Ok(Some(body))
    }
}
