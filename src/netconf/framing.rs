//! End-of-message framing.
//!
//! Every message on a session is terminated by the `]]>]]>` delimiter. The
//! delimiter is not escaped: well-formed XML payloads never contain it, and
//! the writer refuses payloads that do.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Frame delimiter
pub const DELIMITER: &str = "]]>]]>";

/// Default upper bound on one frame's payload
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Framing failures; all of them end the session
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("stream ended after {0} bytes without a frame delimiter")]
    UnexpectedEof(usize),
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("payload contains the frame delimiter")]
    DelimiterInPayload,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads delimiter-terminated frames from a byte stream
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_limit(inner: R, max_frame_bytes: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_frame_bytes,
        }
    }

    /// Read the next frame, without its delimiter.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames (only
    /// whitespace after the last delimiter). Bytes after a delimiter stay
    /// buffered for the next call.
    pub async fn read_frame(&mut self) -> Result<Option<String>, FramingError> {
        let cap = self.max_frame_bytes + DELIMITER.len();
        let mut buf = Vec::new();

        loop {
            if buf.len() >= cap {
                return Err(FramingError::FrameTooLarge { limit: self.max_frame_bytes });
            }

            let remaining = (cap - buf.len()) as u64;
            let read = (&mut self.inner).take(remaining).read_until(b'>', &mut buf).await?;

            if read == 0 {
                if buf.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                return Err(FramingError::UnexpectedEof(buf.len()));
            }

            if buf.ends_with(DELIMITER.as_bytes()) {
                buf.truncate(buf.len() - DELIMITER.len());
                return String::from_utf8(buf).map(Some).map_err(|_| FramingError::InvalidUtf8);
            }
        }
    }
}

/// Writes delimiter-terminated frames to a byte stream
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one payload followed by the delimiter, then flush
    pub async fn write_frame(&mut self, payload: &str) -> Result<(), FramingError> {
        if payload.contains(DELIMITER) {
            return Err(FramingError::DelimiterInPayload);
        }

        self.inner.write_all(payload.as_bytes()).await?;
        self.inner.write_all(DELIMITER.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_consecutive_frames() {
        let stream: &[u8] = b"<hello/>\n]]>]]>\n<rpc message-id=\"1\"><get/></rpc>]]>]]><rpc/>]]>]]>\n";
        let mut reader = FrameReader::new(stream);

        assert_eq!(reader.read_frame().await.unwrap().as_deref(), Some("<hello/>\n"));
        assert_eq!(
            reader.read_frame().await.unwrap().as_deref(),
            Some("\n<rpc message-id=\"1\"><get/></rpc>")
        );
        assert_eq!(reader.read_frame().await.unwrap().as_deref(), Some("<rpc/>"));
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partial_delimiter_is_payload() {
        let stream: &[u8] = b"<a>]]></a>]]>]]>";
        let mut reader = FrameReader::new(stream);
        assert_eq!(reader.read_frame().await.unwrap().as_deref(), Some("<a>]]></a>"));
    }

    #[tokio::test]
    async fn test_eof_inside_frame_is_an_error() {
        let stream: &[u8] = b"<rpc message-id=\"1\"><get/></rpc>]]>";
        let mut reader = FrameReader::new(stream);
        match reader.read_frame().await {
            Err(FramingError::UnexpectedEof(n)) => assert_eq!(n, stream.len()),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let payload = format!("<rpc>{}</rpc>]]>]]>", "x".repeat(64));
        let mut reader = FrameReader::with_limit(payload.as_bytes(), 16);
        assert!(matches!(
            reader.read_frame().await,
            Err(FramingError::FrameTooLarge { limit: 16 })
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let stream: &[u8] = b"\xff\xfe]]>]]>";
        let mut reader = FrameReader::new(stream);
        assert!(matches!(reader.read_frame().await, Err(FramingError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn test_writer_appends_delimiter() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame("<ok/>").await.unwrap();
        writer.write_frame("<ok/>").await.unwrap();
        assert_eq!(writer.into_inner(), b"<ok/>]]>]]><ok/>]]>]]>".to_vec());
    }

    #[tokio::test]
    async fn test_writer_refuses_embedded_delimiter() {
        let mut writer = FrameWriter::new(Vec::new());
        assert!(matches!(
            writer.write_frame("<a>]]>]]></a>").await,
            Err(FramingError::DelimiterInPayload)
        ));
        assert!(writer.into_inner().is_empty());
    }
}
