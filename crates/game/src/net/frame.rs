use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 4;
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),
    #[error("frame of {len} bytes exceeds limit {max}")]
    LimitExceeded { len: usize, max: usize },
    #[error("connection closed mid-frame")]
    UnexpectedEof,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One packet as it travels the wire: `[type:u16][length:u16][payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: u16,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(packet_type: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            payload: payload.into(),
        }
    }

    /// Header plus payload, ready to be queued on an outbound stream.
    pub fn to_bytes(&self) -> Result<Bytes, FrameError> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(len));
        }
        let mut out = BytesMut::with_capacity(HEADER_LEN + len);
        out.put_u16(self.packet_type);
        out.put_u16(len as u16);
        out.put_slice(&self.payload);
        Ok(out.freeze())
    }
}

#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame_len: usize,
}

impl<R> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8 * 1024),
            max_frame_len: MAX_PAYLOAD_LEN,
        }
    }

    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max.clamp(1, MAX_PAYLOAD_LEN);
        self
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read one complete frame.
    ///
    /// Returns `Ok(None)` on clean EOF between frames. Never hands out a frame
    /// before all `length` payload bytes have arrived.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        loop {
            if self.buf.len() >= HEADER_LEN {
                let packet_type = u16::from_be_bytes([self.buf[0], self.buf[1]]);
                let len = u16::from_be_bytes([self.buf[2], self.buf[3]]) as usize;
                if len > self.max_frame_len {
                    return Err(FrameError::LimitExceeded {
                        len,
                        max: self.max_frame_len,
                    });
                }

                if self.buf.len() >= HEADER_LEN + len {
                    self.buf.advance(HEADER_LEN);
                    let payload = self.buf.split_to(len).freeze();
                    return Ok(Some(Frame {
                        packet_type,
                        payload,
                    }));
                }
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(FrameError::UnexpectedEof);
            }
        }
    }
}

#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), FrameError> {
        let bytes = frame.to_bytes()?;
        self.write_encoded(&bytes).await
    }

    /// Write bytes already produced by [`Frame::to_bytes`].
    pub async fn write_encoded(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.inner.write_all(bytes).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), FrameError> {
        self.inner.flush().await?;
        Ok(())
    }
}
