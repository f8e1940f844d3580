//! Trait abstraction for the raw S.bus byte stream to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Non-blocking byte-read primitive.
///
/// Implementations hand over whatever bytes have already arrived, up to
/// `buf.len()`, without waiting for more. "Nothing available yet" is
/// reported as `WouldBlock` or `Ok(0)`; the receiver treats both as a
/// normal outcome, not an error.
#[async_trait]
pub trait SbusByteSource: Send {
    /// Read already-arrived bytes into `buf`
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Wrapper around tokio_serial::SerialStream that implements SbusByteSource
pub struct SerialByteSource {
    port: tokio_serial::SerialStream,
}

impl SerialByteSource {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SbusByteSource for SerialByteSource {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;

        // A zero timeout polls the read exactly once: bytes the driver has
        // already buffered are returned, an idle line reports WouldBlock.
        match tokio::time::timeout(Duration::ZERO, self.port.read(buf)).await {
            Ok(result) => result,
            Err(_) => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock byte source fed from queued chunks.
    ///
    /// A queued chunk larger than the caller's buffer is split, so tests
    /// can verify that reads never run past a frame boundary.
    #[derive(Clone)]
    pub struct MockByteSource {
        chunks: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
    }

    impl MockByteSource {
        pub fn new() -> Self {
            Self {
                chunks: Arc::new(Mutex::new(VecDeque::new())),
            }
        }

        pub fn push_bytes(&self, bytes: &[u8]) {
            self.chunks.lock().unwrap().push_back(Ok(bytes.to_vec()));
        }

        pub fn push_error(&self, kind: io::ErrorKind) {
            self.chunks
                .lock()
                .unwrap()
                .push_back(Err(io::Error::new(kind, "mock read error")));
        }
    }

    #[async_trait]
    impl SbusByteSource for MockByteSource {
        async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut chunks = self.chunks.lock().unwrap();

            match chunks.pop_front() {
                None => Err(io::ErrorKind::WouldBlock.into()),
                Some(Err(e)) => Err(e),
                Some(Ok(mut bytes)) => {
                    if bytes.len() > buf.len() {
                        let rest = bytes.split_off(buf.len());
                        chunks.push_front(Ok(rest));
                    }
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_splits_oversized_chunks() {
            let mut source = MockByteSource::new();
            source.push_bytes(&[1, 2, 3, 4, 5]);

            let mut buf = [0u8; 3];
            assert_eq!(source.read(&mut buf).await.unwrap(), 3);
            assert_eq!(buf, [1, 2, 3]);

            let mut buf = [0u8; 3];
            assert_eq!(source.read(&mut buf).await.unwrap(), 2);
            assert_eq!(&buf[..2], &[4, 5]);
        }

        #[tokio::test]
        async fn test_mock_reports_would_block_when_drained() {
            let mut source = MockByteSource::new();
            let mut buf = [0u8; 8];

            let err = source.read(&mut buf).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        }
    }
}
