use event_listener::{Event, Listener};
use std::{
    collections::VecDeque,
    io::{self, ErrorKind, Read},
    sync::{Mutex, PoisonError},
};

/// The request body byte queue.
///
/// The parser side appends buffers as they arrive off the wire and the
/// application side drains them with blocking reads. Backpressure is the
/// parser's concern: the channel asks it to pause after every content
/// event, so the queue itself is unbounded.
#[derive(Debug, Default)]
pub struct HttpInput {
    inner: Mutex<Inner>,
    ready: Event,
}

#[derive(Debug, Default)]
struct Inner {
    chunks: VecDeque<Vec<u8>>,
    available: usize,
    shutdown: bool,
    early_eof: bool,
}

impl HttpInput {
    /// builds an empty open input
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a buffer of body content. Called by the producer side
    /// only; content arriving after shutdown is discarded.
    pub fn add_content(&self, content: Vec<u8>) {
        let mut inner = self.lock();
        if inner.shutdown {
            log::warn!("discarding {} bytes received after shutdown", content.len());
            return;
        }
        inner.available += content.len();
        inner.chunks.push_back(content);
        drop(inner);
        self.ready.notify(usize::MAX);
    }

    /// Mark the message as complete. Readers drain what remains and then
    /// observe end-of-stream.
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.ready.notify(usize::MAX);
    }

    /// Mark the connection as having closed before the message was
    /// complete. Readers drain what remains and then observe an
    /// [`ErrorKind::UnexpectedEof`] error.
    pub fn early_eof(&self) {
        let mut inner = self.lock();
        inner.shutdown = true;
        inner.early_eof = true;
        drop(inner);
        self.ready.notify(usize::MAX);
    }

    /// the number of bytes buffered and immediately readable
    pub fn available(&self) -> usize {
        self.lock().available
    }

    /// has this input been shut down, by message-complete or early eof?
    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Blocking read. Returns as soon as any content is available,
    /// `Ok(0)` at end-of-stream, or an error for a connection that
    /// closed mid-message.
    pub fn read_bytes(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let listener = {
                let mut inner = self.lock();
                if let Some(mut chunk) = inner.chunks.pop_front() {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        chunk.drain(..n);
                        inner.chunks.push_front(chunk);
                    }
                    inner.available -= n;
                    return Ok(n);
                }

                if inner.early_eof {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed before message complete",
                    ));
                }

                if inner.shutdown {
                    return Ok(0);
                }

                self.ready.listen()
            };

            listener.wait();
        }
    }

    /// Drain and return the entire body as a string, blocking until the
    /// message is complete.
    pub fn read_string(&self) -> crate::Result<String> {
        let mut bytes = Vec::new();
        let mut reader = self;
        reader.read_to_end(&mut bytes).map_err(crate::Error::from)?;
        String::from_utf8(bytes)
            .map_err(|e| crate::Error::Io(io::Error::new(ErrorKind::InvalidData, e)))
    }

    /// Return this input to its freshly-constructed state.
    pub fn recycle(&self) {
        let mut inner = self.lock();
        inner.chunks.clear();
        inner.available = 0;
        inner.shutdown = false;
        inner.early_eof = false;
    }
}

impl Read for &HttpInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn read_across_chunks() {
        let input = HttpInput::new();
        input.add_content(b"hello ".to_vec());
        input.add_content(b"world".to_vec());
        input.shutdown();
        assert_eq!(input.read_string().unwrap(), "hello world");
    }

    #[test]
    fn partial_chunk_reads() {
        let input = HttpInput::new();
        input.add_content(b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(input.read_bytes(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(input.available(), 2);
        assert_eq!(input.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[test]
    fn early_eof_errors_after_drain() {
        let input = HttpInput::new();
        input.add_content(b"partial".to_vec());
        input.early_eof();
        let mut buf = [0u8; 16];
        assert_eq!(input.read_bytes(&mut buf).unwrap(), 7);
        let err = input.read_bytes(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn blocking_read_wakes_on_content() {
        let input = std::sync::Arc::new(HttpInput::new());
        let reader = {
            let input = input.clone();
            thread::spawn(move || input.read_string().unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        input.add_content(b"late".to_vec());
        input.shutdown();
        assert_eq!(reader.join().unwrap(), "late");
    }

    #[test]
    fn recycle_reopens() {
        let input = HttpInput::new();
        input.add_content(b"x".to_vec());
        input.shutdown();
        input.recycle();
        assert_eq!(input.available(), 0);
        assert!(!input.is_shutdown());
    }
}
