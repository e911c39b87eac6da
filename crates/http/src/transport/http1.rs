use super::Transport;
use crate::{
    KnownHeaderName::{ContentLength, TransferEncoding},
    ResponseInfo, Result, Status, Version,
};
use std::{
    io::Write,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Identity,
    Chunked,
    CloseDelimited,
}

/// A [`Transport`] that serializes HTTP/1.x responses onto any blocking
/// [`Write`].
///
/// Framing is chosen at commit time: identity when a content length is
/// declared or derivable, chunked for streaming HTTP/1.1 responses, and
/// close-delimited for streaming HTTP/1.0 responses. Bodies are
/// suppressed for HEAD requests and for statuses that do not carry one.
#[derive(Debug)]
pub struct Http1Transport<W> {
    inner: Mutex<Inner<W>>,
}

#[derive(Debug)]
struct Inner<W> {
    writer: W,
    framing: Framing,
    suppress_body: bool,
    finished: bool,
}

impl<W: Write + Send> Http1Transport<W> {
    /// builds a transport writing to `writer`
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                writer,
                framing: Framing::Identity,
                suppress_body: false,
                finished: false,
            }),
        }
    }

    /// consume the transport, returning the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }

    fn lock(&self) -> MutexGuard<'_, Inner<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn body_suppressed(info: &ResponseInfo) -> bool {
    info.is_head()
        || info.status().is_informational()
        || matches!(info.status(), Status::NoContent | Status::NotModified)
}

impl<W: Write + Send> Inner<W> {
    fn write_head(&mut self, info: &ResponseInfo, content: &[u8], complete: bool) -> Result<()> {
        write!(
            self.writer,
            "{} {} {}\r\n",
            info.version(),
            info.status() as u16,
            info.reason()
        )?;

        for (name, values) in info.headers() {
            if !name.is_valid() {
                log::error!("skipping invalid header with name {name:?}");
                continue;
            }
            for value in values {
                if value.is_valid() {
                    write!(self.writer, "{name}: ")?;
                    self.writer.write_all(value.as_ref())?;
                    write!(self.writer, "\r\n")?;
                } else {
                    log::error!("skipping invalid header value {value:?} for header {name}");
                }
            }
        }

        self.suppress_body = body_suppressed(info);
        let declared = info.headers().has_header(ContentLength)
            || info.headers().has_header(TransferEncoding);

        self.framing = if self.suppress_body {
            if let Some(len) = info.content_length().filter(|_| !declared) {
                if !info.status().is_informational() {
                    write!(self.writer, "Content-Length: {len}\r\n")?;
                }
            }
            Framing::Identity
        } else if let Some(len) = info.content_length() {
            if !declared {
                write!(self.writer, "Content-Length: {len}\r\n")?;
            }
            Framing::Identity
        } else if declared {
            // a transfer-encoding the application chose itself
            Framing::Identity
        } else if complete {
            write!(self.writer, "Content-Length: {}\r\n", content.len())?;
            Framing::Identity
        } else if info.version() >= Version::Http1_1 {
            write!(self.writer, "Transfer-Encoding: chunked\r\n")?;
            Framing::Chunked
        } else {
            Framing::CloseDelimited
        };

        write!(self.writer, "\r\n")?;
        Ok(())
    }

    fn write_content(&mut self, content: &[u8], complete: bool) -> Result<()> {
        if !self.suppress_body {
            match self.framing {
                Framing::Identity | Framing::CloseDelimited => {
                    self.writer.write_all(content)?;
                }
                Framing::Chunked => {
                    if !content.is_empty() {
                        write!(self.writer, "{:X}\r\n", content.len())?;
                        self.writer.write_all(content)?;
                        write!(self.writer, "\r\n")?;
                    }
                }
            }
        }

        if complete {
            if self.framing == Framing::Chunked && !self.suppress_body {
                write!(self.writer, "0\r\n\r\n")?;
            }
            self.finished = true;
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> Transport for Http1Transport<W> {
    fn commit(&self, info: &ResponseInfo, content: &[u8], complete: bool) -> Result<()> {
        let mut inner = self.lock();
        log::trace!("sending:\n{} {}\n{}", info.version(), info.status(), info.headers());

        if info.version() == Version::Http0_9 {
            // 0.9 responses are body-only
            inner.suppress_body = false;
            inner.framing = Framing::CloseDelimited;
        } else {
            inner.write_head(info, content, complete)?;
        }

        if info.status().is_informational() {
            // the real response head is still to come
            inner.writer.flush()?;
            return Ok(());
        }

        inner.write_content(content, complete)
    }

    fn write(&self, content: &[u8], complete: bool) -> Result<()> {
        let mut inner = self.lock();
        if inner.finished {
            log::debug!("dropping {} bytes written after response end", content.len());
            return Ok(());
        }
        inner.write_content(content, complete)
    }

    fn channel_completed(&self) {
        let mut inner = self.lock();
        if let Err(e) = inner.writer.flush() {
            log::debug!("flush on channel completion failed: {e}");
        }
    }
}
