use crate::{Channel, Error, Result};
use std::{
    fmt::{self, Debug, Formatter},
    io,
    sync::{Arc, Weak},
};

/// The response body sink handed to the application.
///
/// Writes aggregate in the response's output buffer; once the buffer
/// crosses the configured length, the response commits and the content
/// flows through the channel to the transport. This is a cheap handle
/// and may be cloned; the channel reference is non-owning.
#[derive(Clone)]
pub struct HttpOutput {
    channel: Weak<Channel>,
}

impl Debug for HttpOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpOutput").finish_non_exhaustive()
    }
}

impl HttpOutput {
    pub(crate) fn new(channel: Weak<Channel>) -> Self {
        Self { channel }
    }

    fn channel(&self) -> Result<Arc<Channel>> {
        self.channel.upgrade().ok_or(Error::Closed)
    }

    /// Buffer `buf`, committing and flushing through the transport when
    /// the aggregation buffer fills.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let channel = self.channel()?;
        let flush = channel.response().buffer_write(buf)?;
        if let Some((info, content)) = flush {
            channel.write_with_info(info, &content, false)?;
        }
        Ok(buf.len())
    }

    /// Push all buffered content through the transport, committing the
    /// response if it is not yet committed.
    pub fn flush(&self) -> Result<()> {
        let channel = self.channel()?;
        if let Some((info, content)) = channel.response().take_buffered() {
            channel.write_with_info(info, &content, false)?;
        }
        Ok(())
    }
}

impl io::Write for HttpOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        HttpOutput::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        HttpOutput::flush(self).map_err(io::Error::other)
    }
}
