use crate::{
    Channel, Error, Headers, HttpOutput, KnownHeaderName, Result, Status, Version,
};
use smartstring::alias::String as SmartString;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Weak,
};

/// An immutable snapshot of everything the transport needs to serialize
/// a response head, produced at the moment of commit.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    version: Version,
    headers: Headers,
    content_length: Option<u64>,
    status: Status,
    reason: Option<SmartString>,
    head: bool,
}

impl ResponseInfo {
    /// a minimal response-info with an empty header block, used for
    /// interim and synthetic responses that bypass the response object
    pub fn synthetic(version: Version, status: Status, reason: Option<&str>) -> Self {
        Self {
            version,
            headers: Headers::new(),
            content_length: Some(0),
            status,
            reason: reason.map(SmartString::from),
            head: false,
        }
    }

    /// the protocol version for the status line
    pub fn version(&self) -> Version {
        self.version
    }

    /// the headers to serialize
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// the declared content length, if one was declared
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// the status code
    pub fn status(&self) -> Status {
        self.status
    }

    /// the reason phrase: an explicit override if one was set, otherwise
    /// the canonical reason for the status
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .unwrap_or_else(|| self.status.canonical_reason())
    }

    /// is this a response to a HEAD request?
    pub fn is_head(&self) -> bool {
        self.head
    }
}

/// The accumulated state of the response to the current request.
///
/// Mutations are permitted until the response commits. Afterwards the
/// fallible operations fail with [`Error::Committed`] and the
/// infallible setters log and drop.
pub struct Response {
    status: Option<Status>,
    reason: Option<SmartString>,
    headers: Headers,
    version: Version,
    head: bool,
    out_buffer: Vec<u8>,
    out_closed: bool,
    finished: bool,
    buffer_len: usize,
    channel: Weak<Channel>,
}

impl Debug for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("version", &self.version)
            .field("buffered", &self.out_buffer.len())
            .finish_non_exhaustive()
    }
}

impl Response {
    pub(crate) fn new(channel: Weak<Channel>, buffer_len: usize) -> Self {
        Self {
            status: None,
            reason: None,
            headers: Headers::new(),
            version: Version::Http1_1,
            head: false,
            out_buffer: Vec::new(),
            out_closed: false,
            finished: false,
            buffer_len,
            channel,
        }
    }

    /// the response status, if one has been set
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Sets the response status code from any `TryInto<Status>`. The
    /// status of a committed response has already been sent and cannot
    /// change; such calls are logged and dropped.
    pub fn set_status(&mut self, status: impl TryInto<Status>) {
        if self.is_committed() {
            log::error!("attempted to set a status on a committed response");
            return;
        }
        self.status = Some(status.try_into().unwrap_or_else(|_| {
            log::error!("attempted to set an invalid status code");
            Status::InternalServerError
        }));
    }

    /// overrides the reason phrase sent with the status line
    pub fn set_reason(&mut self, reason: impl Into<SmartString>) {
        if self.is_committed() {
            log::error!("attempted to set a reason on a committed response");
            return;
        }
        self.reason = Some(reason.into());
    }

    /// returns the response header multimap
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response header multimap for mutation. The headers
    /// of a committed response have already been serialized from a
    /// snapshot; later mutations are never sent.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// has the status line of this response been sent?
    pub fn is_committed(&self) -> bool {
        self.channel
            .upgrade()
            .is_none_or(|channel| channel.is_committed())
    }

    /// returns a writable handle on the response body
    pub fn http_output(&self) -> HttpOutput {
        HttpOutput::new(self.channel.clone())
    }

    /// Replace any buffered output with a short error body and install
    /// the error status. The response is left uncommitted; the dispatch
    /// loop's completion phase flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Committed`] when the response can no longer be
    /// changed.
    pub fn send_error(&mut self, status: Status, message: Option<&str>) -> Result<()> {
        if self.is_committed() {
            return Err(Error::Committed);
        }

        self.out_buffer.clear();
        self.status = Some(status);
        self.reason = None;
        self.headers.remove(KnownHeaderName::ContentLength);
        self.headers
            .insert(KnownHeaderName::ContentType, "text/plain; charset=utf-8");
        let body = match message {
            Some(message) => format!("Error {}: {message}\n", status as u16),
            None => format!("Error {status}\n"),
        };
        self.out_buffer.extend_from_slice(body.as_bytes());
        self.out_closed = true;
        Ok(())
    }

    /// produce the commit-time snapshot of this response
    pub fn new_response_info(&self) -> ResponseInfo {
        ResponseInfo {
            version: self.version,
            headers: self.headers.clone(),
            content_length: self
                .headers
                .get_str(KnownHeaderName::ContentLength)
                .and_then(|value| value.trim().parse().ok()),
            status: self.status.unwrap_or(Status::Ok),
            reason: self.reason.clone(),
            head: self.head,
        }
    }

    /// Flush remaining buffered output and instruct the transport to
    /// finalize the response. Idempotent.
    pub fn complete(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.out_closed = true;
        let content = std::mem::take(&mut self.out_buffer);
        let channel = self.channel.upgrade().ok_or(Error::Closed)?;
        channel.write_with_info(self.new_response_info(), &content, true)
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub(crate) fn set_head(&mut self, head: bool) {
        self.head = head;
    }

    pub(crate) fn reopen(&mut self) {
        self.out_closed = false;
    }

    pub(crate) fn buffer_write(&mut self, buf: &[u8]) -> Result<Option<(ResponseInfo, Vec<u8>)>> {
        if self.out_closed {
            return Err(Error::Closed);
        }
        self.out_buffer.extend_from_slice(buf);
        if self.out_buffer.len() >= self.buffer_len {
            let content = std::mem::take(&mut self.out_buffer);
            Ok(Some((self.new_response_info(), content)))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn take_buffered(&mut self) -> Option<(ResponseInfo, Vec<u8>)> {
        if self.finished {
            return None;
        }
        let content = std::mem::take(&mut self.out_buffer);
        Some((self.new_response_info(), content))
    }

    /// Reset status, reason, headers, and the output buffer.
    pub fn recycle(&mut self) {
        self.status = None;
        self.reason = None;
        self.headers.clear();
        self.version = Version::Http1_1;
        self.head = false;
        self.out_buffer.clear();
        self.out_closed = false;
        self.finished = false;
    }
}
