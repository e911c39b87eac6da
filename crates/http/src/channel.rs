use crate::{
    ChannelState, Connector, DispatcherType, Endpoint, Error, HeaderName, HttpConfig, HttpInput,
    HttpUri, KnownHeaderName, Method, Request, Response, ResponseInfo, Result, Status, Transport,
    Version,
    request::{ERROR_EXCEPTION, ERROR_EXCEPTION_TYPE},
    uri::canonical_path,
    util,
};
use smartstring::alias::String as SmartString;
use std::{
    cell::RefCell,
    fmt::{self, Debug, Formatter},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::SystemTime,
};

/// Default Server header
pub const SERVER: &str = concat!("weir/", env!("CARGO_PKG_VERSION"));

thread_local! {
    static CURRENT: RefCell<Option<Weak<Channel>>> = const { RefCell::new(None) };
}

/// The callback surface an incremental HTTP/1.x parser drives.
///
/// Each boolean return is a suspend-request: true asks the parser to
/// stop feeding events until it is resumed externally, false to
/// continue.
pub trait ParseEvents {
    /// a request line was parsed
    fn start_request(
        &self,
        method: Option<Method>,
        method_str: &str,
        uri: &str,
        version: Option<Version>,
    ) -> bool;

    /// A header field was parsed. `header` is present when the name is
    /// one this crate recognizes; `name` is absent for folded
    /// continuation values, which are dropped.
    fn parsed_header(
        &self,
        header: Option<KnownHeaderName>,
        name: Option<&str>,
        value: Option<&str>,
    ) -> bool;

    /// the authority of the Host header was parsed
    fn parsed_host_header(&self, host: &str, port: Option<u16>) -> bool;

    /// the header section is complete
    fn header_complete(&self) -> bool;

    /// a buffer of body content arrived
    fn content(&self, content: &[u8]) -> bool;

    /// the message is complete
    fn message_complete(&self, content_length: u64) -> bool;

    /// the connection closed before the message was complete
    fn early_eof(&self) -> bool;

    /// The request was malformed. Answers with a synthetic response in
    /// the 4xx range and completes the channel, bypassing the
    /// application entirely.
    fn bad_message(&self, status: u16, reason: Option<&str>);
}

/// One HTTP request/response coordination unit, associated with one
/// connection and one in-flight request at a time.
///
/// The channel bridges three parties: a parser pushes events into it
/// through [`ParseEvents`], an executor runs its dispatch loop through
/// [`run`][Channel::run], and the application works against the
/// [`Request`] and [`Response`] it owns. The [`ChannelState`] machine is
/// the only synchronization point between them.
pub struct Channel {
    weak: Weak<Channel>,
    connector: Arc<Connector>,
    config: HttpConfig,
    endpoint: Arc<dyn Endpoint>,
    transport: Arc<dyn Transport>,
    state: ChannelState,
    request: Mutex<Request>,
    response: Mutex<Response>,
    input: Arc<HttpInput>,
    committed: AtomicBool,
    requests_handled: AtomicU64,
    expect_100_continue: AtomicBool,
    expect_102_processing: AtomicBool,
    unsupported_expectation: AtomicBool,
}

impl Debug for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state.state())
            .field("committed", &self.committed)
            .field("requests_handled", &self.requests_handled)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Builds a channel over its borrowed collaborators. The channel
    /// exclusively owns its request, response, state, and input.
    pub fn new(
        connector: Arc<Connector>,
        config: HttpConfig,
        endpoint: Arc<dyn Endpoint>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let input = Arc::new(HttpInput::new());
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            request: Mutex::new(Request::new(weak.clone(), Arc::clone(&input))),
            response: Mutex::new(Response::new(weak.clone(), config.response_buffer_len)),
            input,
            connector,
            config,
            endpoint,
            transport,
            state: ChannelState::new(),
            committed: AtomicBool::new(false),
            requests_handled: AtomicU64::new(0),
            expect_100_continue: AtomicBool::new(false),
            expect_102_processing: AtomicBool::new(false),
            unsupported_expectation: AtomicBool::new(false),
        })
    }

    /// The channel currently being dispatched on this thread, if any.
    /// Installed for the duration of [`run`][Channel::run] so that
    /// helpers can locate their channel without plumbing.
    pub fn current() -> Option<Arc<Channel>> {
        CURRENT.with(|current| current.borrow().as_ref().and_then(Weak::upgrade))
    }

    /// the request being accumulated or handled
    pub fn request(&self) -> MutexGuard<'_, Request> {
        self.request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// the response being accumulated
    pub fn response(&self) -> MutexGuard<'_, Response> {
        self.response.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// a writable handle on the response body
    pub fn output(&self) -> crate::HttpOutput {
        crate::HttpOutput::new(self.weak.clone())
    }

    /// the lifecycle state machine
    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    /// the endpoint this channel is bound to
    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    /// this channel's configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// has the response status line been sent?
    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }

    /// how many requests have reached header-complete on this channel
    pub fn requests_handled(&self) -> u64 {
        self.requests_handled.load(Ordering::SeqCst)
    }

    /// The dispatch entry point: the executor invokes this once per
    /// dispatch. Each invocation handles the initial request, a resumed
    /// dispatch, or cleanup; the state machine decides which.
    pub fn run(&self) {
        let _current = CurrentGuard::install(self.weak.clone());
        let _running = self.connector.swansong().guard();
        self.handle();
    }

    fn handle(&self) {
        log::debug!("dispatching channel in state {:?}", self.state.state());

        if self.state.handling() {
            loop {
                if !self.connector.is_running() {
                    break;
                }

                self.request().set_handled(false);
                self.response().reopen();

                let result = if self.state.is_initial() {
                    self.request().set_dispatcher_type(DispatcherType::Request);
                    self.connector.customize(&mut self.request());
                    self.connector.handler().handle(self)
                } else {
                    self.request().set_dispatcher_type(DispatcherType::Async);
                    if self.state.take_expired() {
                        Err(Error::Timeout)
                    } else {
                        self.connector.handler().handle_async(self)
                    }
                };

                match result {
                    Ok(()) => {}
                    Err(e) if e.is_closed() => {
                        log::debug!("connection closed during dispatch: {e}");
                        self.state.error(Arc::new(e));
                        self.request().set_handled(true);
                    }
                    Err(e) => {
                        self.request().set_handled(true);
                        self.handle_exception(e);
                    }
                }

                if self.state.unhandle() {
                    break;
                }
            }
        }

        if self.state.is_suspended() {
            self.schedule_expiry();
        }

        if self.state.is_completing() && self.state.completed() {
            self.on_completed();
        }
    }

    fn on_completed(&self) {
        if let Some(failure) = self.state.take_failure() {
            log::debug!("request completed after failure: {failure}");
        }

        let result = (|| -> Result<()> {
            if self.expect_100_continue.swap(false, Ordering::SeqCst) {
                // 100-continue was promised but the body was never read
                if self.is_committed() {
                    log::warn!("could not make channel non-persistent: response committed");
                } else {
                    self.response()
                        .headers_mut()
                        .insert(KnownHeaderName::Connection, "close");
                    self.request().set_persistent(false);
                }
            }

            if !self.is_committed() && !self.request().is_handled() {
                self.response().send_error(Status::NotFound, None)?;
            }

            self.response().complete()
        })();

        match result {
            Err(e) if e.is_closed() => log::debug!("connection closed during completion: {e}"),
            Err(e) => log::warn!("unable to complete response: {e}"),
            Ok(()) => {}
        }

        self.request().set_handled(true);
        self.transport.channel_completed();
    }

    fn schedule_expiry(&self) {
        let (Some(scheduler), Some(timeout)) =
            (self.connector.scheduler(), self.config.idle_timeout)
        else {
            return;
        };

        let weak = self.weak.clone();
        let epoch = self.state.suspend_epoch();
        scheduler.schedule(
            timeout,
            Box::new(move || {
                if let Some(channel) = weak.upgrade() {
                    if channel.state.expired(epoch) {
                        channel.connector.execute_channel(Arc::clone(&channel));
                    }
                }
            }),
        );
    }

    /// The application requests suspension of the current dispatch. The
    /// handler returns normally afterwards; the dispatch loop observes
    /// the suspension and exits, and the returned handle resumes or
    /// completes the request later.
    pub fn start_async(&self) -> Result<AsyncHandle> {
        self.state.async_started()?;
        Ok(AsyncHandle {
            channel: self.weak.clone(),
        })
    }

    /// Send the interim `100 Continue` response if the client demanded
    /// one and no body content has arrived yet. Invoked when the
    /// application first asks for the input stream.
    ///
    /// # Errors
    ///
    /// [`Error::Committed`] when the response committed before the
    /// interim response could be sent, [`Error::ConcurrentCommit`] when
    /// another writer raced the commit.
    pub fn continue_100(&self, available: usize) -> Result<()> {
        if !self.expect_100_continue.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if available == 0 {
            if self.is_committed() {
                return Err(Error::Committed);
            }
            let info = ResponseInfo::synthetic(Version::Http1_1, Status::Continue, None);
            if !self.commit_response(&info, &[], false)? {
                return Err(Error::ConcurrentCommit);
            }
        }
        Ok(())
    }

    /// Send the interim `102 Processing` response, if the client asked
    /// for progress reports and the response has not yet committed.
    /// No-op otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentCommit`] when another writer raced the commit.
    pub fn send_processing(&self) -> Result<()> {
        if self.expect_102_processing.load(Ordering::SeqCst) && !self.is_committed() {
            let info = ResponseInfo::synthetic(Version::Http1_1, Status::Processing, None);
            if !self.commit_response(&info, &[], false)? {
                return Err(Error::ConcurrentCommit);
            }
        }
        Ok(())
    }

    /// Atomically claim the one-shot commit and, on success, hand `info`
    /// and `content` to the transport. Returns false to a caller that
    /// lost the claim. An interim (1xx) commit releases the claim again
    /// so that the final response can still commit.
    pub fn commit_response(
        &self,
        info: &ResponseInfo,
        content: &[u8],
        complete: bool,
    ) -> Result<bool> {
        if self
            .committed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        let result = self.transport.commit(info, content, complete);
        if info.status().is_informational() {
            self.committed.store(false, Ordering::SeqCst);
        }
        result.map(|()| true)
    }

    /// Write response content. Before the commit this snapshots the
    /// response and commits it; afterwards content flows straight
    /// through to the transport.
    ///
    /// # Errors
    ///
    /// [`Error::ConcurrentCommit`] when another writer committed between
    /// the snapshot and the claim.
    pub fn write(&self, content: &[u8], complete: bool) -> Result<()> {
        let info = self.response().new_response_info();
        self.write_with_info(info, content, complete)
    }

    pub(crate) fn write_with_info(
        &self,
        info: ResponseInfo,
        content: &[u8],
        complete: bool,
    ) -> Result<()> {
        if self.is_committed() {
            self.transport.write(content, complete)
        } else if self.commit_response(&info, content, complete)? {
            Ok(())
        } else {
            Err(Error::ConcurrentCommit)
        }
    }

    /// Map a dispatch failure onto the response.
    ///
    /// When the application has suspended, another thread may be writing
    /// the response output concurrently, so a synthetic 500 with an
    /// empty header block is committed directly, bypassing the response
    /// object. Otherwise the error attributes are set on the request and
    /// the response renders an error page through
    /// [`Response::send_error`].
    pub fn handle_exception(&self, error: Error) {
        if self.state.is_suspended() {
            log::debug!("suspended channel failed, committing direct 500: {error}");
            self.state.error(Arc::new(error));
            let info =
                ResponseInfo::synthetic(Version::Http1_1, Status::InternalServerError, None);
            match self.commit_response(&info, &[], true) {
                Ok(true) => {}
                Ok(false) => log::debug!("response already committed, dropping direct 500"),
                Err(e) => log::debug!("unable to commit direct 500: {e}"),
            }
        } else {
            let message = error.to_string();
            let kind = error.kind();
            let shared = Arc::new(error);
            self.state.error(Arc::clone(&shared));
            {
                let mut request = self.request();
                request.set_attribute(ERROR_EXCEPTION, shared);
                request.set_attribute(ERROR_EXCEPTION_TYPE, Arc::new(kind));
            }
            if let Err(e) = self
                .response()
                .send_error(Status::InternalServerError, Some(&message))
            {
                log::debug!("unable to render error page: {e}");
            }
        }
    }

    /// Return the channel to its pre-request state so a persistent
    /// connection can carry its next request. Idempotent.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] unless the channel is idle or completed.
    pub fn reset(&self) -> Result<()> {
        if !self.state.is_reusable() {
            return Err(Error::IllegalState(self.state.state()));
        }

        self.committed.store(false, Ordering::SeqCst);
        self.expect_100_continue.store(false, Ordering::SeqCst);
        self.expect_102_processing.store(false, Ordering::SeqCst);
        self.unsupported_expectation.store(false, Ordering::SeqCst);
        self.request().recycle();
        self.response().recycle();
        self.input.recycle();
        self.state.recycle();
        Ok(())
    }

    fn parsed_expect_token(&self, token: &str) -> bool {
        match util::expectation(token) {
            Some(util::Expectation::Continue100) => {
                self.expect_100_continue.store(true, Ordering::SeqCst);
                true
            }
            Some(util::Expectation::Processing102) => {
                self.expect_102_processing.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

impl ParseEvents for Channel {
    fn start_request(
        &self,
        method: Option<Method>,
        method_str: &str,
        uri: &str,
        version: Option<Version>,
    ) -> bool {
        log::trace!("start request: {method_str} {uri}");

        self.expect_100_continue.store(false, Ordering::SeqCst);
        self.expect_102_processing.store(false, Ordering::SeqCst);
        self.unsupported_expectation.store(false, Ordering::SeqCst);

        let version = version.unwrap_or(Version::Http0_9);
        let parsed = if method == Some(Method::Connect) {
            HttpUri::parse_authority(uri)
        } else {
            HttpUri::parse_origin(uri)
        };
        let path_info = match canonical_path(&parsed.decoded_path()) {
            Some(path) if !path.is_empty() => path,
            _ => String::from("/"),
        };

        {
            let mut request = self.request();
            if request.time_stamp().is_none() {
                request.set_time_stamp(SystemTime::now());
            }
            request.set_method(method, method_str);
            request.set_path_info(path_info);
            request.set_uri(parsed);
            request.set_http_version(version);
        }
        {
            let mut response = self.response();
            response.set_version(version);
            response.set_head(method == Some(Method::Head));
        }

        false
    }

    fn parsed_header(
        &self,
        header: Option<KnownHeaderName>,
        name: Option<&str>,
        value: Option<&str>,
    ) -> bool {
        let value = value.unwrap_or("");

        match header {
            Some(KnownHeaderName::Expect) => {
                if !self.parsed_expect_token(value) {
                    for token in value.split(',') {
                        if !self.parsed_expect_token(token) {
                            // an expectation we cannot satisfy
                            self.unsupported_expectation.store(true, Ordering::SeqCst);
                        }
                    }
                }
            }
            Some(KnownHeaderName::ContentType) => {
                self.request()
                    .set_character_encoding_unchecked(util::charset_token(value));
            }
            _ => {}
        }

        match (header, name) {
            (Some(header), _) => self.request().headers_mut().append(header, value.to_string()),
            (None, Some(name)) => self
                .request()
                .headers_mut()
                .append(HeaderName::from(name.to_string()), value.to_string()),
            (None, None) => log::trace!("dropping folded header value {value:?}"),
        }

        false
    }

    fn parsed_host_header(&self, host: &str, port: Option<u16>) -> bool {
        let mut request = self.request();
        request.set_server_name(host);
        request.set_server_port(port);
        false
    }

    fn header_complete(&self) -> bool {
        self.requests_handled.fetch_add(1, Ordering::SeqCst);

        let (version, time_stamp, has_host) = {
            let request = self.request();
            (
                request.http_version(),
                request.time_stamp(),
                request.server_name().is_some(),
            )
        };

        let persistent = match version {
            Version::Http0_9 => false,
            Version::Http1_0 => {
                let keep_alive = self
                    .request()
                    .headers()
                    .contains_token(KnownHeaderName::Connection, "keep-alive");
                if keep_alive {
                    self.response()
                        .headers_mut()
                        .append(KnownHeaderName::Connection, "keep-alive");
                }
                keep_alive
            }
            _ => {
                let close = self
                    .request()
                    .headers()
                    .contains_token(KnownHeaderName::Connection, "close");
                if close {
                    self.response()
                        .headers_mut()
                        .append(KnownHeaderName::Connection, "close");
                }
                if self.unsupported_expectation.swap(false, Ordering::SeqCst) {
                    self.bad_message(Status::ExpectationFailed as u16, None);
                    return true;
                }
                !close
            }
        };

        {
            let mut response = self.response();
            if self.config.send_server_header {
                response.headers_mut().try_insert(KnownHeaderName::Server, SERVER);
            }
            if self.config.send_date_header {
                let date = httpdate::fmt_http_date(time_stamp.unwrap_or_else(SystemTime::now));
                response.headers_mut().try_insert(KnownHeaderName::Date, date);
            }
        }

        if !has_host {
            let mut request = self.request();
            if let Some(host) = request.uri().host().map(SmartString::from) {
                let port = request.uri().port();
                request.set_server_name(host);
                request.set_server_port(port);
            } else if let Some(addr) = self.endpoint.local_addr() {
                request.set_server_name(addr.ip().to_string());
                request.set_server_port(Some(addr.port()));
            }
        }

        self.request().set_persistent(persistent);
        self.expect_100_continue.load(Ordering::SeqCst)
    }

    fn content(&self, content: &[u8]) -> bool {
        log::trace!("received {} body bytes", content.len());
        self.input.add_content(content.to_vec());
        true
    }

    fn message_complete(&self, content_length: u64) -> bool {
        log::trace!("message complete after {content_length} bytes");
        self.input.shutdown();
        true
    }

    fn early_eof(&self) -> bool {
        log::debug!("early eof");
        self.input.early_eof();
        false
    }

    fn bad_message(&self, status: u16, reason: Option<&str>) {
        let status = if (400..=599).contains(&status) {
            status
        } else {
            400
        };
        let status = Status::try_from(status).unwrap_or(Status::BadRequest);
        log::debug!("bad message: {status} {reason:?}");

        if self.state.handling() {
            let info = ResponseInfo::synthetic(Version::Http1_1, status, reason);
            match self.commit_response(&info, &[], true) {
                Ok(true) => {}
                Ok(false) => log::debug!("response already committed, dropping {status}"),
                Err(e) => log::debug!("unable to commit {status}: {e}"),
            }
            self.state.unhandle();
        }

        if self.state.completed() {
            self.transport.channel_completed();
        }
    }
}

struct CurrentGuard(Option<Weak<Channel>>);

impl CurrentGuard {
    fn install(weak: Weak<Channel>) -> Self {
        CURRENT.with(|current| Self(current.borrow_mut().replace(weak)))
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT.with(|current| *current.borrow_mut() = self.0.take());
    }
}

/// The application-facing resume/complete surface for a suspended
/// request. Holds a non-owning handle; operations on a channel that has
/// gone away are no-ops.
#[derive(Clone, Debug)]
pub struct AsyncHandle {
    channel: Weak<Channel>,
}

impl AsyncHandle {
    /// Resume the suspended request: the application will be re-entered
    /// through [`Handler::handle_async`][crate::Handler::handle_async].
    pub fn dispatch(&self) {
        if let Some(channel) = self.channel.upgrade() {
            if channel.state.dispatch() {
                channel.connector.execute_channel(Arc::clone(&channel));
            }
        }
    }

    /// Finish the suspended request without re-entering the application.
    pub fn complete(&self) {
        if let Some(channel) = self.channel.upgrade() {
            if channel.state.complete() {
                channel.connector.execute_channel(Arc::clone(&channel));
            }
        }
    }

    /// the channel this handle resumes, if it is still alive
    pub fn channel(&self) -> Option<Arc<Channel>> {
        self.channel.upgrade()
    }
}
