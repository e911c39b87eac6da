use crate::{Channel, Headers, HttpInput, HttpUri, Method, Result, Version, util};
use encoding_rs::Encoding;
use hashbrown::HashMap;
use smartstring::alias::String as SmartString;
use std::{
    any::Any,
    fmt::{self, Debug, Formatter},
    sync::{Arc, Weak},
    time::SystemTime,
};

/// Request attribute key under which the exception-path stores the
/// failure that aborted a dispatch.
pub const ERROR_EXCEPTION: &str = "weir.error.exception";

/// Request attribute key under which the exception-path stores the kind
/// of the failure that aborted a dispatch.
pub const ERROR_EXCEPTION_TYPE: &str = "weir.error.exception-type";

/// How the current dispatch of a request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatcherType {
    /// the initial dispatch of a request
    #[default]
    Request,

    /// a redispatch of a previously suspended request
    Async,

    /// a dispatch to an error handler
    Error,
}

type Attributes = HashMap<SmartString, Arc<dyn Any + Send + Sync>>;

/// The accumulated state of one parsed request.
///
/// The parser populates this object through the channel before dispatch;
/// the dispatched worker owns it while the state machine is handling.
/// The back-reference to the channel is non-owning.
pub struct Request {
    method: Option<Method>,
    method_str: SmartString,
    uri: HttpUri,
    path_info: String,
    version: Version,
    server_name: Option<SmartString>,
    server_port: Option<u16>,
    headers: Headers,
    input: Arc<HttpInput>,
    channel: Weak<Channel>,
    dispatcher_type: DispatcherType,
    handled: bool,
    persistent: Option<bool>,
    character_encoding: Option<SmartString>,
    attributes: Attributes,
    time_stamp: Option<SystemTime>,
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method_str)
            .field("uri", &self.uri.raw())
            .field("path_info", &self.path_info)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("dispatcher_type", &self.dispatcher_type)
            .field("handled", &self.handled)
            .field("persistent", &self.persistent)
            .finish_non_exhaustive()
    }
}

impl Request {
    pub(crate) fn new(channel: Weak<Channel>, input: Arc<HttpInput>) -> Self {
        Self {
            method: None,
            method_str: SmartString::new(),
            uri: HttpUri::default(),
            path_info: String::new(),
            version: Version::Http0_9,
            server_name: None,
            server_port: None,
            headers: Headers::new(),
            input,
            channel,
            dispatcher_type: DispatcherType::Request,
            handled: false,
            persistent: None,
            character_encoding: None,
            attributes: Attributes::new(),
            time_stamp: None,
        }
    }

    /// the recognized method, if the raw method was one this crate knows
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// the method exactly as it appeared on the request line
    pub fn method_str(&self) -> &str {
        &self.method_str
    }

    /// install the parsed method
    pub fn set_method(&mut self, method: Option<Method>, raw: &str) {
        self.method = method;
        self.method_str = SmartString::from(raw);
    }

    /// the parsed request target
    pub fn uri(&self) -> &HttpUri {
        &self.uri
    }

    /// install the parsed request target
    pub fn set_uri(&mut self, uri: HttpUri) {
        self.uri = uri;
    }

    /// the decoded, canonicalized path
    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    /// install the decoded, canonicalized path
    pub fn set_path_info(&mut self, path_info: String) {
        self.path_info = path_info;
    }

    /// the protocol version of this request
    pub fn http_version(&self) -> Version {
        self.version
    }

    /// install the protocol version
    pub fn set_http_version(&mut self, version: Version) {
        self.version = version;
    }

    /// the server host name, from the Host header or request authority
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// install the server host name
    pub fn set_server_name(&mut self, server_name: impl Into<SmartString>) {
        self.server_name = Some(server_name.into());
    }

    /// the server port, from the Host header or request authority
    pub fn server_port(&self) -> Option<u16> {
        self.server_port
    }

    /// install the server port
    pub fn set_server_port(&mut self, server_port: Option<u16>) {
        self.server_port = server_port;
    }

    /// returns the request header multimap
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// returns the request header multimap for mutation
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Install a charset token taken from the Content-Type header. The
    /// token is not validated here; resolution happens at first use.
    pub fn set_character_encoding_unchecked(&mut self, charset: Option<SmartString>) {
        self.character_encoding = charset;
    }

    /// the raw charset token from the Content-Type header, if any
    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    /// Resolve the request charset to an [`Encoding`]. `None` when no
    /// charset was supplied or the supplied token is not a recognized
    /// encoding label.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.character_encoding
            .as_deref()
            .and_then(util::encoding_for_charset)
    }

    /// how the current dispatch was initiated
    pub fn dispatcher_type(&self) -> DispatcherType {
        self.dispatcher_type
    }

    /// record how the current dispatch was initiated
    pub fn set_dispatcher_type(&mut self, dispatcher_type: DispatcherType) {
        self.dispatcher_type = dispatcher_type;
    }

    /// has the application taken responsibility for this request?
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// record whether the application has taken responsibility for this
    /// request. A request left unhandled with an uncommitted response is
    /// answered with a 404 at completion.
    pub fn set_handled(&mut self, handled: bool) {
        self.handled = handled;
    }

    /// whether the connection may carry further requests after this one,
    /// as determined at header-complete. `None` before that point.
    pub fn persistent(&self) -> Option<bool> {
        self.persistent
    }

    /// is this connection persistent?
    pub fn is_persistent(&self) -> bool {
        self.persistent.unwrap_or(false)
    }

    /// record the persistence decision
    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = Some(persistent);
    }

    /// the wall-clock time at which the first byte of this request was
    /// seen
    pub fn time_stamp(&self) -> Option<SystemTime> {
        self.time_stamp
    }

    /// record the request arrival time
    pub fn set_time_stamp(&mut self, time_stamp: SystemTime) {
        self.time_stamp = Some(time_stamp);
    }

    /// retrieve a named attribute
    pub fn attribute(&self, name: &str) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.attributes.get(name)
    }

    /// install a named attribute
    pub fn set_attribute(
        &mut self,
        name: impl Into<SmartString>,
        value: Arc<dyn Any + Send + Sync>,
    ) {
        self.attributes.insert(name.into(), value);
    }

    /// remove a named attribute, returning it
    pub fn remove_attribute(&mut self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.attributes.remove(name)
    }

    /// Returns the body input stream.
    ///
    /// The first call on a request that demanded `100-continue` commits
    /// the interim response, which is why this is fallible.
    pub fn http_input(&self) -> Result<Arc<HttpInput>> {
        if let Some(channel) = self.channel.upgrade() {
            channel.continue_100(self.input.available())?;
        }
        Ok(Arc::clone(&self.input))
    }

    pub(crate) fn input(&self) -> &Arc<HttpInput> {
        &self.input
    }

    /// Reset every per-request field. The input is reset separately.
    pub fn recycle(&mut self) {
        self.method = None;
        self.method_str.clear();
        self.uri = HttpUri::default();
        self.path_info.clear();
        self.version = Version::Http0_9;
        self.server_name = None;
        self.server_port = None;
        self.headers.clear();
        self.dispatcher_type = DispatcherType::Request;
        self.handled = false;
        self.persistent = None;
        self.character_encoding = None;
        self.attributes.clear();
        self.time_stamp = None;
    }
}
