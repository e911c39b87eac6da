use std::time::Duration;

/// Tunable parameters for the channel.
#[derive(Clone, Copy, Debug)]
pub struct HttpConfig {
    pub(crate) response_buffer_len: usize,
    pub(crate) send_date_header: bool,
    pub(crate) send_server_header: bool,
    pub(crate) idle_timeout: Option<Duration>,
}

impl HttpConfig {
    /// Output written by the application is aggregated until it reaches
    /// this length, at which point the response commits and flushes.
    pub fn with_response_buffer_len(mut self, response_buffer_len: usize) -> Self {
        self.response_buffer_len = response_buffer_len;
        self
    }

    /// Whether a `Date` header is added to responses at header-complete
    /// time, stamped with the request timestamp.
    pub fn with_send_date_header(mut self, send_date_header: bool) -> Self {
        self.send_date_header = send_date_header;
        self
    }

    /// Whether a `Server` header identifying this crate is added to
    /// responses.
    pub fn with_send_server_header(mut self, send_server_header: bool) -> Self {
        self.send_server_header = send_server_header;
        self
    }

    /// How long a suspended channel may wait for a redispatch before the
    /// scheduler expires it with a 500. `None` disables expiry.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

/// The default [`HttpConfig`]
pub const DEFAULT_CONFIG: HttpConfig = HttpConfig {
    response_buffer_len: 8 * 1024,
    send_date_header: true,
    send_server_header: true,
    idle_timeout: Some(Duration::from_secs(30)),
};
