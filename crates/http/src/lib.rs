#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # The http/1.x request-response channel for the weir toolkit
//!
//! This crate coordinates one http connection's in-flight request: it is
//! the sink for an incremental parser's events, the owner of the
//! [`Request`] and [`Response`] the application works against, and the
//! dispatch loop an executor runs. It does not parse bytes and it does
//! not own a socket; a parser pushes events in through [`ParseEvents`]
//! and response bytes leave through a [`Transport`].
//!
//! ## Stability
//!
//! This is not yet a 1.0 crate; expect lifecycle surface changes.

mod channel;
pub use channel::{AsyncHandle, Channel, ParseEvents, SERVER};

mod connector;
pub use connector::{Connector, Customizer, Endpoint, Executor, Handler, Scheduler};

mod error;
pub use error::{Error, Result};

mod headers;
pub use headers::{HeaderName, HeaderValue, HeaderValues, Headers, KnownHeaderName};

mod http_config;
pub use http_config::{DEFAULT_CONFIG, HttpConfig};

mod input;
pub use input::HttpInput;

mod method;
pub use method::Method;

mod output;
pub use output::HttpOutput;

mod request;
pub use request::{DispatcherType, ERROR_EXCEPTION, ERROR_EXCEPTION_TYPE, Request};

mod response;
pub use response::{Response, ResponseInfo};

mod state;
pub use state::{ChannelState, DispatchState};

mod status;
pub use status::Status;

mod transport;
pub use transport::{Http1Transport, Transport};

pub(crate) mod uri;
pub use uri::{HttpUri, canonical_path};

pub(crate) mod util;

mod version;
pub use version::Version;

pub use swansong::Swansong;
