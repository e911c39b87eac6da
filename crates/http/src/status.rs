use crate::Error;
use std::fmt::{self, Debug, Display};

macro_rules! statuses {
    (
        $(
            ($code:literal, $variant:ident, $reason:literal)
        ),+
    ) => {
        /// HTTP response status codes.
        ///
        /// As defined by [rfc7231 section 6](https://tools.ietf.org/html/rfc7231#section-6).
        #[repr(u16)]
        #[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Status {
            $(
                #[doc = concat!($code, " ", $reason)]
                $variant = $code,
            )+
        }

        impl Status {
            /// The canonical reason phrase for this status code
            pub fn canonical_reason(&self) -> &'static str {
                match self {
                    $( Status::$variant => $reason, )+
                }
            }
        }

        impl std::convert::TryFrom<u16> for Status {
            type Error = Error;

            fn try_from(code: u16) -> Result<Self, Self::Error> {
                match code {
                    $( $code => Ok(Status::$variant), )+
                    _ => Err(Error::InvalidStatus),
                }
            }
        }
    }
}

statuses! {
    (100, Continue, "Continue"),
    (101, SwitchingProtocols, "Switching Protocols"),
    (102, Processing, "Processing"),
    (103, EarlyHints, "Early Hints"),
    (200, Ok, "OK"),
    (201, Created, "Created"),
    (202, Accepted, "Accepted"),
    (203, NonAuthoritativeInformation, "Non-Authoritative Information"),
    (204, NoContent, "No Content"),
    (205, ResetContent, "Reset Content"),
    (206, PartialContent, "Partial Content"),
    (207, MultiStatus, "Multi-Status"),
    (226, ImUsed, "IM Used"),
    (300, MultipleChoice, "Multiple Choice"),
    (301, MovedPermanently, "Moved Permanently"),
    (302, Found, "Found"),
    (303, SeeOther, "See Other"),
    (304, NotModified, "Not Modified"),
    (305, UseProxy, "Use Proxy"),
    (307, TemporaryRedirect, "Temporary Redirect"),
    (308, PermanentRedirect, "Permanent Redirect"),
    (400, BadRequest, "Bad Request"),
    (401, Unauthorized, "Unauthorized"),
    (402, PaymentRequired, "Payment Required"),
    (403, Forbidden, "Forbidden"),
    (404, NotFound, "Not Found"),
    (405, MethodNotAllowed, "Method Not Allowed"),
    (406, NotAcceptable, "Not Acceptable"),
    (407, ProxyAuthenticationRequired, "Proxy Authentication Required"),
    (408, RequestTimeout, "Request Timeout"),
    (409, Conflict, "Conflict"),
    (410, Gone, "Gone"),
    (411, LengthRequired, "Length Required"),
    (412, PreconditionFailed, "Precondition Failed"),
    (413, PayloadTooLarge, "Payload Too Large"),
    (414, UriTooLong, "URI Too Long"),
    (415, UnsupportedMediaType, "Unsupported Media Type"),
    (416, RequestedRangeNotSatisfiable, "Requested Range Not Satisfiable"),
    (417, ExpectationFailed, "Expectation Failed"),
    (418, ImATeapot, "I'm a teapot"),
    (421, MisdirectedRequest, "Misdirected Request"),
    (422, UnprocessableEntity, "Unprocessable Entity"),
    (423, Locked, "Locked"),
    (424, FailedDependency, "Failed Dependency"),
    (425, TooEarly, "Too Early"),
    (426, UpgradeRequired, "Upgrade Required"),
    (428, PreconditionRequired, "Precondition Required"),
    (429, TooManyRequests, "Too Many Requests"),
    (431, RequestHeaderFieldsTooLarge, "Request Header Fields Too Large"),
    (451, UnavailableForLegalReasons, "Unavailable For Legal Reasons"),
    (500, InternalServerError, "Internal Server Error"),
    (501, NotImplemented, "Not Implemented"),
    (502, BadGateway, "Bad Gateway"),
    (503, ServiceUnavailable, "Service Unavailable"),
    (504, GatewayTimeout, "Gateway Timeout"),
    (505, HttpVersionNotSupported, "HTTP Version Not Supported"),
    (506, VariantAlsoNegotiates, "Variant Also Negotiates"),
    (507, InsufficientStorage, "Insufficient Storage"),
    (508, LoopDetected, "Loop Detected"),
    (510, NotExtended, "Not Extended"),
    (511, NetworkAuthenticationRequired, "Network Authentication Required")
}

impl Status {
    /// is this status code in the 1xx informational range?
    pub fn is_informational(&self) -> bool {
        (*self as u16) < 200
    }
}

impl PartialEq<Status> for u16 {
    fn eq(&self, other: &Status) -> bool {
        *self == *other as u16
    }
}

impl PartialEq<u16> for Status {
    fn eq(&self, other: &u16) -> bool {
        *self as u16 == *other
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&(*self as u16), f)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", *self as u16, self.canonical_reason())
    }
}
