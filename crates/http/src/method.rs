use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// HTTP request methods.
///
/// Parsers may encounter methods outside this set; those are carried on
/// the request as a raw string only.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// The CONNECT method requests that the recipient establish a tunnel to
    /// the destination origin server identified by the request-target.
    ///
    /// See [RFC7231, Section 4.3.6](https://tools.ietf.org/html/rfc7231#section-4.3.6)
    Connect,

    /// The DELETE method requests that the origin server remove the
    /// association between the target resource and its current
    /// functionality.
    ///
    /// See [RFC7231, Section 4.3.5](https://tools.ietf.org/html/rfc7231#section-4.3.5)
    Delete,

    /// The GET method requests transfer of a current selected
    /// representation for the target resource.
    ///
    /// See [RFC7231, Section 4.3.1](https://tools.ietf.org/html/rfc7231#section-4.3.1)
    Get,

    /// The HEAD method is identical to GET except that the server MUST NOT
    /// send a message body in the response.
    ///
    /// See [RFC7231, Section 4.3.2](https://tools.ietf.org/html/rfc7231#section-4.3.2)
    Head,

    /// The OPTIONS method requests information about the communication
    /// options available for the target resource.
    ///
    /// See [RFC7231, Section 4.3.7](https://tools.ietf.org/html/rfc7231#section-4.3.7)
    Options,

    /// The PATCH method requests that a set of changes described in the
    /// request entity be applied to the target resource.
    ///
    /// See [RFC5789, Section 2](https://tools.ietf.org/html/rfc5789#section-2)
    Patch,

    /// The POST method requests that the target resource process the
    /// representation enclosed in the request.
    ///
    /// See [RFC7231, Section 4.3.3](https://tools.ietf.org/html/rfc7231#section-4.3.3)
    Post,

    /// The PUT method requests that the state of the target resource be
    /// created or replaced with the enclosed representation.
    ///
    /// See [RFC7231, Section 4.3.4](https://tools.ietf.org/html/rfc7231#section-4.3.4)
    Put,

    /// The TRACE method requests a remote, application-level loop-back of
    /// the request message.
    ///
    /// See [RFC7231, Section 4.3.8](https://tools.ietf.org/html/rfc7231#section-4.3.8)
    Trace,
}

impl Method {
    /// the method name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Connect => "CONNECT",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Trace => "TRACE",
        }
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Method::Connect),
            "DELETE" => Ok(Method::Delete),
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "TRACE" => Ok(Method::Trace),
            _ => Err(()),
        }
    }
}
