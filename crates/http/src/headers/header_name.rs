use smartcow::SmartCow;
use std::{
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

/// The name of an http header, either a [`KnownHeaderName`] or a
/// case-insensitively-compared string.
#[derive(Clone, Debug)]
pub enum HeaderName<'a> {
    /// a header name that this crate recognizes
    KnownHeader(KnownHeaderName),

    /// any other header name
    UnknownHeader(SmartCow<'a>),
}

impl HeaderName<'_> {
    /// Take ownership of this header name, upgrading any borrowed
    /// content
    pub fn into_owned(self) -> HeaderName<'static> {
        match self {
            HeaderName::KnownHeader(known) => HeaderName::KnownHeader(known),
            HeaderName::UnknownHeader(unknown) => HeaderName::UnknownHeader(unknown.into_owned()),
        }
    }

    /// a header name is serializable if it contains only http token
    /// characters
    pub fn is_valid(&self) -> bool {
        match self {
            HeaderName::KnownHeader(_) => true,
            HeaderName::UnknownHeader(unknown) => {
                !unknown.is_empty() && unknown.bytes().all(is_tchar)
            }
        }
    }
}

fn is_tchar(c: u8) -> bool {
    matches!(
        c,
        b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
    )
}

impl<'a, 'b> PartialEq<HeaderName<'b>> for HeaderName<'a> {
    fn eq(&self, other: &HeaderName<'b>) -> bool {
        match (self, other) {
            (HeaderName::KnownHeader(kh1), HeaderName::KnownHeader(kh2)) => kh1 == kh2,
            (HeaderName::UnknownHeader(u1), HeaderName::UnknownHeader(u2)) => {
                u1.eq_ignore_ascii_case(u2)
            }
            _ => false,
        }
    }
}

impl Eq for HeaderName<'_> {}

impl PartialEq<KnownHeaderName> for HeaderName<'_> {
    fn eq(&self, other: &KnownHeaderName) -> bool {
        match self {
            HeaderName::KnownHeader(k) => k == other,
            HeaderName::UnknownHeader(_) => false,
        }
    }
}

impl Hash for HeaderName<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            HeaderName::KnownHeader(k) => k.hash(state),
            HeaderName::UnknownHeader(u) => {
                for byte in u.bytes().map(|b| b.to_ascii_lowercase()) {
                    state.write_u8(byte);
                }
            }
        }
    }
}

impl From<String> for HeaderName<'static> {
    fn from(s: String) -> Self {
        match s.parse::<KnownHeaderName>() {
            Ok(known) => Self::KnownHeader(known),
            Err(()) => Self::UnknownHeader(SmartCow::Owned(s.into())),
        }
    }
}

impl<'a> From<&'a str> for HeaderName<'a> {
    fn from(s: &'a str) -> Self {
        match s.parse::<KnownHeaderName>() {
            Ok(known) => Self::KnownHeader(known),
            Err(()) => Self::UnknownHeader(SmartCow::Borrowed(s)),
        }
    }
}

impl From<KnownHeaderName> for HeaderName<'_> {
    fn from(known: KnownHeaderName) -> Self {
        Self::KnownHeader(known)
    }
}

impl AsRef<str> for HeaderName<'_> {
    fn as_ref(&self) -> &str {
        match self {
            HeaderName::KnownHeader(known) => known.as_ref(),
            HeaderName::UnknownHeader(unknown) => unknown.as_ref(),
        }
    }
}

impl Display for HeaderName<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

macro_rules! known_headers {
    (
        $(
            ($capitalized:literal, $variant:tt)
        ),+
    ) => {
        /// A short nonexhaustive enum of headers that this crate
        /// recognizes, compared and hashed by discriminant
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        #[non_exhaustive]
        pub enum KnownHeaderName {
            $(
                #[doc = concat!("The `", $capitalized, "` header")]
                $variant,
            )+
        }

        impl AsRef<str> for KnownHeaderName {
            fn as_ref(&self) -> &str {
                match self {
                    $( Self::$variant => $capitalized, )+
                }
            }
        }

        impl Display for KnownHeaderName {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_ref())
            }
        }

        impl FromStr for KnownHeaderName {
            type Err = ();
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if !s.is_ascii() { return Err(()); }

                $( if s.eq_ignore_ascii_case($capitalized) { Ok(Self::$variant) } else )+
                { Err(()) }
            }
        }
    }
}

known_headers! {
    ("Accept", Accept),
    ("Accept-Charset", AcceptCharset),
    ("Accept-Encoding", AcceptEncoding),
    ("Accept-Language", AcceptLanguage),
    ("Accept-Ranges", AcceptRanges),
    ("Age", Age),
    ("Allow", Allow),
    ("Authorization", Authorization),
    ("Cache-Control", CacheControl),
    ("Connection", Connection),
    ("Content-Disposition", ContentDisposition),
    ("Content-Encoding", ContentEncoding),
    ("Content-Language", ContentLanguage),
    ("Content-Length", ContentLength),
    ("Content-Location", ContentLocation),
    ("Content-Range", ContentRange),
    ("Content-Type", ContentType),
    ("Cookie", Cookie),
    ("Date", Date),
    ("ETag", Etag),
    ("Expect", Expect),
    ("Expires", Expires),
    ("Forwarded", Forwarded),
    ("From", From),
    ("Host", Host),
    ("If-Match", IfMatch),
    ("If-Modified-Since", IfModifiedSince),
    ("If-None-Match", IfNoneMatch),
    ("If-Range", IfRange),
    ("If-Unmodified-Since", IfUnmodifiedSince),
    ("Keep-Alive", KeepAlive),
    ("Last-Modified", LastModified),
    ("Location", Location),
    ("Max-Forwards", MaxForwards),
    ("Origin", Origin),
    ("Pragma", Pragma),
    ("Proxy-Authenticate", ProxyAuthenticate),
    ("Proxy-Authorization", ProxyAuthorization),
    ("Range", Range),
    ("Referer", Referer),
    ("Retry-After", RetryAfter),
    ("Server", Server),
    ("Set-Cookie", SetCookie),
    ("TE", Te),
    ("Trailer", Trailer),
    ("Transfer-Encoding", TransferEncoding),
    ("Upgrade", Upgrade),
    ("User-Agent", UserAgent),
    ("Vary", Vary),
    ("Via", Via),
    ("Warning", Warning),
    ("WWW-Authenticate", WwwAuthenticate)
}
