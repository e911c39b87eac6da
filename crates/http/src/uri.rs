use memchr::memchr;
use smartstring::alias::String as SmartString;

/// The parsed target of a request line.
///
/// Parsing is tolerant: anything that cannot be interpreted as an
/// origin-form or absolute-form target is carried as an opaque path, and
/// decode failures fall back rather than erroring. Malformed requests
/// are rejected by the parser before they reach this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpUri {
    raw: String,
    host: Option<SmartString>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl HttpUri {
    /// parse an origin-form (`/path?query`) or absolute-form
    /// (`http://host:port/path?query`) request target
    pub fn parse_origin(raw: &str) -> Self {
        let mut uri = Self {
            raw: raw.to_string(),
            ..Self::default()
        };

        let rest = if let Some(after_scheme) = raw
            .strip_prefix("http://")
            .or_else(|| raw.strip_prefix("https://"))
        {
            match memchr(b'/', after_scheme.as_bytes()) {
                Some(slash) => {
                    let (authority, path) = after_scheme.split_at(slash);
                    let (host, port) = split_host_port(authority);
                    uri.host = Some(host.into());
                    uri.port = port;
                    path
                }
                None => {
                    let (host, port) = split_host_port(after_scheme);
                    uri.host = Some(host.into());
                    uri.port = port;
                    "/"
                }
            }
        } else {
            raw
        };

        match memchr(b'?', rest.as_bytes()) {
            Some(q) => {
                uri.path = rest[..q].to_string();
                uri.query = Some(rest[q + 1..].to_string());
            }
            None => uri.path = rest.to_string(),
        }

        uri
    }

    /// parse an authority-form (`host:port`) request target, as used by
    /// CONNECT
    pub fn parse_authority(raw: &str) -> Self {
        let (host, port) = split_host_port(raw);
        Self {
            raw: raw.to_string(),
            host: Some(host.into()),
            port,
            path: String::new(),
            query: None,
        }
    }

    /// the target exactly as it appeared on the request line
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// the authority host, if this target carried one
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// the authority port, if this target carried one
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// the undecoded path component
    pub fn path(&self) -> &str {
        &self.path
    }

    /// the query component, without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Percent-decode the path. The decoded bytes are interpreted as
    /// utf8 when possible, and as latin-1 otherwise.
    pub fn decoded_path(&self) -> String {
        let bytes = percent_decode(self.path.as_bytes());
        match String::from_utf8(bytes) {
            Ok(path) => path,
            Err(e) => {
                log::debug!("path {:?} is not utf8, decoding as latin-1", self.path);
                e.into_bytes().iter().map(|&b| char::from(b)).collect()
            }
        }
    }
}

fn split_host_port(authority: &str) -> (&str, Option<u16>) {
    // bracketed ipv6 hosts contain colons of their own
    if let Some(rest) = authority.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, port)) => (host, port.strip_prefix(':').and_then(|p| p.parse().ok())),
            None => (authority, None),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (authority, None),
        },
        None => (authority, None),
    }
}

fn percent_decode(encoded: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(encoded.len());
    let mut i = 0;
    while i < encoded.len() {
        match encoded[i] {
            b'%' if i + 2 < encoded.len() => {
                match (hex_val(encoded[i + 1]), hex_val(encoded[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    decoded
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Resolve `.` and `..` segments in a decoded path, preserving an
/// absolute prefix and any trailing slash. Returns `None` when `..`
/// would escape the root.
pub fn canonical_path(path: &str) -> Option<String> {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    let mut canonical = String::with_capacity(path.len());
    if absolute {
        canonical.push('/');
    }
    canonical.push_str(&segments.join("/"));
    if trailing && !canonical.ends_with('/') {
        canonical.push('/');
    }
    Some(canonical)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn origin_form() {
        let uri = HttpUri::parse_origin("/some/path?and&a=query");
        assert_eq!(uri.path(), "/some/path");
        assert_eq!(uri.query(), Some("and&a=query"));
        assert_eq!(uri.host(), None);
    }

    #[test]
    fn absolute_form() {
        let uri = HttpUri::parse_origin("http://example.com:8080/index?x");
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.port(), Some(8080));
        assert_eq!(uri.path(), "/index");
        assert_eq!(uri.query(), Some("x"));
    }

    #[test]
    fn authority_form() {
        let uri = HttpUri::parse_authority("example.com:443");
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.port(), Some(443));
        assert_eq!(uri.path(), "");
    }

    #[test]
    fn bracketed_ipv6_authority() {
        let uri = HttpUri::parse_authority("[::1]:8080");
        assert_eq!(uri.host(), Some("::1"));
        assert_eq!(uri.port(), Some(8080));
    }

    #[test]
    fn decodes_utf8_path() {
        let uri = HttpUri::parse_origin("/caf%C3%A9");
        assert_eq!(uri.decoded_path(), "café");
    }

    #[test]
    fn non_utf8_path_decodes_as_latin1() {
        let uri = HttpUri::parse_origin("/caf%E9");
        assert_eq!(uri.decoded_path(), "café");
    }

    #[test]
    fn invalid_escapes_pass_through() {
        let uri = HttpUri::parse_origin("/100%");
        assert_eq!(uri.decoded_path(), "/100%");
        let uri = HttpUri::parse_origin("/x%zz");
        assert_eq!(uri.decoded_path(), "/x%zz");
    }

    #[test]
    fn canonicalization() {
        assert_eq!(canonical_path("/a/./b").as_deref(), Some("/a/b"));
        assert_eq!(canonical_path("/a/../b").as_deref(), Some("/b"));
        assert_eq!(canonical_path("/a/b/../").as_deref(), Some("/a/"));
        assert_eq!(canonical_path("/a/..").as_deref(), Some("/"));
        assert_eq!(canonical_path("/").as_deref(), Some("/"));
        assert_eq!(canonical_path("/../etc/passwd"), None);
        assert_eq!(canonical_path("").as_deref(), Some(""));
    }
}
