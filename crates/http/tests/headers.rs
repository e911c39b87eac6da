use pretty_assertions::assert_eq;
use weir_http::{HeaderName, Headers, KnownHeaderName};

#[test]
fn iteration_preserves_insertion_order() {
    let mut headers = Headers::new();
    headers.append("X-Zebra", "1");
    headers.append(KnownHeaderName::Host, "example.com");
    headers.append("X-Aardvark", "2");
    headers.append(KnownHeaderName::Accept, "*/*");

    let names: Vec<String> = headers.iter().map(|(name, _)| name.to_string()).collect();
    assert_eq!(names, ["X-Zebra", "Host", "X-Aardvark", "Accept"]);
}

#[test]
fn lookup_is_case_insensitive() {
    let mut headers = Headers::new();
    headers.append("X-Custom-Header", "yes");
    headers.append(KnownHeaderName::ContentType, "text/plain");

    assert_eq!(headers.get_str("x-custom-header"), Some("yes"));
    assert_eq!(headers.get_str("X-CUSTOM-HEADER"), Some("yes"));
    assert_eq!(headers.get_str("content-type"), Some("text/plain"));
    assert!(headers.has_header("CONTENT-TYPE"));
}

#[test]
fn append_accumulates_and_insert_replaces() {
    let mut headers = Headers::new();
    headers.append(KnownHeaderName::SetCookie, "a=1");
    headers.append(KnownHeaderName::SetCookie, "b=2");
    assert_eq!(headers.get_values(KnownHeaderName::SetCookie).unwrap().len(), 2);
    // a repeated header has no singular value
    assert_eq!(headers.get(KnownHeaderName::SetCookie), None);

    headers.insert(KnownHeaderName::SetCookie, "c=3");
    assert_eq!(headers.get_str(KnownHeaderName::SetCookie), Some("c=3"));
}

#[test]
fn token_matching() {
    let mut headers = Headers::new();
    headers.append(KnownHeaderName::Connection, "Keep-Alive, Upgrade");

    assert!(headers.contains_token(KnownHeaderName::Connection, "keep-alive"));
    assert!(headers.contains_token(KnownHeaderName::Connection, "upgrade"));
    assert!(!headers.contains_token(KnownHeaderName::Connection, "close"));
    assert!(!headers.contains_token(KnownHeaderName::Host, "close"));
}

#[test]
fn token_matching_across_repeated_headers() {
    let mut headers = Headers::new();
    headers.append(KnownHeaderName::Connection, "upgrade");
    headers.append(KnownHeaderName::Connection, "close");

    assert!(headers.contains_token(KnownHeaderName::Connection, "close"));
}

#[test]
fn removal_preserves_remaining_order() {
    let mut headers = Headers::new();
    headers.append("X-First", "1");
    headers.append("X-Second", "2");
    headers.append("X-Third", "3");

    assert!(headers.remove("x-second").is_some());
    let names: Vec<String> = headers.iter().map(|(name, _)| name.to_string()).collect();
    assert_eq!(names, ["X-First", "X-Third"]);
}

#[test]
fn try_insert_does_not_replace() {
    let mut headers = Headers::new();
    headers.try_insert(KnownHeaderName::Server, "one");
    headers.try_insert(KnownHeaderName::Server, "two");
    assert_eq!(headers.get_str(KnownHeaderName::Server), Some("one"));
}

#[test]
fn display_serializes_wire_lines() {
    let mut headers = Headers::new();
    headers.append(KnownHeaderName::ContentLength, "5");
    headers.append("X-Two", "b");

    assert_eq!(headers.to_string(), "Content-Length: 5\r\nX-Two: b\r\n");
}

#[test]
fn known_names_intern() {
    assert_eq!(
        HeaderName::from("content-length"),
        HeaderName::from(KnownHeaderName::ContentLength)
    );
    assert_eq!(HeaderName::from("X-Made-Up"), HeaderName::from("x-made-up"));
}
