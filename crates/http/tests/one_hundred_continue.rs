use pretty_assertions::assert_eq;
use std::{sync::Arc, thread, time::Duration};
use weir_http::{Channel, Error, KnownHeaderName, Method, ParseEvents, Result, Version};
use weir_testing::{TransportEvent, test_channel, wait_until};

fn feed_post_expecting_continue(channel: &Channel) -> bool {
    assert!(!channel.start_request(Some(Method::Post), "POST", "/", Some(Version::Http1_1)));
    assert!(!channel.parsed_header(
        Some(KnownHeaderName::Host),
        Some("Host"),
        Some("example.com")
    ));
    assert!(!channel.parsed_host_header("example.com", None));
    assert!(!channel.parsed_header(
        Some(KnownHeaderName::Expect),
        Some("Expect"),
        Some("100-continue")
    ));
    assert!(!channel.parsed_header(
        Some(KnownHeaderName::ContentLength),
        Some("Content-Length"),
        Some("3")
    ));
    channel.header_complete()
}

#[test]
fn one_hundred_continue() {
    let (channel, transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        let input = channel.request().http_input()?;
        let body = input.read_string()?;
        channel.response().set_status(200);
        channel.output().write(format!("read: {body}").as_bytes())?;
        channel.request().set_handled(true);
        Ok(())
    }));

    // the client demanded 100-continue, so the parser suspends
    assert!(feed_post_expecting_continue(&channel));

    let dispatch = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || channel.run())
    };

    // the handler asked for the input stream with no content buffered,
    // which commits the interim response
    wait_until(Duration::from_secs(5), || transport.commits().len() == 1);
    let commits = transport.commits();
    let [
        TransportEvent::Commit {
            status, complete, ..
        },
    ] = commits.as_slice()
    else {
        panic!("expected one commit, got {commits:?}");
    };
    assert_eq!(*status, 100);
    assert!(!*complete);

    // the parser resumes externally and delivers the body
    assert!(channel.content(b"abc"));
    assert!(channel.message_complete(3));
    dispatch.join().unwrap();

    let commits = transport.commits();
    assert_eq!(commits.len(), 2);
    let TransportEvent::Commit {
        status,
        complete,
        headers,
        content,
        ..
    } = &commits[1]
    else {
        panic!("expected a commit");
    };
    assert_eq!(*status, 200);
    assert!(*complete);
    assert_eq!(content, b"read: abc");
    assert!(
        !headers
            .iter()
            .any(|(name, value)| name == "Connection" && value == "close")
    );
    assert!(channel.request().is_persistent());
    assert_eq!(transport.completed_count(), 1);
}

#[test]
fn promised_but_unused_continue_closes_the_connection() {
    let (channel, transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        // ignores the body entirely
        channel.response().set_status(200);
        channel.request().set_handled(true);
        Ok(())
    }));

    assert!(feed_post_expecting_continue(&channel));
    channel.run();

    let commits = transport.commits();
    let [
        TransportEvent::Commit {
            status, headers, ..
        },
    ] = commits.as_slice()
    else {
        panic!("expected exactly one commit, got {commits:?}");
    };
    assert_eq!(*status, 200);
    assert!(
        headers
            .iter()
            .any(|(name, value)| name == "Connection" && value == "close")
    );
    assert!(!channel.request().is_persistent());
    assert_eq!(transport.completed_count(), 1);
}

#[test]
fn continue_100_after_commit_is_an_error() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    assert!(feed_post_expecting_continue(&channel));
    channel.write(b"early", true).unwrap();
    assert_eq!(transport.sole_commit_status(), Some(200));

    assert!(matches!(channel.continue_100(0), Err(Error::Committed)));
}

#[test]
fn continue_100_without_expectation_is_a_no_op() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    assert!(!channel.start_request(Some(Method::Post), "POST", "/", Some(Version::Http1_1)));
    assert!(!channel.header_complete());

    channel.continue_100(0).unwrap();
    assert!(transport.events().is_empty());
}

#[test]
fn send_processing_honors_the_102_expectation() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    assert!(!channel.start_request(Some(Method::Post), "POST", "/", Some(Version::Http1_1)));
    assert!(!channel.parsed_header(
        Some(KnownHeaderName::Expect),
        Some("Expect"),
        Some("102-processing")
    ));
    assert!(!channel.header_complete());

    channel.send_processing().unwrap();
    channel.send_processing().unwrap();
    assert_eq!(
        transport
            .commits()
            .iter()
            .filter(|event| matches!(event, TransportEvent::Commit { status: 102, .. }))
            .count(),
        2
    );
}

#[test]
fn send_processing_without_the_expectation_is_a_no_op() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    assert!(!channel.start_request(Some(Method::Post), "POST", "/", Some(Version::Http1_1)));
    assert!(!channel.header_complete());

    channel.send_processing().unwrap();
    assert!(transport.commits().is_empty());
}

#[test]
fn buffered_content_skips_the_interim_response() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    assert!(feed_post_expecting_continue(&channel));
    // content arrived before the application asked to read
    channel.content(b"abc");
    let input = channel.request().http_input().unwrap();

    assert!(transport.commits().is_empty());
    assert_eq!(input.available(), 3);
}
