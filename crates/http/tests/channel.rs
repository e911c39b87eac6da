use pretty_assertions::assert_eq;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use weir_http::{
    Channel, DispatchState, ERROR_EXCEPTION, ERROR_EXCEPTION_TYPE, Error, KnownHeaderName, Method,
    ParseEvents, Result, Version,
};
use weir_testing::{TransportEvent, test_channel};

fn feed_request(channel: &Channel, method: Method, path: &str, version: Version) {
    assert!(!channel.start_request(Some(method), method.as_str(), path, Some(version)));
    assert!(!channel.parsed_header(
        Some(KnownHeaderName::Host),
        Some("Host"),
        Some("example.com:8080")
    ));
    assert!(!channel.parsed_host_header("example.com", Some(8080)));
}

#[test]
fn simple_get() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (channel, transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        channel.response().set_status(200);
        channel.output().write(b"hi")?;
        channel.request().set_handled(true);
        Ok(())
    }));

    feed_request(&channel, Method::Get, "/a", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.message_complete(0);
    channel.run();

    assert_eq!(channel.requests_handled(), 1);
    assert_eq!(transport.sole_commit_status(), Some(200));
    assert_eq!(transport.completed_count(), 1);
    assert_eq!(transport.body(), b"hi");
    assert!(channel.request().is_persistent());
    assert_eq!(channel.state().state(), DispatchState::Completed);

    let events = transport.events();
    let [TransportEvent::Commit { headers, complete, .. }, TransportEvent::Completed] =
        events.as_slice()
    else {
        panic!("unexpected events: {events:?}");
    };
    assert!(*complete);
    assert!(headers.iter().any(|(name, _)| name == "Server"));
    assert!(headers.iter().any(|(name, _)| name == "Date"));
    assert!(
        !headers
            .iter()
            .any(|(name, value)| name == "Connection" && value == "close")
    );
}

#[test]
fn handler_failure_renders_an_error_page() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> {
        Err(Error::Application("boom".into()))
    }));

    feed_request(&channel, Method::Get, "/fail", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.run();

    assert_eq!(transport.sole_commit_status(), Some(500));
    assert_eq!(transport.completed_count(), 1);
    let body = String::from_utf8(transport.body()).unwrap();
    assert!(body.contains("boom"), "{body:?}");

    let request = channel.request();
    assert!(request.attribute(ERROR_EXCEPTION).is_some());
    let kind = request
        .attribute(ERROR_EXCEPTION_TYPE)
        .and_then(|attr| attr.downcast_ref::<&str>().copied());
    assert_eq!(kind, Some("application"));
}

#[test]
fn unhandled_request_is_answered_with_404() {
    let (channel, transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    feed_request(&channel, Method::Get, "/nobody-home", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.run();

    assert_eq!(transport.sole_commit_status(), Some(404));
    assert_eq!(transport.completed_count(), 1);
}

#[test]
fn http_1_0_with_keep_alive_is_persistent() {
    let (channel, transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        channel.request().set_handled(true);
        Ok(())
    }));

    feed_request(&channel, Method::Get, "/", Version::Http1_0);
    channel.parsed_header(
        Some(KnownHeaderName::Connection),
        Some("Connection"),
        Some("keep-alive"),
    );
    assert!(!channel.header_complete());
    channel.run();

    assert!(channel.request().is_persistent());
    let commits = transport.commits();
    let [TransportEvent::Commit { headers, .. }] = commits.as_slice() else {
        panic!("expected one commit");
    };
    assert!(
        headers
            .iter()
            .any(|(name, value)| name == "Connection" && value == "keep-alive")
    );
}

#[test]
fn http_1_0_without_keep_alive_is_not_persistent() {
    let (channel, _transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        channel.request().set_handled(true);
        Ok(())
    }));

    feed_request(&channel, Method::Get, "/", Version::Http1_0);
    assert!(!channel.header_complete());
    channel.run();

    assert!(!channel.request().is_persistent());
}

#[test]
fn http_1_1_with_connection_close_is_not_persistent() {
    let (channel, transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        channel.request().set_handled(true);
        Ok(())
    }));

    feed_request(&channel, Method::Get, "/", Version::Http1_1);
    channel.parsed_header(
        Some(KnownHeaderName::Connection),
        Some("Connection"),
        Some("close"),
    );
    assert!(!channel.header_complete());
    channel.run();

    assert!(!channel.request().is_persistent());
    let commits = transport.commits();
    let [TransportEvent::Commit { headers, .. }] = commits.as_slice() else {
        panic!("expected one commit");
    };
    assert!(
        headers
            .iter()
            .any(|(name, value)| name == "Connection" && value == "close")
    );
}

#[test]
fn request_counter_increments_at_header_complete_only() {
    let (channel, _transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    assert_eq!(channel.requests_handled(), 0);
    feed_request(&channel, Method::Get, "/", Version::Http1_1);
    assert_eq!(channel.requests_handled(), 0);
    assert!(!channel.header_complete());
    assert_eq!(channel.requests_handled(), 1);
}

#[test]
fn connect_uses_authority_form() {
    let (channel, _transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        channel.request().set_handled(true);
        Ok(())
    }));

    assert!(!channel.start_request(
        Some(Method::Connect),
        "CONNECT",
        "example.com:443",
        Some(Version::Http1_1)
    ));
    {
        let request = channel.request();
        assert_eq!(request.uri().host(), Some("example.com"));
        assert_eq!(request.uri().port(), Some(443));
        assert_eq!(request.path_info(), "/");
    }
}

#[test]
fn dot_segments_are_canonicalized() {
    let (channel, _transport) = test_channel(Arc::new(|_: &Channel| -> Result<()> { Ok(()) }));

    channel.start_request(
        Some(Method::Get),
        "GET",
        "/a/./b/../c",
        Some(Version::Http1_1),
    );
    assert_eq!(channel.request().path_info(), "/a/c");
}

#[test]
fn reset_restores_a_fresh_channel() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (channel, transport) = {
        let calls = Arc::clone(&calls);
        test_channel(Arc::new(move |channel: &Channel| -> Result<()> {
            calls.fetch_add(1, Ordering::SeqCst);
            channel.response().set_status(200);
            channel.request().set_handled(true);
            Ok(())
        }))
    };

    feed_request(&channel, Method::Get, "/first", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.message_complete(0);
    channel.run();
    assert_eq!(transport.completed_count(), 1);

    channel.reset().unwrap();

    assert_eq!(channel.state().state(), DispatchState::Idle);
    assert!(!channel.is_committed());
    {
        let request = channel.request();
        assert_eq!(request.method(), None);
        assert_eq!(request.method_str(), "");
        assert_eq!(request.path_info(), "");
        assert!(request.headers().is_empty());
        assert_eq!(request.persistent(), None);
        assert!(request.time_stamp().is_none());
        assert!(!request.is_handled());
    }
    {
        let response = channel.response();
        assert_eq!(response.status(), None);
        assert!(response.headers().is_empty());
    }
    // the request counter is monotonic across resets
    assert_eq!(channel.requests_handled(), 1);

    // idempotent
    channel.reset().unwrap();
    assert_eq!(channel.state().state(), DispatchState::Idle);

    // and the channel carries a second request
    feed_request(&channel, Method::Get, "/second", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.message_complete(0);
    channel.run();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(channel.requests_handled(), 2);
    assert_eq!(transport.completed_count(), 2);
}

#[test]
fn reset_is_illegal_while_dispatched() {
    let (channel, _transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        assert!(matches!(
            channel.reset(),
            Err(Error::IllegalState(DispatchState::Dispatched))
        ));
        channel.request().set_handled(true);
        Ok(())
    }));

    feed_request(&channel, Method::Get, "/", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.run();
}

#[test]
fn current_channel_is_installed_during_dispatch() {
    let (channel, _transport) = test_channel(Arc::new(|channel: &Channel| -> Result<()> {
        let current = Channel::current().expect("current channel");
        assert_eq!(current.requests_handled(), channel.requests_handled());
        channel.request().set_handled(true);
        Ok(())
    }));

    assert!(Channel::current().is_none());
    feed_request(&channel, Method::Get, "/", Version::Http1_1);
    assert!(!channel.header_complete());
    channel.run();
    assert!(Channel::current().is_none());
}
