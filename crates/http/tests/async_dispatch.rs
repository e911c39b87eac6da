use pretty_assertions::assert_eq;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use weir_http::{
    AsyncHandle, Channel, Connector, DispatchState, DispatcherType, Error, HttpConfig, Method,
    ParseEvents, Result, Transport, Version,
};
use weir_testing::{
    DirectExecutor, ManualScheduler, RecordingTransport, TestEndpoint, TransportEvent,
    test_channel,
};

struct SuspendingHandler {
    passes: AtomicUsize,
    handle: Mutex<Option<AsyncHandle>>,
    resume_in_handler: bool,
    complete_in_handler: bool,
}

impl SuspendingHandler {
    fn new() -> Self {
        Self {
            passes: AtomicUsize::new(0),
            handle: Mutex::new(None),
            resume_in_handler: false,
            complete_in_handler: false,
        }
    }

    fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    fn async_handle(&self) -> AsyncHandle {
        self.handle.lock().unwrap().clone().unwrap()
    }
}

impl weir_http::Handler for SuspendingHandler {
    fn handle(&self, channel: &Channel) -> Result<()> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        assert_eq!(channel.request().dispatcher_type(), DispatcherType::Request);
        let handle = channel.start_async()?;
        if self.resume_in_handler {
            handle.dispatch();
        }
        if self.complete_in_handler {
            channel.response().set_status(202);
            channel.request().set_handled(true);
            handle.complete();
        }
        *self.handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn handle_async(&self, channel: &Channel) -> Result<()> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        assert_eq!(channel.request().dispatcher_type(), DispatcherType::Async);
        channel.response().set_status(200);
        channel.output().write(b"resumed")?;
        channel.request().set_handled(true);
        Ok(())
    }
}

fn feed_get(channel: &Channel) {
    assert!(!channel.start_request(Some(Method::Get), "GET", "/slow", Some(Version::Http1_1)));
    assert!(!channel.header_complete());
}

#[test]
fn suspend_then_resume_from_another_thread() {
    let handler = Arc::new(SuspendingHandler::new());
    let (channel, transport) = test_channel(Arc::clone(&handler) as _);

    feed_get(&channel);
    channel.run();

    // the dispatch loop exited without completing
    assert_eq!(handler.passes(), 1);
    assert_eq!(channel.state().state(), DispatchState::AsyncWait);
    assert!(transport.events().is_empty());

    // a later event redispatches the channel
    handler.async_handle().dispatch();

    assert_eq!(handler.passes(), 2);
    assert_eq!(transport.sole_commit_status(), Some(200));
    assert_eq!(transport.body(), b"resumed");
    assert_eq!(transport.completed_count(), 1);
    assert_eq!(channel.state().state(), DispatchState::Completed);
}

#[test]
fn resume_before_returning_redispatches_in_the_same_loop() {
    let handler = Arc::new(SuspendingHandler {
        resume_in_handler: true,
        ..SuspendingHandler::new()
    });
    let (channel, transport) = test_channel(Arc::clone(&handler) as _);

    feed_get(&channel);
    channel.run();

    // one run, two application passes
    assert_eq!(handler.passes(), 2);
    assert_eq!(transport.sole_commit_status(), Some(200));
    assert_eq!(transport.completed_count(), 1);
}

#[test]
fn complete_before_returning_finishes_without_a_second_pass() {
    let handler = Arc::new(SuspendingHandler {
        complete_in_handler: true,
        ..SuspendingHandler::new()
    });
    let (channel, transport) = test_channel(Arc::clone(&handler) as _);

    feed_get(&channel);
    channel.run();

    assert_eq!(handler.passes(), 1);
    assert_eq!(transport.sole_commit_status(), Some(202));
    assert_eq!(transport.completed_count(), 1);
    assert_eq!(channel.state().state(), DispatchState::Completed);
}

#[test]
fn failure_while_suspended_commits_a_direct_500() {
    let handler = Arc::new(SuspendingHandler::new());
    let (channel, transport) = test_channel(Arc::clone(&handler) as _);

    feed_get(&channel);
    channel.run();
    assert_eq!(channel.state().state(), DispatchState::AsyncWait);

    // a background worker fails while the channel is suspended
    channel.handle_exception(Error::Application("background failure".into()));

    let commits = transport.commits();
    let [
        TransportEvent::Commit {
            status,
            headers,
            complete,
            ..
        },
    ] = commits.as_slice()
    else {
        panic!("expected one commit, got {commits:?}");
    };
    assert_eq!(*status, 500);
    assert!(headers.is_empty());
    assert!(*complete);

    // the application eventually completes; no further commit happens
    handler.async_handle().complete();
    assert_eq!(transport.commits().len(), 1);
    assert_eq!(transport.completed_count(), 1);
    assert_eq!(channel.state().state(), DispatchState::Completed);
}

#[test]
fn a_second_failure_after_commit_is_dropped() {
    let handler = Arc::new(SuspendingHandler::new());
    let (channel, transport) = test_channel(Arc::clone(&handler) as _);

    feed_get(&channel);
    channel.run();

    channel.handle_exception(Error::Application("first".into()));
    channel.handle_exception(Error::Application("second".into()));
    assert_eq!(transport.commits().len(), 1);

    handler.async_handle().complete();
    assert_eq!(transport.completed_count(), 1);
}

#[test]
fn idle_timeout_expires_a_suspended_channel() {
    let handler = Arc::new(SuspendingHandler::new());
    let transport = Arc::new(RecordingTransport::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let connector = Arc::new(
        Connector::new(Arc::new(DirectExecutor), Arc::clone(&handler) as _)
            .with_scheduler(Arc::clone(&scheduler) as _),
    );
    let channel = Channel::new(
        connector,
        HttpConfig::default(),
        Arc::new(TestEndpoint::default()),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    feed_get(&channel);
    channel.run();
    assert_eq!(scheduler.scheduled_count(), 1);

    // nobody resumes the channel before the timer fires
    scheduler.fire_all();

    assert_eq!(transport.sole_commit_status(), Some(500));
    let body = String::from_utf8(transport.body()).unwrap();
    assert!(body.contains("timed out"), "{body:?}");
    assert_eq!(transport.completed_count(), 1);
    assert_eq!(channel.state().state(), DispatchState::Completed);
    // the application was not re-entered
    assert_eq!(handler.passes(), 1);
}

#[test]
fn resumed_channel_does_not_expire_later() {
    let handler = Arc::new(SuspendingHandler::new());
    let transport = Arc::new(RecordingTransport::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let connector = Arc::new(
        Connector::new(Arc::new(DirectExecutor), Arc::clone(&handler) as _)
            .with_scheduler(Arc::clone(&scheduler) as _),
    );
    let channel = Channel::new(
        connector,
        HttpConfig::default(),
        Arc::new(TestEndpoint::default()),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    feed_get(&channel);
    channel.run();

    handler.async_handle().dispatch();
    assert_eq!(transport.sole_commit_status(), Some(200));

    // the stale timer fires after the request already finished
    scheduler.fire_all();
    assert_eq!(transport.commits().len(), 1);
    assert_eq!(transport.completed_count(), 1);
}
