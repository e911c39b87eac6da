#![forbid(unsafe_code)]

//! Deterministic test doubles for the collaborators a
//! [`weir_http::Channel`] borrows: a transport that records instead of
//! framing bytes, executors with predictable scheduling, a manually
//! fired timer, and an endpoint stub.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};
use weir_http::{
    Channel, Connector, Endpoint, Executor, Handler, HttpConfig, ResponseInfo, Scheduler,
    Transport,
};

/// One observed interaction with a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// a response head was committed
    Commit {
        /// the committed status code
        status: u16,
        /// the reason phrase sent with the status line
        reason: String,
        /// the serialized header lines, in order
        headers: Vec<(String, String)>,
        /// content accompanying the commit
        content: Vec<u8>,
        /// whether the response was finalized by this commit
        complete: bool,
    },

    /// content was written after the commit
    Write {
        /// the written content
        content: Vec<u8>,
        /// whether the response was finalized by this write
        complete: bool,
    },

    /// the channel reported completion
    Completed,
}

/// A [`Transport`] that records every interaction for later assertion
/// instead of serializing anything.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<TransportEvent>>,
}

impl RecordingTransport {
    /// builds an empty recording transport
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TransportEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// every event observed so far, in order
    pub fn events(&self) -> Vec<TransportEvent> {
        self.lock().clone()
    }

    /// the commit events observed so far, in order
    pub fn commits(&self) -> Vec<TransportEvent> {
        self.lock()
            .iter()
            .filter(|event| matches!(event, TransportEvent::Commit { .. }))
            .cloned()
            .collect()
    }

    /// the status of the only commit, if exactly one commit happened
    pub fn sole_commit_status(&self) -> Option<u16> {
        match self.commits().as_slice() {
            [TransportEvent::Commit { status, .. }] => Some(*status),
            _ => None,
        }
    }

    /// how many times the channel reported completion
    pub fn completed_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, TransportEvent::Completed))
            .count()
    }

    /// all content bytes from commits and writes, concatenated
    pub fn body(&self) -> Vec<u8> {
        self.lock()
            .iter()
            .flat_map(|event| match event {
                TransportEvent::Commit { content, .. } | TransportEvent::Write { content, .. } => {
                    content.clone()
                }
                TransportEvent::Completed => Vec::new(),
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn commit(&self, info: &ResponseInfo, content: &[u8], complete: bool) -> weir_http::Result<()> {
        let headers = info
            .headers()
            .iter()
            .flat_map(|(name, values)| {
                values
                    .iter()
                    .map(|value| (name.to_string(), value.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();
        self.lock().push(TransportEvent::Commit {
            status: info.status() as u16,
            reason: info.reason().to_string(),
            headers,
            content: content.to_vec(),
            complete,
        });
        Ok(())
    }

    fn write(&self, content: &[u8], complete: bool) -> weir_http::Result<()> {
        self.lock().push(TransportEvent::Write {
            content: content.to_vec(),
            complete,
        });
        Ok(())
    }

    fn channel_completed(&self) {
        self.lock().push(TransportEvent::Completed);
    }
}

/// An [`Executor`] that runs each job inline on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        job();
    }
}

/// An [`Executor`] that spawns one thread per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        thread::spawn(job);
    }
}

/// A [`Scheduler`] that holds scheduled jobs until the test fires them.
#[derive(Default)]
pub struct ManualScheduler {
    jobs: Mutex<Vec<(Duration, Box<dyn FnOnce() + Send>)>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("scheduled", &self.scheduled_count())
            .finish()
    }
}

impl ManualScheduler {
    /// builds a scheduler with no jobs
    pub fn new() -> Self {
        Self::default()
    }

    /// how many jobs are waiting to fire
    pub fn scheduled_count(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// run every scheduled job, as though all delays elapsed at once
    pub fn fire_all(&self) {
        let jobs = std::mem::take(&mut *self.jobs.lock().unwrap_or_else(PoisonError::into_inner));
        for (_, job) in jobs {
            job();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: Box<dyn FnOnce() + Send>) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((delay, job));
    }
}

/// An [`Endpoint`] with fixed addresses.
#[derive(Debug, Clone, Copy)]
pub struct TestEndpoint {
    local: SocketAddr,
    peer: SocketAddr,
}

impl Default for TestEndpoint {
    fn default() -> Self {
        Self {
            local: ([127, 0, 0, 1], 80).into(),
            peer: ([127, 0, 0, 1], 41234).into(),
        }
    }
}

impl Endpoint for TestEndpoint {
    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}

/// Assemble a channel over a [`RecordingTransport`], a
/// [`DirectExecutor`], and a [`TestEndpoint`], returning the channel and
/// the transport for assertions.
pub fn test_channel(handler: Arc<dyn Handler>) -> (Arc<Channel>, Arc<RecordingTransport>) {
    test_channel_with_config(handler, HttpConfig::default())
}

/// [`test_channel`] with a caller-provided [`HttpConfig`].
pub fn test_channel_with_config(
    handler: Arc<dyn Handler>,
    config: HttpConfig,
) -> (Arc<Channel>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let connector = Arc::new(Connector::new(Arc::new(DirectExecutor), handler));
    let channel = Channel::new(
        connector,
        config,
        Arc::new(TestEndpoint::default()),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    (channel, transport)
}

/// Poll `predicate` until it returns true or `timeout` elapses,
/// panicking on timeout. For coordinating with work on other threads.
pub fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + timeout;
    while !predicate() {
        assert!(Instant::now() < deadline, "condition not reached in {timeout:?}");
        thread::sleep(Duration::from_millis(2));
    }
}
