use crate::{Channel, Request, Result};
use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};
use swansong::Swansong;

/// A pool of workers on which channel dispatches run.
pub trait Executor: Send + Sync {
    /// run `job` on some worker, now or later
    fn execute(&self, job: Box<dyn FnOnce() + Send>);
}

/// A timer facility for suspension idle timeouts.
pub trait Scheduler: Send + Sync {
    /// run `job` after `delay` has elapsed
    fn schedule(&self, delay: Duration, job: Box<dyn FnOnce() + Send>);
}

/// The application invoked by the dispatch loop.
///
/// A handler takes responsibility for a request by setting its
/// `handled` flag; otherwise the channel answers with a 404 at
/// completion. To finish later instead of on return, call
/// [`Channel::start_async`] and keep the returned handle.
pub trait Handler: Send + Sync {
    /// handle the initial dispatch of a request
    fn handle(&self, channel: &Channel) -> Result<()>;

    /// handle a redispatch of a previously suspended request
    fn handle_async(&self, channel: &Channel) -> Result<()> {
        self.handle(channel)
    }
}

impl<F> Handler for F
where
    F: Fn(&Channel) -> Result<()> + Send + Sync,
{
    fn handle(&self, channel: &Channel) -> Result<()> {
        self(channel)
    }
}

/// The connection a channel is bound to, as far as the channel needs to
/// know about it.
pub trait Endpoint: Send + Sync {
    /// the local address of the connection, if known
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// the remote address of the connection, if known
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// A policy applied to every request before its initial dispatch.
pub trait Customizer: Send + Sync {
    /// inspect or adjust the request
    fn customize(&self, request: &mut Request);
}

impl<F> Customizer for F
where
    F: Fn(&mut Request) + Send + Sync,
{
    fn customize(&self, request: &mut Request) {
        self(request)
    }
}

/// The per-listener context a channel borrows: the worker pool, the
/// timer, the application, request customization policies, and the
/// graceful-shutdown control.
pub struct Connector {
    executor: Arc<dyn Executor>,
    scheduler: Option<Arc<dyn Scheduler>>,
    handler: Arc<dyn Handler>,
    customizers: Vec<Arc<dyn Customizer>>,
    swansong: Swansong,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("customizers", &self.customizers.len())
            .field("swansong", &self.swansong)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// builds a connector around a worker pool and an application
    pub fn new(executor: Arc<dyn Executor>, handler: Arc<dyn Handler>) -> Self {
        Self {
            executor,
            scheduler: None,
            handler,
            customizers: Vec::new(),
            swansong: Swansong::new(),
        }
    }

    /// chainable method to install the timer used for suspension idle
    /// timeouts
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// chainable method to add a request customization policy
    pub fn with_customizer(mut self, customizer: Arc<dyn Customizer>) -> Self {
        self.customizers.push(customizer);
        self
    }

    /// chainable method to replace the graceful-shutdown control
    pub fn with_swansong(mut self, swansong: Swansong) -> Self {
        self.swansong = swansong;
        self
    }

    /// the worker pool
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// the timer, if one was installed
    pub fn scheduler(&self) -> Option<&Arc<dyn Scheduler>> {
        self.scheduler.as_ref()
    }

    /// the application
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// the graceful-shutdown control
    pub fn swansong(&self) -> &Swansong {
        &self.swansong
    }

    /// is the enclosing server still running?
    pub fn is_running(&self) -> bool {
        !self.swansong.state().is_shutting_down()
    }

    pub(crate) fn customize(&self, request: &mut Request) {
        for customizer in &self.customizers {
            customizer.customize(request);
        }
    }

    pub(crate) fn execute_channel(&self, channel: Arc<Channel>) {
        self.executor.execute(Box::new(move || channel.run()));
    }
}
