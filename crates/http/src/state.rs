use crate::Error;
use std::sync::{Arc, Mutex, PoisonError};

/// The dispatch lifecycle phase of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// no request is being handled
    Idle,

    /// a worker is executing the application
    Dispatched,

    /// the application suspended during the current dispatch and has not
    /// yet returned
    AsyncStarted,

    /// the application suspended and the dispatch loop has exited; a
    /// later dispatch will resume it
    AsyncWait,

    /// a resume raced or arrived; the next loop iteration (or the next
    /// dispatch) re-enters the application
    Redispatching,

    /// the request is finished with the application and awaiting final
    /// flush
    Completing,

    /// terminal
    Completed,
}

/// The finite automaton controlling dispatch, suspension and completion
/// of the current request.
///
/// This is the only synchronization point between the dispatching worker
/// and timers or application threads performing asynchronous dispatch.
/// Every operation takes the internal mutex, performs one transition,
/// and returns a decision to the caller.
#[derive(Debug, Default)]
pub struct ChannelState {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: DispatchState,
    initial: bool,
    failure: Option<Arc<Error>>,
    expired: bool,
    suspend_epoch: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: DispatchState::Idle,
            initial: true,
            failure: None,
            expired: false,
            suspend_epoch: 0,
        }
    }
}

impl ChannelState {
    /// a new state machine in [`DispatchState::Idle`]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt to take ownership of a dispatch. Returns true iff the
    /// caller must execute the application this iteration; false for a
    /// spurious wake of a completing or completed channel.
    pub fn handling(&self) -> bool {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            Idle => {
                inner.initial = true;
                inner.state = Dispatched;
                true
            }
            Redispatching => {
                inner.state = Dispatched;
                true
            }
            Completing | Completed => false,
            state => {
                log::error!("handling() called in state {state:?}");
                false
            }
        }
    }

    /// Release the dispatch after one application invocation. Returns
    /// true when the dispatch loop is done (the channel either suspended
    /// or moved to completing) and false when a resume raced in and the
    /// loop must iterate again.
    pub fn unhandle(&self) -> bool {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            Dispatched => {
                inner.state = Completing;
                true
            }
            AsyncStarted if inner.failure.is_some() || inner.expired => {
                inner.state = Completing;
                true
            }
            AsyncStarted => {
                inner.initial = false;
                inner.suspend_epoch += 1;
                inner.state = AsyncWait;
                true
            }
            Redispatching => {
                inner.initial = false;
                inner.state = Dispatched;
                false
            }
            Completing => true,
            state => {
                log::error!("unhandle() called in state {state:?}");
                true
            }
        }
    }

    /// The application requests suspension of the current dispatch. Legal
    /// only while dispatched.
    pub fn async_started(&self) -> crate::Result<()> {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            Dispatched => {
                inner.state = AsyncStarted;
                Ok(())
            }
            state => Err(Error::IllegalState(state)),
        }
    }

    /// A suspended channel is resumed. Returns true when the caller must
    /// schedule execution of the channel; false when a running dispatch
    /// loop will pick the resume up itself, or when the resume is moot.
    pub fn dispatch(&self) -> bool {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            AsyncStarted => {
                inner.state = Redispatching;
                false
            }
            AsyncWait => {
                inner.state = Redispatching;
                true
            }
            _ => false,
        }
    }

    /// A suspended channel is asked to finish without re-entering the
    /// application. Returns true when the caller must schedule execution
    /// of the channel for cleanup.
    pub fn complete(&self) -> bool {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            AsyncStarted => {
                inner.state = Completing;
                false
            }
            AsyncWait => {
                inner.state = Completing;
                true
            }
            _ => false,
        }
    }

    /// Record a failure. The first recorded cause is kept; subsequent
    /// calls are no-ops. A recorded failure forces the transition into
    /// [`DispatchState::Completing`] at the next [`unhandle`][Self::unhandle].
    pub fn error(&self, cause: Arc<Error>) {
        let mut inner = self.lock();
        if inner.failure.is_none() {
            inner.failure = Some(cause);
        }
    }

    /// The scheduler reports that the suspension idle timeout for
    /// `epoch` elapsed. Returns true when the caller must schedule
    /// execution of the channel; moot unless the channel is still
    /// suspended in the same suspension the timer was armed for.
    pub fn expired(&self, epoch: u64) -> bool {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            AsyncWait if inner.suspend_epoch == epoch => {
                inner.expired = true;
                if inner.failure.is_none() {
                    inner.failure = Some(Arc::new(Error::Timeout));
                }
                inner.state = Redispatching;
                true
            }
            _ => false,
        }
    }

    /// the number of times this channel has entered
    /// [`DispatchState::AsyncWait`], used to pair idle timers with the
    /// suspension they were armed for
    pub fn suspend_epoch(&self) -> u64 {
        self.lock().suspend_epoch
    }

    /// Consume the expiry marker, if the last resume was driven by a
    /// timeout.
    pub(crate) fn take_expired(&self) -> bool {
        let mut inner = self.lock();
        std::mem::take(&mut inner.expired)
    }

    /// Finish the request. Returns true iff this call performed the
    /// `Completing → Completed` transition; at most one caller observes
    /// true per request, and repeated calls are no-ops.
    pub fn completed(&self) -> bool {
        use DispatchState::*;
        let mut inner = self.lock();
        match inner.state {
            Completing => {
                inner.state = Completed;
                true
            }
            Completed => false,
            state => {
                log::error!("completed() called in state {state:?}");
                false
            }
        }
    }

    /// is the channel suspended by the application?
    pub fn is_suspended(&self) -> bool {
        matches!(
            self.lock().state,
            DispatchState::AsyncStarted | DispatchState::AsyncWait
        )
    }

    /// is the current dispatch the first for this request?
    pub fn is_initial(&self) -> bool {
        self.lock().initial
    }

    /// has the request finished with the application?
    pub fn is_completing(&self) -> bool {
        self.lock().state == DispatchState::Completing
    }

    /// the current phase
    pub fn state(&self) -> DispatchState {
        self.lock().state
    }

    pub(crate) fn take_failure(&self) -> Option<Arc<Error>> {
        self.lock().failure.take()
    }

    pub(crate) fn is_reusable(&self) -> bool {
        matches!(
            self.lock().state,
            DispatchState::Idle | DispatchState::Completed
        )
    }

    pub(crate) fn recycle(&self) {
        *self.lock() = Inner::default();
    }
}
