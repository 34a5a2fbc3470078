//! Idle teardown timer.
//!
//! At most one deferred action is outstanding. Arming replaces (aborts) the
//! previous one. The action receives a [`Ticket`] and must call
//! [`IdleTimer::release`] before doing any work, which detaches it from the
//! timer so that later `cancel` calls cannot abort it mid-teardown.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Identifies one arming of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Armed {
    ticket: Ticket,
    handle: AbortHandle,
}

#[derive(Debug, Default)]
struct TimerState {
    next: u64,
    armed: Option<Armed>,
}

#[derive(Debug)]
pub struct IdleTimer {
    window: Duration,
    state: Mutex<TimerState>,
}

impl IdleTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(TimerState::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule `action` to run after the idle window, replacing whatever
    /// was scheduled before.
    pub fn arm<F, Fut>(&self, action: F)
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let mut state = self.lock();
        state.next += 1;
        let ticket = Ticket(state.next);

        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action(ticket).await;
        });

        if let Some(previous) = state.armed.replace(Armed {
            ticket,
            handle: task.abort_handle(),
        }) {
            previous.handle.abort();
        }
    }

    /// Detach the firing action from the timer. Returns `false` if the
    /// ticket was superseded or cancelled, in which case the action must
    /// do nothing.
    pub fn release(&self, ticket: Ticket) -> bool {
        let mut state = self.lock();
        match &state.armed {
            Some(armed) if armed.ticket == ticket => {
                state.armed = None;
                true
            }
            _ => false,
        }
    }

    /// Abort the pending action, if any.
    pub fn cancel(&self) {
        if let Some(armed) = self.lock().armed.take() {
            armed.handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed.is_some()
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
