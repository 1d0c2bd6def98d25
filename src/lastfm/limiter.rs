use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use crate::config::LastfmConfiguration;

/// Keeps the client below Last.fm's call limit.
///
/// A fixed window limiter: the window opens with the first call after a reset
/// and admits `call_limit` calls. The next call waits for the rest of the
/// window, if any, and opens a new window.
#[derive(Debug)]
pub struct ApiCallLimiter {
    call_limit: u32,
    window: Duration,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    calls_in_window: u32,
    window_start: Instant,
}

impl ApiCallLimiter {
    /// A `call_limit` of zero is treated as one.
    pub fn new(call_limit: u32, window: Duration) -> Self {
        Self {
            call_limit: call_limit.max(1),
            window,
            state: Mutex::new(LimiterState {
                calls_in_window: 0,
                window_start: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &LastfmConfiguration) -> Self {
        Self::new(
            config.api_call_limit,
            Duration::from_millis(config.millis_for_call_limit),
        )
    }

    /// Accounts for one call, blocking until the call may happen.
    ///
    /// The lock is held while sleeping, so concurrent callers queue up behind
    /// the one that opens the next window.
    pub fn consider_call(&self) {
        let mut state = self.lock();

        if state.calls_in_window == 0 {
            state.window_start = Instant::now();
        }

        if state.calls_in_window >= self.call_limit {
            let passed = state.window_start.elapsed();
            if passed < self.window {
                let wait_interval = self.window - passed;
                log::debug!(
                    "Reached maximum call limit. Waiting {} ms before next call.",
                    wait_interval.as_millis()
                );
                thread::sleep(wait_interval);
            }

            state.window_start = Instant::now();
            state.calls_in_window = 0;
        }

        state.calls_in_window += 1;
    }

    pub fn call_limit(&self) -> u32 {
        self.call_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
