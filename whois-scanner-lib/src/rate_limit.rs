//! Lookup throttling.
//!
//! A sliding-window limiter: at most `calls` grants inside any window of
//! `period`. When the budget is spent, [`RateLimiter::acquire`] sleeps until
//! the oldest grant leaves the window. Calls are delayed, never dropped.
//!
//! One limiter covers every registry server queried during a run.

use crate::error::ScannerError;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window rate limiter shared by every lookup in a run.
#[derive(Debug)]
pub struct RateLimiter {
    calls: usize,
    period: Duration,
    /// Instants of the most recent grants, oldest first (at most `calls` long)
    grants: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a limiter allowing `calls` grants per `period`.
    ///
    /// # Errors
    ///
    /// Returns `ScannerError::InvalidSettings` when `calls` or `period` is zero,
    /// or when `period` is too long to be measured from the current instant.
    pub fn new(calls: u32, period: Duration) -> Result<Self, ScannerError> {
        if calls == 0 {
            return Err(ScannerError::invalid_settings(
                "Rate limit calls must be greater than 0",
            ));
        }
        if period.is_zero() {
            return Err(ScannerError::invalid_settings(
                "Rate limit period must be greater than 0",
            ));
        }
        if Instant::now().checked_add(period).is_none() {
            return Err(ScannerError::invalid_settings(format!(
                "Rate limit period of {}s is too long",
                period.as_secs()
            )));
        }

        let calls = calls as usize;
        Ok(Self {
            calls,
            period,
            grants: VecDeque::with_capacity(calls),
        })
    }

    /// Wait until a call is allowed, then record it.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&mut self) -> Duration {
        let requested = Instant::now();

        if self.grants.len() >= self.calls {
            if let Some(ready_at) = self
                .grants
                .front()
                .and_then(|oldest| oldest.checked_add(self.period))
            {
                if ready_at > requested {
                    tracing::debug!(
                        "Rate limit of {} calls per {:?} reached, waiting {:?}",
                        self.calls,
                        self.period,
                        ready_at - requested
                    );
                    tokio::time::sleep_until(ready_at).await;
                }
            }
        }

        let now = Instant::now();
        self.evict_expired(now);
        self.grants.push_back(now);
        now - requested
    }

    /// Calls still available in the current window without waiting.
    pub fn remaining(&mut self) -> usize {
        self.evict_expired(Instant::now());
        self.calls - self.grants.len().min(self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(front) = self.grants.front() {
            if now.duration_since(*front) >= self.period {
                self.grants.pop_front();
            } else {
                break;
            }
        }
    }
}
