//! Interval pollers
//!
//! A [`Poller`] owns one background task and aborts it when dropped. Polls
//! run at a fixed period with no jitter or backoff.

use crate::api::PatronApi;
use crate::roles::RoleCache;
use crate::types::MiningStatus;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("{0} poll period must be greater than zero")]
    ZeroPeriod(&'static str),
}

/// Handle to a background polling task
#[derive(Debug)]
pub struct Poller {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Call `tick` immediately and then every `period`
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Result<Self, PollError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(PollError::ZeroPeriod(name));
        }
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        debug!(poller = name, period_ms = period.as_millis() as u64, "Poller started");
        Ok(Self { name, handle })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {}
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(poller = self.name, "Poller stopped");
    }
}

/// Poll `/user/mining_status` every `period` while a session is present.
///
/// Failed polls are logged and leave the last value in place.
pub fn spawn_mining_status_poller(
    api: PatronApi,
    period: Duration,
) -> Result<(Poller, watch::Receiver<Option<MiningStatus>>), PollError> {
    let (tx, rx) = watch::channel(None);
    let poller = Poller::spawn("mining_status", period, move || {
        let api = api.clone();
        let tx = tx.clone();
        async move {
            if api.client().session_token().is_none() {
                debug!("Not authenticated, skipping mining status poll");
                return;
            }
            match api.mining_status().await.into_result() {
                Ok(status) => {
                    tx.send_replace(Some(status));
                }
                Err(err) => warn!(error = %err, "Mining status poll failed"),
            }
        }
    })?;
    Ok((poller, rx))
}

/// Keep `cache` in step with `/user/role` while a session is present
pub fn spawn_role_refresher(cache: RoleCache, api: PatronApi, period: Duration) -> Result<Poller, PollError> {
    Poller::spawn("role", period, move || {
        let cache = cache.clone();
        let api = api.clone();
        async move {
            if api.client().session_token().is_none() {
                debug!("Not authenticated, skipping role refresh");
                return;
            }
            if let Err(err) = cache.refresh(&api).await {
                warn!(error = %err, "Role refresh failed");
            }
        }
    })
}

/// Visible countdown, one step per tick, ending at zero
#[derive(Debug)]
pub struct Cooldown {
    _poller: Poller,
    remaining: watch::Receiver<u64>,
}

impl Cooldown {
    pub fn start(seconds: u64, tick: Duration) -> Result<Self, PollError> {
        if tick.is_zero() {
            return Err(PollError::ZeroPeriod("cooldown"));
        }
        let (tx, rx) = watch::channel(seconds);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            while *tx.borrow() > 0 {
                ticker.tick().await;
                tx.send_modify(|left| *left = left.saturating_sub(1));
            }
        });
        Ok(Self {
            _poller: Poller {
                name: "cooldown",
                handle,
            },
            remaining: rx,
        })
    }

    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.remaining() == 0
    }

    pub fn watch(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_poller_ticks_until_dropped() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let poller = Poller::spawn("test", Duration::from_secs(30), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(poller);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_counts_down_to_zero() {
        let cooldown = Cooldown::start(3, Duration::from_secs(1)).unwrap();
        assert_eq!(cooldown.remaining(), 3);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cooldown.remaining(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(cooldown.is_ready());
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let err = Poller::spawn("test", Duration::ZERO, || async {}).unwrap_err();
        assert_eq!(err, PollError::ZeroPeriod("test"));
        assert_eq!(err.to_string(), "test poll period must be greater than zero");

        assert!(Cooldown::start(3, Duration::ZERO).is_err());
    }
}
