//! Periodic driver for the inbox and feed tasks.
//!
//! Each task is its own loop on a fixed interval. A cycle always runs to
//! completion before the next tick is awaited, so the same task never
//! overlaps itself; the two tasks do run concurrently with each other.
//! Stopping cancels the loops between cycles.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{inbox::Inbox, monitor::FeedMonitor};

#[derive(Clone, Copy, Debug)]
pub struct ScheduleConfig {
    pub inbox_interval: Duration,
    pub feed_interval: Duration,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    inbox: Inbox,
    monitor: FeedMonitor,
    cfg: ScheduleConfig,
    state: tokio::sync::Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    cancel: CancellationToken,
    inbox_task: Option<JoinHandle<()>>,
    feed_task: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(inbox: Inbox, monitor: FeedMonitor, cfg: ScheduleConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                inbox,
                monitor,
                cfg,
                state: tokio::sync::Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// Spawn both loops. Calling it again while running is a no-op; after
    /// [`stop`](Self::stop) it starts fresh loops.
    pub async fn start(&self) {
        let mut st = self.inner.state.lock().await;
        if st.inbox_task.is_some() || st.feed_task.is_some() {
            return;
        }

        st.cancel = CancellationToken::new();
        let (scheduler, cancel) = (self.clone(), st.cancel.clone());
        st.inbox_task = Some(tokio::spawn(async move { scheduler.inbox_loop(cancel).await }));
        let (scheduler, cancel) = (self.clone(), st.cancel.clone());
        st.feed_task = Some(tokio::spawn(async move { scheduler.feed_loop(cancel).await }));

        info!(
            "Monitoring inbox every {:?} and feeds every {:?}",
            self.inner.cfg.inbox_interval, self.inner.cfg.feed_interval
        );
    }

    /// Cancel both loops and wait for the running cycles to finish.
    pub async fn stop(&self) {
        let (inbox, feed) = {
            let mut st = self.inner.state.lock().await;
            st.cancel.cancel();
            (st.inbox_task.take(), st.feed_task.take())
        };
        for handle in [inbox, feed].into_iter().flatten() {
            let _ = handle.await;
        }
        info!("Scheduler stopped");
    }

    async fn inbox_loop(&self, cancel: CancellationToken) {
        let mut tick = interval(self.inner.cfg.inbox_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {}
            }
            let report = self.inner.inbox.poll_once().await;
            if report.fetched > 0 {
                debug!(?report, "inbox cycle finished");
            }
        }
    }

    async fn feed_loop(&self, cancel: CancellationToken) {
        let mut tick = interval(self.inner.cfg.feed_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {}
            }
            self.inner.monitor.poll_all().await;
        }
    }
}
