use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{InboundMessage, MessageId, Moderator},
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* platform API calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between announcements into the same destination.
    pub per_destination_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // Reddit allows ~60 OAuth requests/minute per client.
        Self {
            global_min_interval: Duration::from_millis(1000),
            per_destination_min_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that rate-limits outbound calls.
///
/// Best-effort: it keeps the bot under the platform's request budget when the
/// inbox and feed tasks fire together, it does not replace server-side limits.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_destination: Mutex<HashMap<String, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_destination: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_destination(&self, destination: &str) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_destination.lock().await;
        map.entry(destination.to_ascii_lowercase())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_destination_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_destination(&self, destination: &str) {
        let global_wait = { self.global.lock().await.reserve() };
        let dest_wait = {
            let lim = self.limiter_for_destination(destination).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(dest_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>> {
        self.throttle_global().await;
        self.inner.fetch_unread().await
    }

    async fn reply(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.throttle_global().await;
        self.inner.reply(to, subject, body).await
    }

    async fn mark_read(&self, id: &MessageId) -> Result<()> {
        self.throttle_global().await;
        self.inner.mark_read(id).await
    }

    async fn publish(&self, destination: &str, title: &str, url: &str) -> Result<()> {
        self.throttle_destination(destination).await;
        self.inner.publish(destination, title, url).await
    }

    async fn list_moderators(&self, destination: &str) -> Result<Vec<Moderator>> {
        self.throttle_global().await;
        self.inner.list_moderators(destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeMessenger;

    #[test]
    fn interval_limiter_spaces_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_millis(100));
        assert_eq!(lim.reserve(), Duration::ZERO);
        let second = lim.reserve();
        assert!(second > Duration::from_millis(50));
        assert!(second <= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_to_same_destination_are_spaced() {
        let fake = Arc::new(FakeMessenger::default());
        let throttled = ThrottledMessenger::new(
            fake.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(10),
                per_destination_min_interval: Duration::from_secs(5),
            },
        );

        let start = Instant::now();
        throttled.publish("videos", "a", "u1").await.unwrap();
        throttled.publish("Videos", "b", "u2").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(fake.published().len(), 2);
    }
}
