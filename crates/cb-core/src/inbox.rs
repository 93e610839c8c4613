//! Inbox task body: fetch unread messages and feed new ones to the dispatcher.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dispatch::Dispatcher, messaging::port::MessagingPort, tracker::HandledMessages,
};

/// Counts for one inbox cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InboxReport {
    pub fetched: usize,
    pub duplicates: usize,
    pub comment_replies: usize,
    pub dispatched: usize,
}

pub struct Inbox {
    messenger: Arc<dyn MessagingPort>,
    handled: Arc<HandledMessages>,
    dispatcher: Dispatcher,
}

impl Inbox {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        handled: Arc<HandledMessages>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            messenger,
            handled,
            dispatcher,
        }
    }

    /// One inbox cycle. Messages are handled one at a time, in fetch order.
    pub async fn poll_once(&self) -> InboxReport {
        let mut report = InboxReport::default();

        let unread = match self.messenger.fetch_unread().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Can't get unread messages: {e}");
                return report;
            }
        };
        report.fetched = unread.len();

        for msg in unread {
            if self.handled.seen(&msg.id) {
                report.duplicates += 1;
                continue;
            }
            self.handled.mark(&msg.id);

            if msg.is_reply {
                debug!("Ignored a comment reply from {}", msg.author);
                report.comment_replies += 1;
                if let Err(e) = self.messenger.mark_read(&msg.id).await {
                    warn!("Failed to mark {} as read: {e}", msg.id);
                }
                continue;
            }

            self.dispatcher.handle(msg).await;
            report.dispatched += 1;
        }

        report
    }
}
