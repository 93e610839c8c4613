//! Command dispatcher: runs one inbox message through
//! parse → validate → authorize → resolve → uniqueness → commit,
//! then answers the author exactly once.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    command::{AddPayload, ChannelRef, Command},
    domain::{unix_now, Channel, InboundMessage, ResolvedChannel, SeenItems, Timestamp},
    errors::CommandError,
    formatting::reply_for,
    messaging::port::MessagingPort,
    ports::VideoPort,
    registry::Registry,
};

/// Terminal state of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A new channel row was appended to the registry.
    Committed(Channel),
    /// Subject is not (yet) a supported command.
    Unsupported(String),
    Rejected(CommandError),
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    registry: Arc<Registry>,
    messenger: Arc<dyn MessagingPort>,
    video: Arc<dyn VideoPort>,
    docs_url: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        messenger: Arc<dyn MessagingPort>,
        video: Arc<dyn VideoPort>,
        docs_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                messenger,
                video,
                docs_url: docs_url.into(),
            }),
        }
    }

    pub async fn handle(&self, msg: InboundMessage) -> Outcome {
        self.handle_at(msg, unix_now()).await
    }

    /// Process `msg` and send the single reply + mark-read for it.
    ///
    /// The pipeline runs in its own task so that even a panic inside it ends
    /// as an "internal error" reply instead of a lost message.
    pub async fn handle_at(&self, msg: InboundMessage, now: Timestamp) -> Outcome {
        info!(
            "Got a message from '{}' with the subject '{}'",
            msg.author, msg.subject
        );

        let pipeline = self.clone();
        let job_msg = msg.clone();
        let outcome = match tokio::spawn(async move { pipeline.evaluate(&job_msg, now).await })
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error while processing message {}: {e}", msg.id);
                Outcome::Rejected(CommandError::Internal(e.to_string()))
            }
        };

        self.respond(&msg, &outcome).await;
        outcome
    }

    async fn evaluate(&self, msg: &InboundMessage, now: Timestamp) -> Outcome {
        debug!("Parsing message {}", msg.id);
        let command = match Command::parse(msg) {
            Ok(c) => c,
            Err(e) => {
                warn!("Could not parse message {}: {e}", msg.id);
                return Outcome::Rejected(e);
            }
        };

        match command {
            Command::Add(payload) => match self.add(msg, payload, now).await {
                Ok(channel) => Outcome::Committed(channel),
                Err(e) => {
                    warn!("Rejected add from '{}': {e}", msg.author);
                    Outcome::Rejected(e)
                }
            },
            Command::List | Command::Remove => Outcome::Unsupported(msg.subject.trim().to_string()),
            Command::Unknown(subject) => Outcome::Unsupported(subject),
        }
    }

    async fn add(
        &self,
        msg: &InboundMessage,
        payload: AddPayload,
        now: Timestamp,
    ) -> Result<Channel, CommandError> {
        debug!("Validating fields");
        let req = payload.validate()?;

        debug!("Checking if '{}' moderates /r/{}", msg.author, req.subreddit);
        self.authorize(&msg.author, &req.subreddit).await?;

        debug!("Resolving channel '{}'", req.target.identifier());
        let resolved = self.resolve(&req.target).await?;

        let registry = &self.inner.registry;
        if registry
            .list()
            .iter()
            .any(|c| c.is_same_watch(&resolved.id, &req.subreddit))
        {
            return Err(CommandError::Duplicate {
                channel_id: resolved.id,
                destination: req.subreddit,
            });
        }

        let channel = Channel {
            channel_id: resolved.id,
            display_name: resolved.display_name,
            destination: req.subreddit,
            owner: msg.author.clone(),
            registered_at: now,
            last_polled_at: None,
            seen_item_ids: SeenItems::default(),
            feed_cursor: resolved.feed_cursor,
        };
        let index = registry
            .append(channel.clone())
            .map_err(|e| CommandError::Internal(e.to_string()))?;

        info!(
            "Added '{}' ({}) for /r/{} as #{index}",
            channel.display_name, channel.channel_id, channel.destination
        );
        Ok(channel)
    }

    /// The author must be listed as a moderator of `subreddit` with the `all`
    /// permission. Names compare case-insensitively, as on Reddit.
    async fn authorize(&self, author: &str, subreddit: &str) -> Result<(), CommandError> {
        let moderators = self
            .inner
            .messenger
            .list_moderators(subreddit)
            .await
            .map_err(|e| {
                CommandError::Authorization(format!(
                    "Could not check the moderators of /r/{subreddit}: {e}"
                ))
            })?;

        let allowed = moderators
            .iter()
            .any(|m| m.name.eq_ignore_ascii_case(author) && m.has_full_permissions());
        if !allowed {
            return Err(CommandError::Authorization(format!(
                "You're not a moderator of /r/{subreddit} (with full permissions)"
            )));
        }
        Ok(())
    }

    async fn resolve(&self, target: &ChannelRef) -> Result<ResolvedChannel, CommandError> {
        const NOT_FOUND: &str = "Check if your uploads are accessible to everyone and if you \
                                 didn't misspell the channel (id).";

        match self
            .inner
            .video
            .resolve_channel(target.identifier(), target.by_id())
            .await
        {
            Ok(Some(r)) if !r.id.is_empty() && !r.feed_cursor.is_empty() => Ok(r),
            Ok(_) => Err(CommandError::Resolution(NOT_FOUND.to_string())),
            Err(e) => Err(CommandError::LookupFailed(e.to_string())),
        }
    }

    /// Reply and mark read. Failures are logged; the message is never retried.
    async fn respond(&self, msg: &InboundMessage, outcome: &Outcome) {
        let reply = reply_for(outcome, &self.inner.docs_url);
        let messenger = &self.inner.messenger;

        match messenger
            .reply(&msg.author, &reply.headline, &reply.body())
            .await
        {
            Ok(()) => info!("Responded with '{}'", reply.headline),
            Err(e) => warn!("Failed to reply to '{}': {e}", msg.author),
        }
        if let Err(e) = messenger.mark_read(&msg.id).await {
            warn!("Failed to mark {} as read: {e}", msg.id);
        }
    }
}
