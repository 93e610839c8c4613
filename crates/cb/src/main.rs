use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use cb_core::{
    config::Config,
    dispatch::Dispatcher,
    inbox::Inbox,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    monitor::{FeedMonitor, MonitorConfig},
    ports::VideoPort,
    registry::{JsonFileStore, Registry},
    scheduler::{ScheduleConfig, Scheduler},
    tracker::HandledMessages,
};
use cb_reddit::{RedditClient, RedditConfig};
use cb_youtube::YouTubeClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cb_core::logging::init("cb")?;

    let cfg = Config::load()?;
    info!("{} starting", cfg.user_agent);

    let store = Arc::new(JsonFileStore::new(cfg.storage_file.clone()));
    let registry = Arc::new(
        Registry::open(store)
            .with_context(|| format!("loading {}", cfg.storage_file.display()))?,
    );
    info!("Loaded {} channels", registry.len());

    let reddit = RedditClient::new(RedditConfig {
        username: cfg.reddit_username.clone(),
        password: cfg.reddit_password.clone(),
        client_id: cfg.reddit_client_id.clone(),
        client_secret: cfg.reddit_client_secret.clone(),
        user_agent: cfg.user_agent.clone(),
    })?;
    reddit.login().await.context("reddit login")?;
    info!("Logged in to reddit as {}", cfg.reddit_username);

    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        Arc::new(reddit),
        ThrottleConfig {
            global_min_interval: cfg.throttle_interval,
            ..ThrottleConfig::default()
        },
    ));
    let video: Arc<dyn VideoPort> = Arc::new(YouTubeClient::new(cfg.youtube_api_key.clone())?);

    let dispatcher = Dispatcher::new(
        registry.clone(),
        messenger.clone(),
        video.clone(),
        cfg.docs_url.clone(),
    );
    let inbox = Inbox::new(
        messenger.clone(),
        Arc::new(HandledMessages::default()),
        dispatcher,
    );
    let monitor = FeedMonitor::new(
        registry,
        messenger,
        video,
        MonitorConfig {
            link_prefix: cfg.link_prefix.clone(),
            seen_items_cap: cfg.seen_items_cap,
        },
    );

    let scheduler = Scheduler::new(
        inbox,
        monitor,
        ScheduleConfig {
            inbox_interval: cfg.inbox_interval,
            feed_interval: cfg.feed_interval,
        },
    );
    scheduler.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("Shutting down");
    scheduler.stop().await;

    Ok(())
}
