use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration for ChannelBot, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Reddit (script app credentials)
    pub reddit_username: String,
    pub reddit_password: String,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub user_agent: String,

    // YouTube
    pub youtube_api_key: String,
    pub link_prefix: String,

    // Storage
    pub storage_file: PathBuf,
    pub seen_items_cap: Option<usize>,

    // Scheduling
    pub inbox_interval: Duration,
    pub feed_interval: Duration,
    pub throttle_interval: Duration,

    // Replies
    pub docs_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            get(key).and_then(non_empty).ok_or_else(|| {
                Error::Config(format!("{key} environment variable is required"))
            })
        };
        let parse_u64 = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());

        let reddit_username = required("REDDIT_USERNAME")?;
        let reddit_password = required("REDDIT_PASSWORD")?;
        let reddit_client_id = required("REDDIT_CLIENT_ID")?;
        let reddit_client_secret = required("REDDIT_CLIENT_SECRET")?;
        let youtube_api_key = required("YOUTUBE_API_KEY")?;

        let user_agent = get("CHANNELBOT_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| "ChannelBot 2.0".to_string());
        let link_prefix = get("CHANNELBOT_LINK_PREFIX")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://www.youtube.com/watch?v=".to_string());
        let storage_file = PathBuf::from(
            get("CHANNELBOT_STORAGE_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| "channels.json".to_string()),
        );

        // 0 or unset = keep every seen id.
        let seen_items_cap = parse_u64("CHANNELBOT_SEEN_ITEMS_CAP")
            .filter(|n| *n > 0)
            .map(|n| n as usize);

        let inbox_interval =
            Duration::from_millis(parse_u64("CHANNELBOT_INBOX_INTERVAL_MS").unwrap_or(2500));
        let feed_interval =
            Duration::from_millis(parse_u64("CHANNELBOT_FEED_INTERVAL_MS").unwrap_or(2500));
        let throttle_interval =
            Duration::from_millis(parse_u64("CHANNELBOT_THROTTLE_MS").unwrap_or(1000));
        if inbox_interval.is_zero() || feed_interval.is_zero() {
            return Err(Error::Config(
                "poll intervals must be greater than zero".to_string(),
            ));
        }

        let docs_url = get("CHANNELBOT_DOCS_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "http://www.reddit.com/r/ChannelBot/wiki/api".to_string());

        Ok(Self {
            reddit_username,
            reddit_password,
            reddit_client_id,
            reddit_client_secret,
            user_agent,
            youtube_api_key,
            link_prefix,
            storage_file,
            seen_items_cap,
            inbox_interval,
            feed_interval,
            throttle_interval,
            docs_url,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("REDDIT_USERNAME", "ChannelBot"),
            ("REDDIT_PASSWORD", "hunter2"),
            ("REDDIT_CLIENT_ID", "cid"),
            ("REDDIT_CLIENT_SECRET", "secret"),
            ("YOUTUBE_API_KEY", "yt"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&base()).unwrap();
        assert_eq!(cfg.user_agent, "ChannelBot 2.0");
        assert_eq!(cfg.storage_file, PathBuf::from("channels.json"));
        assert_eq!(cfg.inbox_interval, Duration::from_millis(2500));
        assert_eq!(cfg.feed_interval, Duration::from_millis(2500));
        assert_eq!(cfg.seen_items_cap, None);
        assert!(cfg.link_prefix.starts_with("https://"));
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = base();
        vars.insert("CHANNELBOT_FEED_INTERVAL_MS", "60000");
        vars.insert("CHANNELBOT_SEEN_ITEMS_CAP", "200");
        vars.insert("CHANNELBOT_LINK_PREFIX", "https://youtu.be/");
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.feed_interval, Duration::from_secs(60));
        assert_eq!(cfg.seen_items_cap, Some(200));
        assert_eq!(cfg.link_prefix, "https://youtu.be/");
    }

    #[test]
    fn missing_credentials_fail() {
        let mut vars = base();
        vars.insert("YOUTUBE_API_KEY", "  ");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("YOUTUBE_API_KEY")));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut vars = base();
        vars.insert("CHANNELBOT_INBOX_INTERVAL_MS", "0");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn dotenv_lines_are_parsed() {
        let parsed = parse_dotenv(
            "# comment\nREDDIT_USERNAME=bot\nexport YOUTUBE_API_KEY='abc'\nbroken line\n =x\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("REDDIT_USERNAME".to_string(), "bot".to_string()),
                ("YOUTUBE_API_KEY".to_string(), "abc".to_string()),
            ]
        );
    }
}
