//! Reddit adapter.
//!
//! Implements the `cb-core` MessagingPort over Reddit's OAuth API using a
//! "script" app (password grant).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use cb_core::{
    domain::{InboundMessage, MessageId, Moderator},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Refresh the token this long before Reddit says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct RedditConfig {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditClient {
    cfg: RedditConfig,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

impl RedditClient {
    pub fn new(cfg: RedditConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::External(format!("reddit client build error: {e}")))?;
        Ok(Self {
            cfg,
            http,
            token: Mutex::new(None),
        })
    }

    /// Fetch a token up front so bad credentials fail at startup.
    pub async fn login(&self) -> Result<()> {
        self.bearer().await.map(|_| ())
    }

    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(tok) = guard.as_ref() {
            if Instant::now() < tok.expires_at {
                return Ok(tok.value.clone());
            }
        }

        debug!("Requesting reddit access token for {}", self.cfg.username);
        let resp = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.cfg.username.as_str()),
                ("password", self.cfg.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::External(format!("reddit auth request error: {e}")))?;

        let status = resp.status();
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("reddit auth json error: {e}")))?;

        let Some(value) = body.access_token.filter(|t| !t.is_empty()) else {
            return Err(Error::External(format!(
                "reddit login failed: {status} {}",
                body.error.unwrap_or_default()
            )));
        };

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(value)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .send()
            .await
            .map_err(|e| Error::External(format!("reddit request error: {e}")))?;
        read_json(resp, path).await
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Value> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::External(format!("reddit request error: {e}")))?;
        read_json(resp, path).await
    }
}

async fn read_json(resp: reqwest::Response, path: &str) -> Result<Value> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::External(format!(
            "reddit {path} failed: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    resp.json()
        .await
        .map_err(|e| Error::External(format!("reddit {path} json error: {e}")))
}

#[async_trait]
impl MessagingPort for RedditClient {
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>> {
        let v = self.get_json("/message/unread?limit=100").await?;
        parse_unread(&v)
    }

    async fn reply(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let v = self
            .post_form(
                "/api/compose",
                &[
                    ("api_type", "json"),
                    ("to", to),
                    ("subject", subject),
                    ("text", body),
                ],
            )
            .await?;
        check_json_errors(&v)
    }

    async fn mark_read(&self, id: &MessageId) -> Result<()> {
        self.post_form("/api/read_message", &[("id", id.0.as_str())])
            .await?;
        Ok(())
    }

    async fn publish(&self, destination: &str, title: &str, url: &str) -> Result<()> {
        let v = self
            .post_form(
                "/api/submit",
                &[
                    ("api_type", "json"),
                    ("kind", "link"),
                    ("sr", destination),
                    ("title", title),
                    ("url", url),
                    ("resubmit", "true"),
                ],
            )
            .await?;
        check_json_errors(&v)
    }

    async fn list_moderators(&self, destination: &str) -> Result<Vec<Moderator>> {
        let v = self
            .get_json(&format!("/r/{destination}/about/moderators"))
            .await?;
        parse_moderators(&v)
    }
}

// === Response parsing ===

/// Parse a `/message/unread` listing.
pub fn parse_unread(v: &Value) -> Result<Vec<InboundMessage>> {
    let children = listing_children(v)?;
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let data = child.get("data").unwrap_or(child);
        let Some(name) = data.get("name").and_then(Value::as_str) else {
            continue;
        };
        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        out.push(InboundMessage {
            id: MessageId(name.to_string()),
            author: text("author"),
            subject: text("subject"),
            body: text("body"),
            is_reply: data
                .get("was_comment")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        });
    }
    Ok(out)
}

/// Parse a `/r/{sub}/about/moderators` user list.
pub fn parse_moderators(v: &Value) -> Result<Vec<Moderator>> {
    let children = listing_children(v)?;
    Ok(children
        .iter()
        .filter_map(|m| {
            let name = m.get("name")?.as_str()?.to_string();
            let permissions = m
                .get("mod_permissions")
                .and_then(Value::as_array)
                .map(|ps| {
                    ps.iter()
                        .filter_map(|p| p.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            Some(Moderator { name, permissions })
        })
        .collect())
}

fn listing_children(v: &Value) -> Result<&Vec<Value>> {
    v.get("data")
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
        .ok_or_else(|| Error::External("reddit response is not a listing".to_string()))
}

/// `api_type=json` endpoints report failures in `json.errors` with a 200.
pub fn check_json_errors(v: &Value) -> Result<()> {
    let errors = v
        .get("json")
        .and_then(|j| j.get("errors"))
        .and_then(Value::as_array);
    match errors {
        Some(errs) if !errs.is_empty() => {
            let msg = errs
                .iter()
                .map(|e| match e.as_array() {
                    Some(parts) => parts
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(": "),
                    None => e.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            Err(Error::External(format!("reddit rejected request: {msg}")))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unread_listing_maps_messages_and_comment_flag() {
        let v = json!({
            "kind": "Listing",
            "data": {"children": [
                {"kind": "t4", "data": {
                    "name": "t4_abc", "author": "alice", "subject": "add",
                    "body": "subreddit: videos", "was_comment": false
                }},
                {"kind": "t1", "data": {
                    "name": "t1_def", "author": "bob", "subject": "comment reply",
                    "body": "thanks", "was_comment": true
                }},
                {"kind": "t4", "data": {"author": "nameless"}}
            ]}
        });

        let msgs = parse_unread(&v).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].id, MessageId("t4_abc".into()));
        assert_eq!(msgs[0].subject, "add");
        assert!(!msgs[0].is_reply);
        assert!(msgs[1].is_reply);
    }

    #[test]
    fn moderators_keep_permissions() {
        let v = json!({
            "kind": "UserList",
            "data": {"children": [
                {"name": "alice", "mod_permissions": ["all"]},
                {"name": "bob", "mod_permissions": ["posts", "wiki"]},
                {"name": "carol"}
            ]}
        });
        let mods = parse_moderators(&v).unwrap();
        assert_eq!(mods.len(), 3);
        assert!(mods[0].has_full_permissions());
        assert!(!mods[1].has_full_permissions());
        assert!(mods[2].permissions.is_empty());
    }

    #[test]
    fn non_listing_is_an_error() {
        assert!(parse_moderators(&json!({"error": 403})).is_err());
    }

    #[test]
    fn json_errors_are_surfaced() {
        assert!(check_json_errors(&json!({"json": {"errors": [], "data": {}}})).is_ok());
        let err = check_json_errors(&json!({
            "json": {"errors": [["SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"]]}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("SUBREDDIT_NOEXIST"));
    }
}
