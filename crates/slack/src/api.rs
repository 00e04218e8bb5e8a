//! Slack Web API client.
//!
//! Covers the three methods the bot needs: `chat.postMessage`, `users.list` and `rtm.connect`.

use std::time::Duration;

use async_trait::async_trait;
use mcdowell_core::{DirectoryUser, OutboundMessage};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

const USERS_PAGE_LIMIT: &str = "200";
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("http client init failed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} rejected by slack: {error}")]
    Api { method: &'static str, error: String },
    #[error("{method} returned an unreadable body: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{method} response is missing `{field}`")]
    MissingField { method: &'static str, field: &'static str },
    #[error("could not encode message attachments: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtmSession {
    pub url: String,
    pub self_id: String,
    pub self_name: String,
}

/// The slice of the Slack platform the bot depends on.
#[async_trait]
pub trait SlackClient: Send + Sync {
    async fn post_message(&self, message: &OutboundMessage) -> Result<PostedMessage, SlackApiError>;
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackApiError>;
}

#[derive(Clone)]
pub struct WebApiClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl WebApiClient {
    pub fn new(
        bot_token: SecretString,
        base_url: impl Into<String>,
    ) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(SlackApiError::Client)?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Ok(Self { http, base_url, bot_token })
    }

    pub async fn rtm_connect(&self) -> Result<RtmSession, SlackApiError> {
        const METHOD: &str = "rtm.connect";
        let body: RtmConnectBody = self.call(METHOD, &[]).await?;
        let url = body.url.ok_or(SlackApiError::MissingField { method: METHOD, field: "url" })?;
        let identity =
            body.identity.ok_or(SlackApiError::MissingField { method: METHOD, field: "self" })?;

        Ok(RtmSession { url, self_id: identity.id, self_name: identity.name })
    }

    async fn call<T>(
        &self,
        method: &'static str,
        form: &[(&str, String)],
    ) -> Result<T, SlackApiError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .form(form)
            .send()
            .await
            .map_err(|source| SlackApiError::Http { method, source })?;

        let body: Value =
            response.json().await.map_err(|source| SlackApiError::Http { method, source })?;

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body.get("error").and_then(Value::as_str).unwrap_or("unknown_error");
            return Err(SlackApiError::Api { method, error: error.to_owned() });
        }

        serde_json::from_value(body).map_err(|source| SlackApiError::Decode { method, source })
    }
}

#[async_trait]
impl SlackClient for WebApiClient {
    async fn post_message(
        &self,
        message: &OutboundMessage,
    ) -> Result<PostedMessage, SlackApiError> {
        const METHOD: &str = "chat.postMessage";
        let form = post_message_form(message)?;
        let body: PostMessageBody = self.call(METHOD, &form).await?;
        let ts = body.ts.ok_or(SlackApiError::MissingField { method: METHOD, field: "ts" })?;

        Ok(PostedMessage { channel: body.channel.unwrap_or_else(|| message.target.clone()), ts })
    }

    async fn list_users(&self) -> Result<Vec<DirectoryUser>, SlackApiError> {
        let mut users = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut form = vec![("limit", USERS_PAGE_LIMIT.to_owned())];
            if !cursor.is_empty() {
                form.push(("cursor", cursor.clone()));
            }

            let page: UsersListBody = self.call("users.list", &form).await?;
            debug!(members = page.members.len(), "fetched users.list page");
            users.extend(page.members.into_iter().map(|member| DirectoryUser {
                id: member.id,
                name: member.name,
                is_bot: member.is_bot,
            }));

            let next_cursor =
                page.response_metadata.map(|metadata| metadata.next_cursor).unwrap_or_default();
            if next_cursor.is_empty() || next_cursor == cursor {
                return Ok(users);
            }
            cursor = next_cursor;
        }
    }
}

fn post_message_form(
    message: &OutboundMessage,
) -> Result<Vec<(&'static str, String)>, SlackApiError> {
    let options = &message.options;
    let mut form = vec![("channel", message.target.clone()), ("text", message.text.clone())];

    if options.as_user {
        form.push(("as_user", "true".to_owned()));
    }
    if options.link_names {
        form.push(("link_names", "1".to_owned()));
    }
    if options.unfurl_links {
        form.push(("unfurl_links", "true".to_owned()));
    }
    if !options.attachments.is_empty() {
        let attachments =
            serde_json::to_string(&options.attachments).map_err(SlackApiError::Encode)?;
        form.push(("attachments", attachments));
    }

    Ok(form)
}

#[derive(Debug, Deserialize)]
struct PostMessageBody {
    channel: Option<String>,
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersListBody {
    #[serde(default)]
    members: Vec<Member>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct RtmConnectBody {
    url: Option<String>,
    #[serde(rename = "self")]
    identity: Option<RtmSelf>,
}

#[derive(Debug, Deserialize)]
struct RtmSelf {
    id: String,
    name: String,
}
