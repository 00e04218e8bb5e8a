use std::sync::Arc;

use mcdowell_core::config::{AppConfig, ConfigError, RtmConfig};
use mcdowell_slack::{
    Bot, BotError, BotOptions, ReconnectPolicy, RtmRunner, SlackApiError, WebApiClient,
    WebSocketTransport,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub bot: Arc<Bot>,
    pub rtm_runner: RtmRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client setup failed: {0}")]
    SlackClient(#[source] SlackApiError),
    #[error("bot initialization failed: {0}")]
    Bot(#[from] BotError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        bot_name = %config.bot.name,
        "starting application bootstrap"
    );

    let api = WebApiClient::new(config.slack.bot_token.clone(), config.slack.api_base_url.as_str())
        .map_err(BootstrapError::SlackClient)?;

    let bot = Bot::new(
        Arc::new(api.clone()),
        BotOptions { name: config.bot.name.clone(), testing: false },
    )
    .await?;
    info!(
        event_name = "system.bootstrap.identity_resolved",
        bot_id = bot.identity().id().unwrap_or("unresolved"),
        "bot identity resolved"
    );

    let bot = Arc::new(bot);
    let rtm_runner = RtmRunner::new(
        Arc::new(WebSocketTransport::new(api)),
        Arc::clone(&bot),
        reconnect_policy(&config.rtm),
    );

    Ok(Application { config, bot, rtm_runner })
}

fn reconnect_policy(rtm: &RtmConfig) -> ReconnectPolicy {
    ReconnectPolicy {
        max_retries: rtm.max_retries,
        base_delay_ms: rtm.base_delay_ms,
        max_delay_ms: rtm.max_delay_ms,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{routing::post, Form, Json, Router};
    use mcdowell_core::{
        config::{ConfigOverrides, LoadOptions},
        IdentityError,
    };
    use mcdowell_slack::BotError;
    use serde_json::{json, Value};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};
    use mcdowell_core::config::AppConfig;

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    async fn start_fake_directory(members: Value) -> String {
        let router = Router::new().route(
            "/users.list",
            post(move |Form(_form): Form<HashMap<String, String>>| {
                let members = members.clone();
                async move { Json(json!({ "ok": true, "members": members })) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        format!("http://{address}")
    }

    fn options(base_url: Option<String>, token: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some(token.to_string()),
                slack_api_base_url: base_url,
                bot_name: Some("mcdowell".to_string()),
                dev_mode: Some(false),
                log_level: Some("info".to_string()),
                health_check_port: Some(8088),
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_bot_token() {
        let result = bootstrap(options(None, "")).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_resolves_bot_identity_from_directory() {
        let base_url = start_fake_directory(json!([
            { "id": "U1", "name": "willmadison", "is_bot": false },
            { "id": "B1", "name": "mcdowell", "is_bot": true }
        ]))
        .await;

        let app = bootstrap(options(Some(base_url), "xoxb-test")).await.expect("bootstrap");

        assert_eq!(app.bot.identity().id(), Some("B1"));
        assert_eq!(app.bot.identity().contributor("willmadison"), Some("U1"));
        assert_eq!(app.config.bot.name, "mcdowell");
    }

    #[tokio::test]
    async fn bootstrap_refuses_to_start_without_bot_account() {
        let base_url = start_fake_directory(json!([
            { "id": "U2", "name": "mcdowell", "is_bot": false }
        ]))
        .await;

        let result = bootstrap(options(Some(base_url), "xoxb-test")).await;

        assert!(matches!(
            result,
            Err(BootstrapError::Bot(BotError::Identity(IdentityError::BotNotFound { .. })))
        ));
    }
}
