use std::sync::Arc;

use mcdowell_core::{
    identity::DEFAULT_BOT_NAME, messages::welcome_message, responders, BotIdentity,
    IdentityError, OutboundMessage,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::{SlackApiError, SlackClient},
    events::{MessageEvent, SlackEvent, TeamJoinEvent},
};

#[derive(Debug, Error)]
pub enum BotError {
    #[error("could not list workspace users: {0}")]
    UserDirectory(#[source] SlackApiError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("failed to send message to `{target}`: {source}")]
    Send {
        target: String,
        #[source]
        source: SlackApiError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// Number of replies posted.
    Responded(usize),
    Ignored,
}

#[derive(Clone, Debug)]
pub struct BotOptions {
    pub name: String,
    /// Accept a directory with no matching bot account.
    pub testing: bool,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self { name: DEFAULT_BOT_NAME.to_owned(), testing: false }
    }
}

pub struct Bot {
    identity: BotIdentity,
    client: Arc<dyn SlackClient>,
}

impl Bot {
    /// Resolves the bot's identity from the workspace directory. Fails when the directory cannot
    /// be read or, outside testing, when no bot account carries the configured name.
    pub async fn new(client: Arc<dyn SlackClient>, options: BotOptions) -> Result<Self, BotError> {
        debug!(bot_name = %options.name, "determining bot/contributor user IDs");

        let users = client.list_users().await.map_err(BotError::UserDirectory)?;
        let identity = BotIdentity::resolve(&options.name, &users, options.testing)?;

        debug!(
            event_name = "bot.identity.resolved",
            bot_id = identity.id().unwrap_or("unresolved"),
            contributors = ?identity.contributors(),
            directory_size = users.len(),
            "resolved bot identity"
        );

        Ok(Self { identity, client })
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub async fn handle_event(&self, event: &SlackEvent) -> Result<HandlerResult, BotError> {
        match event {
            SlackEvent::Message(message) => self.on_new_message(message).await,
            SlackEvent::TeamJoin(join) => {
                self.on_team_joined(join).await?;
                Ok(HandlerResult::Responded(1))
            }
            SlackEvent::Hello | SlackEvent::Goodbye | SlackEvent::Unsupported { .. } => {
                Ok(HandlerResult::Ignored)
            }
        }
    }

    pub async fn on_team_joined(&self, event: &TeamJoinEvent) -> Result<(), BotError> {
        let message = welcome_message(&event.user.id, &event.user.name);
        self.send(&message).await?;

        info!(
            event_name = "bot.welcome.sent",
            user_id = %event.user.id,
            "welcomed new team member"
        );
        Ok(())
    }

    /// Replies once per matching responder. All replies are attempted; the last failure wins.
    pub async fn on_new_message(&self, event: &MessageEvent) -> Result<HandlerResult, BotError> {
        if event.is_from_bot() {
            return Ok(HandlerResult::Ignored);
        }

        let matched = responders::matching(&event.text);
        if matched.is_empty() {
            return Ok(HandlerResult::Ignored);
        }

        let mut outcome = Ok(());
        let mut sent = 0;
        for responder in matched {
            let reply = (responder.respond)(&event.channel_id);
            match self.send(&reply).await {
                Ok(()) => {
                    sent += 1;
                    info!(
                        event_name = "bot.reply.sent",
                        channel_id = %event.channel_id,
                        fragment = responder.fragment,
                        "posted canned reply"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "bot.reply.failed",
                        channel_id = %event.channel_id,
                        fragment = responder.fragment,
                        error = %error,
                        "canned reply failed"
                    );
                    outcome = Err(error);
                }
            }
        }

        outcome.map(|()| HandlerResult::Responded(sent))
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), BotError> {
        self.client
            .post_message(message)
            .await
            .map(|_| ())
            .map_err(|source| BotError::Send { target: message.target.clone(), source })
    }
}
