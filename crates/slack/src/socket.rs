use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{
    api::WebApiClient,
    bot::Bot,
    events::{SlackEvent, SlackEventType},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// A source of inbound Slack events. `Ok(None)` means the stream ended cleanly.
#[async_trait]
pub trait RtmTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_event(&self) -> Result<Option<SlackEvent>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

type RtmSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// RTM over a WebSocket opened through `rtm.connect`.
pub struct WebSocketTransport {
    api: WebApiClient,
    socket: Mutex<Option<RtmSocket>>,
}

impl WebSocketTransport {
    pub fn new(api: WebApiClient) -> Self {
        Self { api, socket: Mutex::new(None) }
    }
}

#[async_trait]
impl RtmTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let session = self
            .api
            .rtm_connect()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (socket, _) = tokio_tungstenite::connect_async(session.url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        debug!(self_id = %session.self_id, self_name = %session.self_name, "rtm session opened");
        *self.socket.lock().await = Some(socket);
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<SlackEvent>, TransportError> {
        let mut guard = self.socket.lock().await;
        let socket = guard
            .as_mut()
            .ok_or_else(|| TransportError::Receive("transport is not connected".to_owned()))?;

        loop {
            let frame = match socket.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                None => return Err(TransportError::Receive("socket stream ended".to_owned())),
            };

            match frame {
                Message::Text(text) => match SlackEvent::from_json(&text) {
                    Ok(SlackEvent::Goodbye) => {
                        return Err(TransportError::Receive(
                            "server requested reconnect (goodbye)".to_owned(),
                        ));
                    }
                    Ok(event) => return Ok(Some(event)),
                    Err(error) => debug!(error = %error, "skipping unreadable rtm frame"),
                },
                Message::Ping(payload) => {
                    if let Err(error) = socket.send(Message::Pong(payload)).await {
                        return Err(TransportError::Receive(error.to_string()));
                    }
                }
                Message::Close(_) => {
                    return Err(TransportError::Receive("socket closed by server".to_owned()));
                }
                _ => {}
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut socket) = self.socket.lock().await.take() else {
            return Ok(());
        };
        socket.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

/// Pumps events from the transport into the bot, one spawned task per event.
pub struct RtmRunner {
    transport: Arc<dyn RtmTransport>,
    bot: Arc<Bot>,
    reconnect_policy: ReconnectPolicy,
}

impl RtmRunner {
    pub fn new(
        transport: Arc<dyn RtmTransport>,
        bot: Arc<Bot>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, bot, reconnect_policy }
    }

    /// Runs until the stream ends cleanly or reconnects are exhausted. A successful connection
    /// restores the full retry budget.
    pub async fn start(&self) -> Result<()> {
        let mut attempt = 0;

        loop {
            let (connected, transport_error) = match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(failure) => failure,
            };
            if connected {
                attempt = 0;
            }

            warn!(
                attempt,
                max_retries = self.reconnect_policy.max_retries,
                error = %transport_error,
                "rtm transport failed"
            );

            if let Err(error) = self.transport.disconnect().await {
                debug!(error = %error, "rtm disconnect after failure did not complete");
            }

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "rtm retries exhausted; no longer receiving slack events"
                );
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), (bool, TransportError)> {
        info!(attempt, "opening rtm transport connection");
        self.transport.connect().await.map_err(|error| (false, error))?;
        info!(attempt, "rtm transport connected");

        loop {
            let next = self.transport.next_event().await.map_err(|error| (true, error))?;
            let Some(event) = next else {
                info!(attempt, "rtm transport stream closed");
                self.transport.disconnect().await.map_err(|error| (true, error))?;
                return Ok(());
            };

            let event_type = event.event_type();
            if matches!(event_type, SlackEventType::Hello) {
                info!(
                    event_name = "ingress.slack.hello",
                    "listening for incoming events from slack"
                );
                continue;
            }

            debug!(
                event_name = "ingress.slack.event_received",
                ?event_type,
                "received slack event"
            );
            self.spawn_handler(event, event_type);
        }
    }

    fn spawn_handler(&self, event: SlackEvent, event_type: SlackEventType) {
        let bot = Arc::clone(&self.bot);
        tokio::spawn(async move {
            match bot.handle_event(&event).await {
                Ok(result) => {
                    debug!(?event_type, ?result, "slack event handled");
                }
                Err(error) => {
                    warn!(
                        event_name = "ingress.slack.handler_failed",
                        ?event_type,
                        error = %error,
                        "event handler failed; continuing rtm loop"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use super::{ReconnectPolicy, RtmRunner, RtmTransport, TransportError};
    use crate::bot::{tests::RecordingClient, Bot, BotOptions};
    use crate::events::{MessageEvent, SlackEvent, TeamJoinEvent, TeamMember};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        events: VecDeque<Result<Option<SlackEvent>, TransportError>>,
        connect_attempts: usize,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            events: Vec<Result<Option<SlackEvent>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    events: events.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl RtmTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_event(&self) -> Result<Option<SlackEvent>, TransportError> {
            let mut state = self.state.lock().await;
            state.events.pop_front().unwrap_or(Ok(None))
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    fn fast_policy(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    async fn testing_bot() -> (Arc<Bot>, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient::default());
        let bot = Bot::new(client.clone(), BotOptions { testing: true, ..BotOptions::default() })
            .await
            .expect("bot");
        (Arc::new(bot), client)
    }

    async fn wait_for_sends(client: &RecordingClient, expected: usize) -> usize {
        for _ in 0..100 {
            let count = client.sent().await.len();
            if count >= expected {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        client.sent().await.len()
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let (bot, client) = testing_bot().await;
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![
                Ok(Some(SlackEvent::Hello)),
                Ok(Some(SlackEvent::Message(MessageEvent {
                    channel_id: "C1".to_owned(),
                    user_id: "U1".to_owned(),
                    text: "show me the money".to_owned(),
                    ..MessageEvent::default()
                }))),
                Ok(None),
            ],
        ));

        let runner = RtmRunner::new(transport.clone(), bot, fast_policy(2));
        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(wait_for_sends(&client, 1).await, 1);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let (bot, _client) = testing_bot().await;
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = RtmRunner::new(transport.clone(), bot, fast_policy(2));

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn read_failure_after_connecting_restores_retry_budget() {
        let (bot, _client) = testing_bot().await;
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(()), Ok(()), Err(TransportError::Connect("fail".to_owned()))],
            vec![
                Err(TransportError::Receive("goodbye".to_owned())),
                Err(TransportError::Receive("goodbye".to_owned())),
            ],
        ));

        let runner = RtmRunner::new(transport.clone(), bot, fast_policy(1));

        runner.start().await.expect("runner should not fail");
        assert_eq!(transport.connect_attempts().await, 3);
        assert_eq!(transport.disconnect_calls().await, 3);
    }

    #[tokio::test]
    async fn handler_failures_do_not_stop_the_pump() {
        let client = Arc::new(RecordingClient {
            failing_targets: vec!["U-bad".to_owned()],
            ..RecordingClient::default()
        });
        let bot = Bot::new(client.clone(), BotOptions { testing: true, ..BotOptions::default() })
            .await
            .expect("bot");
        let join = |id: &str| -> Result<Option<SlackEvent>, TransportError> {
            Ok(Some(SlackEvent::TeamJoin(TeamJoinEvent {
                user: TeamMember { id: id.to_owned(), name: "Semmi".to_owned() },
            })))
        };
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![join("U-bad"), join("U-good"), Ok(None)],
        ));

        let runner = RtmRunner::new(transport.clone(), Arc::new(bot), fast_policy(0));
        runner.start().await.expect("runner should not fail");

        assert_eq!(wait_for_sends(&client, 2).await, 2);
        assert_eq!(transport.connect_attempts().await, 1);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(10), Duration::from_millis(5_000));
    }
}
