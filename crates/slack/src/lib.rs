//! Slack integration for the McDowell bot
//!
//! - **Web API** (`api`) - `chat.postMessage`, `users.list`, `rtm.connect`
//! - **Events** (`events`) - RTM frames decoded into typed events
//! - **Bot** (`bot`) - identity resolution, welcome DMs, keyword replies
//! - **RTM** (`socket`) - WebSocket event stream with reconnection, one task per event
//!
//! # Architecture
//!
//! ```text
//! rtm.connect → WebSocketTransport → RtmRunner ─spawn→ Bot::handle_event
//!                                                        ↓
//!                                         SlackClient::post_message
//! ```

pub mod api;
pub mod bot;
pub mod events;
pub mod socket;

pub use api::{SlackApiError, SlackClient, WebApiClient};
pub use bot::{Bot, BotError, BotOptions, HandlerResult};
pub use events::{MessageEvent, SlackEvent, TeamJoinEvent};
pub use socket::{ReconnectPolicy, RtmRunner, RtmTransport, WebSocketTransport};
