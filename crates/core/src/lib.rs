pub mod config;
pub mod errors;
pub mod identity;
pub mod messages;
pub mod responders;

pub use errors::IdentityError;
pub use identity::{BotIdentity, DirectoryUser};
pub use messages::{Attachment, MessageBuilder, OutboundMessage, PostOptions};
pub use responders::{Responder, RESPONDERS};
