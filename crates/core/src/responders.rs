//! Keyword responders.
//!
//! Each entry pairs a lowercase fragment with the action that builds the reply. Message text is
//! trimmed and lowercased before matching, and every entry whose fragment appears in the text
//! fires, in table order.

use crate::messages::{Attachment, MessageBuilder, OutboundMessage};

pub const ZAMUNDA_MONEY_IMAGE_URL: &str =
    "https://novembrepleut.files.wordpress.com/2011/06/zamundamoney_100.png";
pub const SOUL_GLO_IMAGE_URL: &str = "https://media.giphy.com/media/3Gz3vy81HkDa8/giphy.gif";

/// Builds the reply for the channel a fragment was seen in.
pub type ResponseAction = fn(channel_id: &str) -> OutboundMessage;

pub struct Responder {
    pub fragment: &'static str,
    pub respond: ResponseAction,
}

pub static RESPONDERS: [Responder; 3] = [
    Responder { fragment: "show me the money", respond: show_me_the_money },
    Responder { fragment: "let me hold something", respond: let_me_hold_something },
    Responder { fragment: "soul glo", respond: soul_glo },
];

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Responders whose fragment occurs in the normalized (trimmed, lowercased) message text.
pub fn matching(text: &str) -> Vec<&'static Responder> {
    let normalized = normalize(text);
    RESPONDERS.iter().filter(|responder| normalized.contains(responder.fragment)).collect()
}

fn canned_reply(channel_id: &str, attachment: Attachment) -> OutboundMessage {
    MessageBuilder::new(channel_id).as_bot().unfurl_links().attachment(attachment).build()
}

fn show_me_the_money(channel_id: &str) -> OutboundMessage {
    canned_reply(
        channel_id,
        Attachment::image(ZAMUNDA_MONEY_IMAGE_URL).text("The boy has got his own money!"),
    )
}

fn let_me_hold_something(channel_id: &str) -> OutboundMessage {
    canned_reply(channel_id, Attachment::image(ZAMUNDA_MONEY_IMAGE_URL).text("I got you!"))
}

fn soul_glo(channel_id: &str) -> OutboundMessage {
    canned_reply(channel_id, Attachment::image(SOUL_GLO_IMAGE_URL))
}
