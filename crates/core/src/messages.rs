use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Attachment {
    pub fn image(image_url: impl Into<String>) -> Self {
        Self { text: None, image_url: Some(image_url.into()) }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Formatting flags carried with every outbound post.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostOptions {
    pub as_user: bool,
    pub unfurl_links: bool,
    pub link_names: bool,
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub target: String,
    pub text: String,
    pub options: PostOptions,
}

pub struct MessageBuilder {
    target: String,
    text: String,
    options: PostOptions,
}

impl MessageBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), text: String::new(), options: PostOptions::default() }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn as_bot(mut self) -> Self {
        self.options.as_user = true;
        self
    }

    pub fn unfurl_links(mut self) -> Self {
        self.options.unfurl_links = true;
        self
    }

    pub fn link_names(mut self) -> Self {
        self.options.link_names = true;
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.options.attachments.push(attachment);
        self
    }

    pub fn build(self) -> OutboundMessage {
        OutboundMessage { target: self.target, text: self.text, options: self.options }
    }
}

pub const WELCOME_PREAMBLE: &str = "Yo ";

const WELCOME_BODY: &str = "I’d like to welcome you to the Atlanta Black Tech Family. Our mission is to improve the quality, quantity, and connections for people of African descent within the overall Metro Atlanta tech ecosystem.

Please click on “Channels” to browse all of our sub-communities, and join the ones that are most relevant to you. Enjoy your time, and help us build the communities by inviting others in your network.";

pub fn welcome_text(display_name: &str) -> String {
    format!("{WELCOME_PREAMBLE}{display_name}!\n\n{WELCOME_BODY}")
}

/// Direct message greeting a new workspace member, posted as the bot with name linking.
pub fn welcome_message(user_id: &str, display_name: &str) -> OutboundMessage {
    MessageBuilder::new(user_id).text(welcome_text(display_name)).as_bot().link_names().build()
}
