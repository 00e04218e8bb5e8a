use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("could not find bot in the list of names, ensure the bot is called \"{name}\"")]
    BotNotFound { name: String },
}
