use std::collections::BTreeMap;

use crate::errors::IdentityError;

pub const DEFAULT_BOT_NAME: &str = "mcdowell";

/// Usernames whose Slack IDs are looked up at startup.
pub const CONTRIBUTORS: [&str; 2] = ["willmadison", "xango"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub name: String,
    pub is_bot: bool,
}

/// Who the bot is, resolved once from the workspace user directory and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BotIdentity {
    id: Option<String>,
    name: String,
    contributors: BTreeMap<String, String>,
}

impl BotIdentity {
    /// Scans the directory once. Contributor usernames take precedence over the bot name, and a
    /// user only counts as the bot when the account is flagged as a bot account.
    ///
    /// With `tolerate_missing_bot` set an unresolved bot ID is accepted.
    pub fn resolve(
        name: &str,
        users: &[DirectoryUser],
        tolerate_missing_bot: bool,
    ) -> Result<Self, IdentityError> {
        let mut identity =
            Self { id: None, name: name.to_owned(), contributors: BTreeMap::new() };

        for user in users {
            if CONTRIBUTORS.contains(&user.name.as_str()) {
                identity.contributors.insert(user.name.clone(), user.id.clone());
            } else if user.name == name && user.is_bot {
                identity.id = Some(user.id.clone());
            }
        }

        if identity.id.is_none() && !tolerate_missing_bot {
            return Err(IdentityError::BotNotFound { name: name.to_owned() });
        }

        Ok(identity)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contributor(&self, username: &str) -> Option<&str> {
        self.contributors.get(username).map(String::as_str)
    }

    pub fn contributors(&self) -> &BTreeMap<String, String> {
        &self.contributors
    }
}

#[cfg(test)]
mod tests {
    use super::{BotIdentity, DirectoryUser};
    use crate::errors::IdentityError;

    fn user(id: &str, name: &str, is_bot: bool) -> DirectoryUser {
        DirectoryUser { id: id.to_owned(), name: name.to_owned(), is_bot }
    }

    #[test]
    fn resolves_bot_and_contributors_in_one_pass() {
        let users = vec![
            user("U1", "willmadison", false),
            user("U2", "xango", false),
            user("B1", "mcdowell", true),
            user("U3", "someone-else", false),
        ];

        let identity = BotIdentity::resolve("mcdowell", &users, false).expect("resolve");

        assert_eq!(identity.id(), Some("B1"));
        assert_eq!(identity.name(), "mcdowell");
        assert_eq!(identity.contributor("willmadison"), Some("U1"));
        assert_eq!(identity.contributor("xango"), Some("U2"));
        assert_eq!(identity.contributors().len(), 2);
        assert_eq!(identity.contributor("someone-else"), None);
    }

    #[test]
    fn human_account_with_bot_name_is_not_the_bot() {
        let users = vec![user("U9", "mcdowell", false)];

        let error = BotIdentity::resolve("mcdowell", &users, false).expect_err("should fail");

        assert_eq!(error, IdentityError::BotNotFound { name: "mcdowell".to_owned() });
    }

    #[test]
    fn tolerant_resolution_leaves_bot_id_unset() {
        let users = vec![user("U9", "mcdowell", false), user("U1", "willmadison", false)];

        let identity = BotIdentity::resolve("mcdowell", &users, true).expect("resolve");

        assert_eq!(identity.id(), None);
        assert_eq!(identity.contributor("willmadison"), Some("U1"));
    }

    #[test]
    fn contributor_name_wins_over_configured_bot_name() {
        let users = vec![user("B7", "xango", true)];

        let identity = BotIdentity::resolve("xango", &users, true).expect("resolve");

        assert_eq!(identity.id(), None);
        assert_eq!(identity.contributor("xango"), Some("B7"));
    }

    #[test]
    fn honours_custom_bot_name() {
        let users = vec![user("B1", "mcdowell", true), user("B2", "cleo", true)];

        let identity = BotIdentity::resolve("cleo", &users, false).expect("resolve");

        assert_eq!(identity.id(), Some("B2"));
    }
}
