//! Configuration for a chat session.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ChatError, Result};
use crate::model::UserData;

/// Origin the widget document is served from. Only this origin is loaded.
pub const TRUSTED_ORIGIN: &str = "https://chat.assembled.com";

/// Path of the widget document under [`TRUSTED_ORIGIN`].
const DOCUMENT_PATH: &str = "/public_chat.html";

/// Immutable configuration for one chat session.
///
/// Created by the embedding application and handed to
/// [`AssembledChat`](crate::AssembledChat); lives for the lifetime of that
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfiguration {
    /// The company's unique identifier in the Assembled system. Required.
    pub company_id: String,

    /// Profile id for multi-profile chat configurations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,

    /// Whether the chat widget is activated.
    pub activated: bool,

    /// Whether to suppress the chat launcher button.
    pub disable_launcher: bool,

    /// Custom color for the launcher button (hex format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_color: Option<String>,

    /// Whether to enable debug mode for additional logging.
    pub debug: bool,

    /// JWT token for user authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_token: Option<String>,

    /// User data to associate with the chat session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

impl ChatConfiguration {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            profile_id: None,
            activated: true,
            disable_launcher: false,
            button_color: None,
            debug: false,
            jwt_token: None,
            user_data: None,
        }
    }

    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn with_activated(mut self, activated: bool) -> Self {
        self.activated = activated;
        self
    }

    pub fn with_disable_launcher(mut self, disable_launcher: bool) -> Self {
        self.disable_launcher = disable_launcher;
        self
    }

    pub fn with_button_color(mut self, button_color: impl Into<String>) -> Self {
        self.button_color = Some(button_color.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_jwt_token(mut self, jwt_token: impl Into<String>) -> Self {
        self.jwt_token = Some(jwt_token.into());
        self
    }

    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = Some(user_data);
        self
    }

    /// Build the widget document URL for this configuration.
    ///
    /// Appends `company_id`, `profile_id` (when present) and `debug=true`
    /// (when enabled) to the trusted base path.
    pub fn document_url(&self) -> Result<Url> {
        if self.company_id.is_empty() {
            return Err(ChatError::InvalidConfiguration(
                "company_id must not be empty".to_string(),
            ));
        }

        let base = format!("{}{}", TRUSTED_ORIGIN, DOCUMENT_PATH);
        let mut url = Url::parse(&base)
            .map_err(|e| ChatError::InvalidConfiguration(format!("invalid base URL: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("company_id", &self.company_id);
            if let Some(profile_id) = &self.profile_id {
                query.append_pair("profile_id", profile_id);
            }
            if self.debug {
                query.append_pair("debug", "true");
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url_minimal() {
        let config = ChatConfiguration::new("acme");
        let url = config.document_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://chat.assembled.com/public_chat.html?company_id=acme"
        );
    }

    #[test]
    fn test_document_url_full() {
        let config = ChatConfiguration::new("acme")
            .with_profile_id("support")
            .with_debug(true);
        let url = config.document_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://chat.assembled.com/public_chat.html?company_id=acme&profile_id=support&debug=true"
        );
    }

    #[test]
    fn test_document_url_escapes_query_values() {
        let config = ChatConfiguration::new("a&b c");
        let url = config.document_url().unwrap();
        assert!(url.as_str().contains("company_id=a%26b+c"));
    }

    #[test]
    fn test_empty_company_id_is_rejected() {
        let config = ChatConfiguration::new("");
        assert!(matches!(
            config.document_url(),
            Err(ChatError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = ChatConfiguration::new("acme");
        assert!(config.activated);
        assert!(!config.disable_launcher);
        assert!(!config.debug);
        assert!(config.jwt_token.is_none());
    }
}
