//! Authorization Types
//!
//! Options that shape the authorization redirect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prompt behavior for authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// Do not display any authentication or consent UI.
    None,
    /// Force re-authentication.
    Login,
    /// Force consent screen.
    Consent,
    /// Force account selection.
    SelectAccount,
}

impl Prompt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Login => "login",
            Self::Consent => "consent",
            Self::SelectAccount => "select_account",
        }
    }
}

/// Requested scope: one string, or a list of strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scope {
    One(String),
    Many(Vec<String>),
}

impl Scope {
    /// Value of the `scope` query parameter.
    ///
    /// A single string is trimmed. List entries are trimmed individually and
    /// joined with one space, keeping their order.
    pub fn to_param(&self) -> String {
        match self {
            Self::One(scope) => scope.trim().to_string(),
            Self::Many(scopes) => scopes
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_param().is_empty()
    }
}

impl From<&str> for Scope {
    fn from(scope: &str) -> Self {
        Self::One(scope.to_string())
    }
}

impl From<String> for Scope {
    fn from(scope: String) -> Self {
        Self::One(scope)
    }
}

impl From<Vec<String>> for Scope {
    fn from(scopes: Vec<String>) -> Self {
        Self::Many(scopes)
    }
}

impl From<Vec<&str>> for Scope {
    fn from(scopes: Vec<&str>) -> Self {
        Self::Many(scopes.into_iter().map(String::from).collect())
    }
}

/// Authorization URL options.
///
/// `redirect_uri` stays `None` until the request it is derived from is known.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthOptions {
    pub prompt: Option<Prompt>,
    pub redirect_uri: Option<String>,
    pub approval_prompt: Option<String>,
    pub client_id: Option<String>,
    pub access_type: Option<String>,
    pub scope: Option<Scope>,
    pub state: Option<String>,
}

impl AuthOptions {
    /// Set the redirect URI.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Query parameters of the authorization URL, ordered by name.
    pub fn query_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("response_type", "code".to_string());

        if let Some(access_type) = &self.access_type {
            params.insert("access_type", access_type.clone());
        }
        if let Some(approval_prompt) = &self.approval_prompt {
            params.insert("approval_prompt", approval_prompt.clone());
        }
        if let Some(client_id) = &self.client_id {
            params.insert("client_id", client_id.clone());
        }
        if let Some(prompt) = &self.prompt {
            params.insert("prompt", prompt.as_str().to_string());
        }
        if let Some(redirect_uri) = &self.redirect_uri {
            params.insert("redirect_uri", redirect_uri.clone());
        }
        if let Some(scope) = self.scope.as_ref().filter(|s| !s.is_empty()) {
            params.insert("scope", scope.to_param());
        }
        if let Some(state) = &self.state {
            params.insert("state", state.clone());
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_as_str() {
        assert_eq!(Prompt::None.as_str(), "none");
        assert_eq!(Prompt::Login.as_str(), "login");
        assert_eq!(Prompt::Consent.as_str(), "consent");
        assert_eq!(Prompt::SelectAccount.as_str(), "select_account");
    }

    #[test]
    fn test_scope_string_is_trimmed() {
        assert_eq!(Scope::from(" test ").to_param(), "test");
    }

    #[test]
    fn test_scope_list_is_trimmed_and_joined_in_order() {
        let scope = Scope::from(vec![" test", "trial ", "https://www.googleapis.com/auth/drive"]);
        assert_eq!(
            scope.to_param(),
            "test trial https://www.googleapis.com/auth/drive"
        );
    }

    #[test]
    fn test_scope_deserializes_string_or_list() {
        let one: Scope = serde_json::from_str(r#""email""#).unwrap();
        assert_eq!(one, Scope::One("email".to_string()));

        let many: Scope = serde_json::from_str(r#"["email", "profile"]"#).unwrap();
        assert_eq!(many.to_param(), "email profile");
    }

    #[test]
    fn test_query_params_are_ordered_by_name() {
        let options = AuthOptions {
            state: Some("xyz".to_string()),
            scope: Some(Scope::from("test")),
            client_id: Some("id".to_string()),
            approval_prompt: Some("auto".to_string()),
            access_type: Some("offline".to_string()),
            prompt: Some(Prompt::Consent),
            ..Default::default()
        }
        .redirect_uri("http://localhost/cb");

        let keys: Vec<_> = options.query_params().keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                "access_type",
                "approval_prompt",
                "client_id",
                "prompt",
                "redirect_uri",
                "response_type",
                "scope",
                "state"
            ]
        );
    }

    #[test]
    fn test_empty_scope_is_omitted() {
        let options = AuthOptions {
            scope: Some(Scope::Many(vec!["  ".to_string()])),
            ..Default::default()
        };
        assert!(!options.query_params().contains_key("scope"));
    }
}
