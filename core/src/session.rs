//! Bearer credentials held by the gateway.

use serde::{Deserialize, Serialize};

/// Token and token type as issued by the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub token_type: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: token_type.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(token, "Bearer")
    }

    /// Value of the `Authorization` header: `"<tokenType> <token>"`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

/// Session state with an explicit set/get/clear lifecycle.
///
/// Written only when a challenge clears it and when a login completes;
/// read when attaching the `Authorization` header.
#[derive(Debug, Clone, Default)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    pub fn set(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn get(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn clear(&mut self) {
        self.credentials = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn authorization(&self) -> Option<String> {
        self.credentials.as_ref().map(Credentials::authorization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut session = Session::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.authorization(), None);

        session.set(Credentials::new("abc", "Bearer"));
        assert_eq!(session.authorization().as_deref(), Some("Bearer abc"));
        assert_eq!(session.get().map(|c| c.token.as_str()), Some("abc"));

        session.clear();
        assert!(session.get().is_none());
    }

    #[test]
    fn token_type_is_used_verbatim() {
        let creds = Credentials::new("t0k", "MAC");
        assert_eq!(creds.authorization(), "MAC t0k");
    }

    #[test]
    fn restored_session_is_authenticated() {
        let session = Session::with_credentials(Credentials::bearer("kept"));
        assert!(session.is_authenticated());
        assert_eq!(session.authorization().as_deref(), Some("Bearer kept"));
    }
}
