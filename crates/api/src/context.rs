use bizdesk_auth::Identity;
use bizdesk_core::IdentityId;
use uuid::Uuid;

/// Authenticated caller for a request, inserted by the auth middleware.
///
/// Business scope is resolved per handler; the token only proves identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Identity,
    session_id: Uuid,
    token: String,
}

impl IdentityContext {
    pub fn new(identity: Identity, session_id: Uuid, token: String) -> Self {
        Self {
            identity,
            session_id,
            token,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity.id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}
