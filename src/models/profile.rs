//! Profile and access token records for storage.

use serde::{Deserialize, Serialize};

/// Local identity that owns a connected Instagram account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Opaque profile ID (also used as document ID)
    pub id: String,
    /// Unique profile name chosen by the operator
    pub username: String,
    /// One-time token correlating the OAuth redirect to this profile
    #[serde(default)]
    pub identity_token: Option<String>,
    /// When the profile was created (ISO 8601)
    pub created_at: String,
}

/// Long-lived Instagram credential for a profile.
///
/// At most one exists per profile; issuing a new one replaces it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Owning profile ID (also used as document ID)
    pub profile_id: String,
    /// Long-lived access token (secret)
    pub access_code: String,
    /// Instagram user ID
    pub user_id: String,
    /// Instagram username
    pub username: String,
    /// Display name, when Instagram shares it
    #[serde(default)]
    pub user_fullname: Option<String>,
    /// Avatar URL, when Instagram shares it
    #[serde(default)]
    pub user_profile_picture: Option<String>,
    /// When the token was first issued (ISO 8601)
    pub created_at: String,
    /// When the access code was last refreshed (ISO 8601)
    pub updated_at: String,
}

// Hand-written so the access code never ends up in logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("profile_id", &self.profile_id)
            .field("access_code", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
