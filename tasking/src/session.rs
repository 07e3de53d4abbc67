//! The authenticated user for this run.

use tasking_proto::project::UserDetails;

/// Who is using the client, and how they authenticate.
///
/// Passed explicitly to the controller and the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The user's profile.
    pub user: UserDetails,
    /// API token, if logged in against a real backend.
    pub token: Option<String>,
}

impl Session {
    /// Creates a session for `user`.
    #[must_use]
    pub const fn new(user: UserDetails, token: Option<String>) -> Self {
        Self { user, token }
    }

    /// The user's username (matches `actionBy` in the activity feed).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.user.username
    }

    /// The user's numeric id (matches `lockedBy` on task features).
    #[must_use]
    pub const fn user_id(&self) -> u64 {
        self.user.id
    }
}
