//! Core domain types shared across the fenix crates.
//!
//! Identifiers are newtypes over their raw representation so an entity id
//! cannot be confused with a lock version or a message correlation id.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed entity identifier.
///
/// Wraps the numeric value handed out by the identity allocator. Entities
/// receive their identifier at construction time, before any persistence
/// collaborator sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Returns the raw numeric value.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Optimistic-locking version counter.
///
/// Starts at zero for a freshly constructed entity and advances by one for
/// each committed update. Persistence collaborators compare versions at
/// commit time to detect conflicting concurrent updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockVersion(pub i64);

impl LockVersion {
    /// Version carried by a freshly constructed entity.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw counter value.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl Default for LockVersion {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for LockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for LockVersion {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Correlation identifier for one notification request.
///
/// Assigned by the gateway when a request is accepted and carried through
/// logs and the delivery report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Credentials and sender identity for one SMS provider account.
///
/// Carried with each notification request so separate departments can
/// dispatch through their own accounts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsProperties {
    /// Provider account user key.
    pub user_key: String,
    /// Provider account password.
    pub password: String,
    /// Sender identifier shown to recipients.
    pub originator: String,
}

impl SmsProperties {
    /// Creates a credential set.
    pub fn new(
        user_key: impl Into<String>,
        password: impl Into<String>,
        originator: impl Into<String>,
    ) -> Self {
        Self {
            user_key: user_key.into(),
            password: password.into(),
            originator: originator.into(),
        }
    }
}

impl fmt::Debug for SmsProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsProperties")
            .field("user_key", &self.user_key)
            .field("password", &"***")
            .field("originator", &self.originator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_displays_raw_value() {
        assert_eq!(EntityId::from(42).to_string(), "42");
        assert_eq!(EntityId(-7).value(), -7);
    }

    #[test]
    fn lock_version_starts_at_zero_and_advances() {
        let version = LockVersion::initial();
        assert_eq!(version.value(), 0);
        assert_eq!(version.next().value(), 1);
        assert_eq!(version.next().next().value(), 2);
    }

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn sms_properties_debug_masks_password() {
        let properties = SmsProperties::new("user-key", "top-secret", "FENIX");
        let rendered = format!("{properties:?}");

        assert!(rendered.contains("user-key"));
        assert!(rendered.contains("FENIX"));
        assert!(!rendered.contains("top-secret"));
    }
}
