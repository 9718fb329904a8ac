//! User Entity
//!
//! Local mirror of an identity-provider account. Passwords and verification
//! state stay with the provider; this row carries the application role and
//! the activity timestamp the idle timeout is measured against.

use chrono::{DateTime, TimeDelta, Utc};
use kernel::id::UserId;

use crate::domain::value_object::{email::Email, user_role::UserRole};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Subject identifier assigned by the identity provider (unique)
    pub provider_uid: String,
    /// Unique
    pub email: Email,
    pub display_name: String,
    pub role: UserRole,
    /// Last time an authenticated request was seen (coarse, see [`Staleness`])
    pub last_access_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of the activity check done on every authenticated request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Seen recently, nothing to do
    Fresh,
    /// Still valid, but `last_access_at` should be bumped
    NeedsTouch,
    /// Idle for longer than the application allows
    Expired,
}

impl User {
    /// Classify the user's activity at `now`
    ///
    /// Thresholds are strict: exactly `idle_timeout` of inactivity is still
    /// accepted.
    pub fn staleness(
        &self,
        now: DateTime<Utc>,
        idle_timeout: TimeDelta,
        touch_interval: TimeDelta,
    ) -> Staleness {
        let Some(last) = self.last_access_at else {
            return Staleness::NeedsTouch;
        };

        let idle = now - last;
        if idle > idle_timeout {
            Staleness::Expired
        } else if idle > touch_interval {
            Staleness::NeedsTouch
        } else {
            Staleness::Fresh
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Values for inserting a user; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewUser {
    pub provider_uid: String,
    pub email: Email,
    pub display_name: String,
    pub role: UserRole,
}

impl NewUser {
    /// Plain member; a blank display name falls back to the email address
    pub fn member(provider_uid: impl Into<String>, email: Email, display_name: &str) -> Self {
        let display_name = match display_name.trim() {
            "" => email.as_str().to_string(),
            name => name.to_string(),
        };

        Self {
            provider_uid: provider_uid.into(),
            email,
            display_name,
            role: UserRole::Member,
        }
    }
}
