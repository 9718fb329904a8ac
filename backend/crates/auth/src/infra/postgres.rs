//! PostgreSQL Repository Implementations
//!
//! Uniqueness is enforced by the schema (see `database/migrations`); unique
//! violations are told apart by constraint name and surfaced as domain
//! errors.

use chrono::{DateTime, Utc};
use kernel::error::conversions::unique_violation;
use kernel::id::{GroupId, InviteId, UserId};
use sqlx::PgPool;

use crate::domain::entity::{
    group::{Group, GroupMembership},
    invite::{Invite, NewInvite},
    user::{NewUser, User},
};
use crate::domain::repository::{
    GroupRepository, InviteRepository, MembershipRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email, invite_status::InviteStatus, invite_token::InviteToken,
    member_role::MemberRole, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

const USERS_EMAIL_KEY: &str = "users_email_key";
const USERS_PROVIDER_UID_KEY: &str = "users_provider_uid_key";
const GROUP_MEMBERS_PKEY: &str = "group_members_pkey";

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

const USER_COLUMNS: &str =
    "id, provider_uid, email, display_name, role, last_access_at, created_at, updated_at";

impl UserRepository for PgAuthRepository {
    async fn find_by_provider_uid(&self, provider_uid: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE provider_uid = $1"
        ))
        .bind(provider_uid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn create(&self, user: &NewUser) -> AuthResult<User> {
        let result = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (provider_uid, email, display_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.provider_uid)
        .bind(user.email.as_str())
        .bind(&user.display_name)
        .bind(user.role.code())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.into_user(),
            Err(e) => Err(match unique_violation(&e) {
                Some(USERS_EMAIL_KEY) => AuthError::EmailExists,
                Some(USERS_PROVIDER_UID_KEY) => AuthError::IdentityConflict,
                _ => AuthError::Database(e),
            }),
        }
    }

    async fn touch_last_access(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_access_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Group / Membership Repository Implementation
// ============================================================================

impl GroupRepository for PgAuthRepository {
    async fn find_group(&self, id: GroupId) -> AuthResult<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT id, name FROM groups WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Group {
            id: GroupId::from_raw(r.id),
            name: r.name,
        }))
    }
}

impl MembershipRepository for PgAuthRepository {
    async fn find_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> AuthResult<Option<GroupMembership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT group_id, user_id, role, joined_at
            FROM group_members
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id.as_i64())
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MembershipRow::into_membership).transpose()
    }
}

// ============================================================================
// Invite Repository Implementation
// ============================================================================

const INVITE_COLUMNS: &str =
    "id, group_id, email, token, status, role, expires_at, invited_by, created_at";

impl InviteRepository for PgAuthRepository {
    async fn create_invite(&self, invite: &NewInvite) -> AuthResult<Invite> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            r#"
            INSERT INTO invites (group_id, email, token, status, role, expires_at, invited_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(invite.group_id.as_i64())
        .bind(invite.email.as_str())
        .bind(invite.token.as_str())
        .bind(InviteStatus::Pending.code())
        .bind(invite.role.code())
        .bind(invite.expires_at)
        .bind(invite.invited_by.as_i64())
        .fetch_one(&self.pool)
        .await?;

        row.into_invite()
    }

    async fn find_by_token(&self, token: &InviteToken) -> AuthResult<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE token = $1"
        ))
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(InviteRow::into_invite).transpose()
    }

    async fn list_by_group(&self, group_id: GroupId) -> AuthResult<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE group_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(group_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InviteRow::into_invite).collect()
    }

    async fn delete_invite(&self, id: InviteId) -> AuthResult<()> {
        sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_in_group(&self, id: InviteId, group_id: GroupId) -> AuthResult<bool> {
        let deleted = sqlx::query("DELETE FROM invites WHERE id = $1 AND group_id = $2")
            .bind(id.as_i64())
            .bind(group_id.as_i64())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn transition_from_pending(&self, id: InviteId, to: InviteStatus) -> AuthResult<bool> {
        let updated = sqlx::query("UPDATE invites SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id.as_i64())
            .bind(to.code())
            .bind(InviteStatus::Pending.code())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated == 1)
    }

    async fn accept_invite(
        &self,
        invite: &Invite,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> AuthResult<GroupMembership> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE invites SET status = $2 WHERE id = $1 AND status = $3")
            .bind(invite.id.as_i64())
            .bind(InviteStatus::Accepted.code())
            .bind(InviteStatus::Pending.code())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated != 1 {
            // Dropping the transaction rolls it back
            return Err(AuthError::AlreadyUsed);
        }

        let inserted = sqlx::query_as::<_, MembershipRow>(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            RETURNING group_id, user_id, role, joined_at
            "#,
        )
        .bind(invite.group_id.as_i64())
        .bind(user_id.as_i64())
        .bind(invite.role.code())
        .bind(joined_at)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                return Err(match unique_violation(&e) {
                    Some(GROUP_MEMBERS_PKEY) => AuthError::AlreadyMember,
                    _ => AuthError::Database(e),
                });
            }
        };

        tx.commit().await?;

        row.into_membership()
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    provider_uid: String,
    email: String,
    display_name: String,
    role: String,
    last_access_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let role = UserRole::from_code(&self.role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid user role: {}", self.role)))?;

        Ok(User {
            id: UserId::from_raw(self.id),
            provider_uid: self.provider_uid,
            email: Email::from_db(self.email),
            display_name: self.display_name,
            role,
            last_access_at: self.last_access_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    group_id: i64,
    user_id: i64,
    role: String,
    joined_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_membership(self) -> AuthResult<GroupMembership> {
        let role = MemberRole::from_code(&self.role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid member role: {}", self.role)))?;

        Ok(GroupMembership {
            group_id: GroupId::from_raw(self.group_id),
            user_id: UserId::from_raw(self.user_id),
            role,
            joined_at: self.joined_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InviteRow {
    id: i64,
    group_id: i64,
    email: String,
    token: String,
    status: String,
    role: String,
    expires_at: DateTime<Utc>,
    invited_by: i64,
    created_at: DateTime<Utc>,
}

impl InviteRow {
    fn into_invite(self) -> AuthResult<Invite> {
        let status = InviteStatus::from_code(&self.status)
            .ok_or_else(|| AuthError::Internal(format!("Invalid invite status: {}", self.status)))?;
        let role = MemberRole::from_code(&self.role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid member role: {}", self.role)))?;

        Ok(Invite {
            id: InviteId::from_raw(self.id),
            group_id: GroupId::from_raw(self.group_id),
            email: Email::from_db(self.email),
            token: InviteToken::from_db(self.token),
            status,
            role,
            expires_at: self.expires_at,
            invited_by: UserId::from_raw(self.invited_by),
            created_at: self.created_at,
        })
    }
}
