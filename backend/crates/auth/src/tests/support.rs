//! In-memory fakes shared by the flow tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use kernel::id::{GroupId, InviteId, UserId};

use crate::application::config::AuthConfig;
use crate::domain::entity::{
    group::{Group, GroupMembership},
    invite::{Invite, NewInvite},
    user::{NewUser, User},
};
use crate::domain::identity::{
    IdentityProvider, PasswordSignIn, PasswordSignUp, ProviderError, RefreshedTokens,
    SessionArtifact, VerifiedAssertion,
};
use crate::domain::mailer::{InviteMailer, InviteNotification, MailerError};
use crate::domain::repository::{
    GroupRepository, InviteRepository, MembershipRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email, invite_status::InviteStatus, invite_token::InviteToken,
    member_role::MemberRole, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

pub const FRONTEND: &str = "https://app.example.com";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        frontend_base_url: FRONTEND.to_string(),
        ..AuthConfig::development()
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
struct StoreState {
    users: Vec<User>,
    groups: Vec<Group>,
    members: Vec<GroupMembership>,
    invites: Vec<Invite>,
    next_id: i64,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Enforces the same uniqueness rules as the database schema
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    pub fail_touch: AtomicBool,
}

impl MemoryStore {
    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    pub fn seed_user(&self, uid: &str, email: &str, role: UserRole) -> User {
        let mut state = self.state();
        let now = Utc::now();
        let user = User {
            id: UserId::from_raw(state.next_id()),
            provider_uid: uid.to_string(),
            email: Email::from_db(email),
            display_name: email.to_string(),
            role,
            last_access_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        user
    }

    pub fn seed_group(&self, id: i64, name: &str) -> Group {
        let group = Group {
            id: GroupId::from_raw(id),
            name: name.to_string(),
        };
        self.state().groups.push(group.clone());
        group
    }

    pub fn seed_member(&self, group_id: GroupId, user_id: UserId, role: MemberRole) -> GroupMembership {
        let membership = GroupMembership {
            group_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        self.state().members.push(membership.clone());
        membership
    }

    pub fn seed_invite(
        &self,
        group_id: GroupId,
        email: &str,
        role: MemberRole,
        expires_at: DateTime<Utc>,
        invited_by: UserId,
    ) -> Invite {
        let mut state = self.state();
        let invite = Invite {
            id: InviteId::from_raw(state.next_id()),
            group_id,
            email: Email::from_db(email),
            token: InviteToken::generate(),
            status: InviteStatus::Pending,
            role,
            expires_at,
            invited_by,
            created_at: Utc::now(),
        };
        state.invites.push(invite.clone());
        invite
    }

    pub fn set_last_access(&self, id: UserId, at: Option<DateTime<Utc>>) {
        if let Some(user) = self.state().users.iter_mut().find(|u| u.id == id) {
            user.last_access_at = at;
        }
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.state().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    pub fn invite(&self, id: InviteId) -> Option<Invite> {
        self.state().invites.iter().find(|i| i.id == id).cloned()
    }

    pub fn invite_count(&self) -> usize {
        self.state().invites.len()
    }

    pub fn memberships_of(&self, group_id: GroupId, user_id: UserId) -> usize {
        self.state()
            .members
            .iter()
            .filter(|m| m.group_id == group_id && m.user_id == user_id)
            .count()
    }
}

impl UserRepository for MemoryStore {
    async fn find_by_provider_uid(&self, provider_uid: &str) -> AuthResult<Option<User>> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.provider_uid == provider_uid)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.email.as_str() == email)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> AuthResult<User> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.provider_uid == user.provider_uid) {
            return Err(AuthError::IdentityConflict);
        }
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailExists);
        }

        let now = Utc::now();
        let created = User {
            id: UserId::from_raw(state.next_id()),
            provider_uid: user.provider_uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            last_access_at: None,
            created_at: now,
            updated_at: now,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn touch_last_access(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(AuthError::Internal("store offline".into()));
        }
        self.set_last_access(id, Some(at));
        Ok(())
    }
}

impl GroupRepository for MemoryStore {
    async fn find_group(&self, id: GroupId) -> AuthResult<Option<Group>> {
        Ok(self.state().groups.iter().find(|g| g.id == id).cloned())
    }
}

impl MembershipRepository for MemoryStore {
    async fn find_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> AuthResult<Option<GroupMembership>> {
        Ok(self
            .state()
            .members
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .cloned())
    }
}

impl InviteRepository for MemoryStore {
    async fn create_invite(&self, invite: &NewInvite) -> AuthResult<Invite> {
        let mut state = self.state();
        let created = Invite {
            id: InviteId::from_raw(state.next_id()),
            group_id: invite.group_id,
            email: invite.email.clone(),
            token: invite.token.clone(),
            status: InviteStatus::Pending,
            role: invite.role,
            expires_at: invite.expires_at,
            invited_by: invite.invited_by,
            created_at: Utc::now(),
        };
        state.invites.push(created.clone());
        Ok(created)
    }

    async fn find_by_token(&self, token: &InviteToken) -> AuthResult<Option<Invite>> {
        Ok(self
            .state()
            .invites
            .iter()
            .find(|i| &i.token == token)
            .cloned())
    }

    async fn list_by_group(&self, group_id: GroupId) -> AuthResult<Vec<Invite>> {
        let mut invites: Vec<Invite> = self
            .state()
            .invites
            .iter()
            .filter(|i| i.group_id == group_id)
            .cloned()
            .collect();
        invites.reverse();
        Ok(invites)
    }

    async fn delete_invite(&self, id: InviteId) -> AuthResult<()> {
        self.state().invites.retain(|i| i.id != id);
        Ok(())
    }

    async fn delete_in_group(&self, id: InviteId, group_id: GroupId) -> AuthResult<bool> {
        let mut state = self.state();
        let before = state.invites.len();
        state
            .invites
            .retain(|i| !(i.id == id && i.group_id == group_id));
        Ok(state.invites.len() != before)
    }

    async fn transition_from_pending(&self, id: InviteId, to: InviteStatus) -> AuthResult<bool> {
        let mut state = self.state();
        match state
            .invites
            .iter_mut()
            .find(|i| i.id == id && i.status == InviteStatus::Pending)
        {
            Some(invite) => {
                invite.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn accept_invite(
        &self,
        invite: &Invite,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> AuthResult<GroupMembership> {
        let mut state = self.state();

        let pending = state
            .invites
            .iter()
            .any(|i| i.id == invite.id && i.status == InviteStatus::Pending);
        if !pending {
            return Err(AuthError::AlreadyUsed);
        }
        if state
            .members
            .iter()
            .any(|m| m.group_id == invite.group_id && m.user_id == user_id)
        {
            return Err(AuthError::AlreadyMember);
        }

        if let Some(stored) = state.invites.iter_mut().find(|i| i.id == invite.id) {
            stored.status = InviteStatus::Accepted;
        }
        let membership = GroupMembership {
            group_id: invite.group_id,
            user_id,
            role: invite.role,
            joined_at,
        };
        state.members.push(membership.clone());
        Ok(membership)
    }
}

// ============================================================================
// Identity provider
// ============================================================================

struct Account {
    uid: String,
    email: String,
    password: String,
    verified: bool,
}

/// Scripted identity provider
///
/// Tokens are readable strings: `id:<uid>`, `session:<uid>` and
/// `refresh:<uid>:<n>`.
#[derive(Default)]
pub struct FakeProvider {
    accounts: Mutex<Vec<Account>>,
    refresh_tokens: Mutex<HashMap<String, String>>,
    pub verification_mails: Mutex<Vec<String>>,
    pub minted: AtomicUsize,
    pub fail_verification_mail: AtomicBool,
    pub down: AtomicBool,
    next_uid: AtomicUsize,
    next_refresh: AtomicUsize,
}

impl FakeProvider {
    pub fn with_account(self, uid: &str, email: &str, password: &str, verified: bool) -> Self {
        self.add_account(uid, email, password, verified);
        self
    }

    pub fn add_account(&self, uid: &str, email: &str, password: &str, verified: bool) {
        self.accounts.lock().unwrap().push(Account {
            uid: uid.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            verified,
        });
    }

    pub fn verify_email(&self, email: &str) {
        if let Some(account) = self
            .accounts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|a| a.email == email)
        {
            account.verified = true;
        }
    }

    pub fn verification_count(&self) -> usize {
        self.verification_mails.lock().unwrap().len()
    }

    pub fn minted_count(&self) -> usize {
        self.minted.load(Ordering::SeqCst)
    }

    fn check_up(&self) -> Result<(), ProviderError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    fn issue_refresh(&self, uid: &str) -> String {
        let n = self.next_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("refresh:{uid}:{n}");
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(token.clone(), uid.to_string());
        token
    }

    fn uid_of(&self, id_token: &str) -> Result<String, ProviderError> {
        id_token
            .strip_prefix("id:")
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Rejected("INVALID_ID_TOKEN".into()))
    }

    fn account_email(&self, uid: &str) -> Option<(String, bool)> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.uid == uid)
            .map(|a| (a.email.clone(), a.verified))
    }
}

impl IdentityProvider for FakeProvider {
    async fn verify_assertion(&self, token: &str) -> Result<VerifiedAssertion, ProviderError> {
        self.check_up()?;
        let uid = token
            .strip_prefix("session:")
            .or_else(|| token.strip_prefix("id:"))
            .ok_or_else(|| ProviderError::InvalidAssertion("malformed".into()))?;
        let (email, verified) = self
            .account_email(uid)
            .ok_or_else(|| ProviderError::InvalidAssertion("unknown subject".into()))?;

        Ok(VerifiedAssertion {
            uid: uid.to_string(),
            email: Some(email),
            email_verified: verified,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignIn, ProviderError> {
        self.check_up()?;
        let uid = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| a.uid.clone())
            .ok_or_else(|| ProviderError::Rejected("INVALID_LOGIN_CREDENTIALS".into()))?;

        Ok(PasswordSignIn {
            email: email.to_string(),
            id_token: format!("id:{uid}"),
            refresh_token: self.issue_refresh(&uid),
            uid,
        })
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignUp, ProviderError> {
        self.check_up()?;
        if password.len() < 6 {
            return Err(ProviderError::Rejected(
                "WEAK_PASSWORD : Password should be at least 6 characters".into(),
            ));
        }
        if self.accounts.lock().unwrap().iter().any(|a| a.email == email) {
            return Err(ProviderError::Rejected("EMAIL_EXISTS".into()));
        }

        let uid = format!("new-uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        self.add_account(&uid, email, password, false);

        Ok(PasswordSignUp {
            email: email.to_string(),
            id_token: format!("id:{uid}"),
            uid,
        })
    }

    async fn lookup_email_verified(&self, id_token: &str) -> Result<bool, ProviderError> {
        self.check_up()?;
        let uid = self.uid_of(id_token)?;
        self.account_email(&uid)
            .map(|(_, verified)| verified)
            .ok_or(ProviderError::UserNotFound)
    }

    async fn send_verification_email(
        &self,
        id_token: &str,
        continue_url: &str,
    ) -> Result<(), ProviderError> {
        self.check_up()?;
        self.uid_of(id_token)?;
        if self.fail_verification_mail.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected("TOO_MANY_ATTEMPTS_TRY_LATER".into()));
        }
        self.verification_mails
            .lock()
            .unwrap()
            .push(continue_url.to_string());
        Ok(())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError> {
        self.check_up()?;
        let uid = self
            .refresh_tokens
            .lock()
            .unwrap()
            .remove(refresh_token)
            .ok_or_else(|| ProviderError::InvalidRefreshToken("INVALID_REFRESH_TOKEN".into()))?;

        Ok(RefreshedTokens {
            id_token: format!("id:{uid}"),
            refresh_token: self.issue_refresh(&uid),
            uid,
        })
    }

    async fn mint_session_artifact(
        &self,
        id_token: &str,
        _ttl: Duration,
    ) -> Result<SessionArtifact, ProviderError> {
        self.check_up()?;
        let uid = self.uid_of(id_token)?;
        self.minted.fetch_add(1, Ordering::SeqCst);
        Ok(SessionArtifact::new(format!("session:{uid}")))
    }

    async fn service_access_token(&self) -> Result<String, ProviderError> {
        Ok("service-token".to_string())
    }
}

// ============================================================================
// Mailer
// ============================================================================

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<InviteNotification>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<InviteNotification> {
        self.sent.lock().unwrap().clone()
    }
}

impl InviteMailer for RecordingMailer {
    async fn send_invite(&self, notification: &InviteNotification) -> Result<(), MailerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailerError::Delivery("mailbox unavailable".into()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub mailer: Arc<RecordingMailer>,
    pub config: Arc<AuthConfig>,
}

impl Harness {
    pub fn new(provider: FakeProvider) -> Self {
        Self::with_config(provider, test_config())
    }

    pub fn with_config(provider: FakeProvider, config: AuthConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            provider: Arc::new(provider),
            mailer: Arc::new(RecordingMailer::default()),
            config: Arc::new(config),
        }
    }
}
