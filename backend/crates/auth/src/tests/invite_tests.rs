use std::sync::atomic::Ordering;

use chrono::{TimeDelta, Utc};
use kernel::error::kind::ErrorKind;
use kernel::id::{GroupId, InviteId};

use crate::application::{
    CreateInviteInput, CreateInviteUseCase, ManageInvitesUseCase, RespondInviteUseCase,
    VerifyInviteUseCase,
};
use crate::domain::entity::{group::GroupMembership, user::User};
use crate::domain::repository::InviteRepository;
use crate::domain::value_object::{
    invite_status::InviteStatus, member_role::MemberRole, user_role::UserRole,
};
use crate::error::AuthError;
use crate::tests::support::{FakeProvider, Harness, MemoryStore, RecordingMailer};

struct Fixture {
    h: Harness,
    manager: User,
    manager_membership: GroupMembership,
    group: GroupId,
}

fn fixture() -> Fixture {
    let h = Harness::new(FakeProvider::default());
    let manager = h.store.seed_user("uid-owner", "owner@example.com", UserRole::Member);
    let group = h.store.seed_group(7, "Family Album").id;
    let manager_membership = h.store.seed_member(group, manager.id, MemberRole::Manager);
    Fixture {
        h,
        manager,
        manager_membership,
        group,
    }
}

fn create(h: &Harness) -> CreateInviteUseCase<MemoryStore, RecordingMailer> {
    CreateInviteUseCase::new(h.store.clone(), h.mailer.clone(), h.config.clone())
}

fn respond(h: &Harness) -> RespondInviteUseCase<MemoryStore> {
    RespondInviteUseCase::new(h.store.clone())
}

fn verify(h: &Harness) -> VerifyInviteUseCase<MemoryStore> {
    VerifyInviteUseCase::new(h.store.clone())
}

fn invite_input(f: &Fixture, email: &str, role: &str) -> CreateInviteInput {
    CreateInviteInput {
        email: email.to_string(),
        role: role.to_string(),
        invited_by: f.manager.id,
        group_id: f.group,
    }
}

#[tokio::test]
async fn test_invite_round_trip_for_new_member() {
    let f = fixture();

    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", ""))
        .await
        .unwrap();

    assert_eq!(invite.status, InviteStatus::Pending);
    assert_eq!(invite.role, MemberRole::Member);
    assert_eq!(invite.token.as_str().len(), 64);
    let ttl = invite.expires_at - Utc::now();
    assert!(ttl > TimeDelta::days(7) - TimeDelta::minutes(1) && ttl <= TimeDelta::days(7));

    let sent = f.h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, invite.token);
    assert_eq!(sent[0].group_name, "Family Album");
    assert!(!sent[0].is_existing_user);

    let view = verify(&f.h).view(invite.token.as_str()).await.unwrap();
    assert_eq!(view.group_name, "Family Album");
    assert!(!view.user_exists);

    // Alice signs up later and accepts
    let alice = f
        .h
        .store
        .seed_user("uid-alice", "alice@example.com", UserRole::Member);
    let membership = respond(&f.h)
        .accept(invite.token.as_str(), &alice)
        .await
        .unwrap();

    assert_eq!(membership.group_id, f.group);
    assert_eq!(membership.user_id, alice.id);
    assert_eq!(membership.role, MemberRole::Member);
    assert_eq!(f.h.store.invite(invite.id).unwrap().status, InviteStatus::Accepted);

    let err = verify(&f.h).execute(invite.token.as_str()).await.unwrap_err();
    assert!(matches!(err, AuthError::AlreadyUsed));
}

#[tokio::test]
async fn test_invite_to_existing_account_is_flagged() {
    let f = fixture();
    f.h.store
        .seed_user("uid-bob", "bob@example.com", UserRole::Member);

    let invite = create(&f.h)
        .execute(invite_input(&f, "bob@example.com", "manager"))
        .await
        .unwrap();

    assert_eq!(invite.role, MemberRole::Manager);
    assert!(f.h.mailer.sent()[0].is_existing_user);
    assert!(verify(&f.h).view(invite.token.as_str()).await.unwrap().user_exists);
}

#[tokio::test]
async fn test_verify_is_read_only() {
    let f = fixture();
    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap();

    let first = verify(&f.h).execute(invite.token.as_str()).await.unwrap();
    let second = verify(&f.h).execute(invite.token.as_str()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, InviteStatus::Pending);
    assert_eq!(f.h.store.invite(invite.id).unwrap().status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_malformed_and_unknown_tokens() {
    let f = fixture();
    let unknown = "f".repeat(64);

    for token in ["", "abc", "../../etc/passwd", unknown.as_str()] {
        let err = verify(&f.h).execute(token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken), "token {token:?}");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_expired_invite_is_persisted_as_expired() {
    let f = fixture();
    let invite = f.h.store.seed_invite(
        f.group,
        "alice@example.com",
        MemberRole::Member,
        Utc::now() - TimeDelta::milliseconds(1),
        f.manager.id,
    );

    let err = verify(&f.h).execute(invite.token.as_str()).await.unwrap_err();
    assert!(matches!(err, AuthError::Expired));
    assert_eq!(err.kind(), ErrorKind::Gone);
    assert_eq!(f.h.store.invite(invite.id).unwrap().status, InviteStatus::Expired);

    // Once stored as expired it reads as used
    let err = verify(&f.h).execute(invite.token.as_str()).await.unwrap_err();
    assert!(matches!(err, AuthError::AlreadyUsed));
}

#[tokio::test]
async fn test_expired_invite_cannot_be_accepted() {
    let f = fixture();
    let alice = f
        .h
        .store
        .seed_user("uid-alice", "alice@example.com", UserRole::Member);
    let invite = f.h.store.seed_invite(
        f.group,
        "alice@example.com",
        MemberRole::Member,
        Utc::now() - TimeDelta::seconds(1),
        f.manager.id,
    );

    let err = respond(&f.h)
        .accept(invite.token.as_str(), &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Expired));
    assert_eq!(f.h.store.memberships_of(f.group, alice.id), 0);
}

#[tokio::test]
async fn test_second_accept_is_already_member() {
    let f = fixture();
    let alice = f
        .h
        .store
        .seed_user("uid-alice", "alice@example.com", UserRole::Member);
    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap();

    respond(&f.h)
        .accept(invite.token.as_str(), &alice)
        .await
        .unwrap();
    let err = respond(&f.h)
        .accept(invite.token.as_str(), &alice)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AlreadyMember));
    assert_eq!(err.code(), "ALREADY_MEMBER");
    assert_eq!(f.h.store.memberships_of(f.group, alice.id), 1);
}

#[tokio::test]
async fn test_wrong_account_cannot_consume_invite() {
    let f = fixture();
    let mallory = f
        .h
        .store
        .seed_user("uid-mallory", "mallory@example.com", UserRole::Member);
    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap();

    let err = respond(&f.h)
        .accept(invite.token.as_str(), &mallory)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailMismatch));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = respond(&f.h)
        .decline(invite.token.as_str(), &mallory)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailMismatch));
    assert_eq!(f.h.store.invite(invite.id).unwrap().status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_email_match_is_case_sensitive() {
    let f = fixture();
    let alice = f
        .h
        .store
        .seed_user("uid-alice", "Alice@example.com", UserRole::Member);
    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap();

    let err = respond(&f.h)
        .accept(invite.token.as_str(), &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailMismatch));
}

#[tokio::test]
async fn test_mismatch_reported_before_expiry() {
    let f = fixture();
    let mallory = f
        .h
        .store
        .seed_user("uid-mallory", "mallory@example.com", UserRole::Member);
    let invite = f.h.store.seed_invite(
        f.group,
        "alice@example.com",
        MemberRole::Member,
        Utc::now() - TimeDelta::days(1),
        f.manager.id,
    );

    let err = respond(&f.h)
        .accept(invite.token.as_str(), &mallory)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailMismatch));
    // Nothing about somebody else's invite changes
    assert_eq!(f.h.store.invite(invite.id).unwrap().status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_decline_then_accept() {
    let f = fixture();
    let alice = f
        .h
        .store
        .seed_user("uid-alice", "alice@example.com", UserRole::Member);
    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap();

    respond(&f.h)
        .decline(invite.token.as_str(), &alice)
        .await
        .unwrap();
    assert_eq!(f.h.store.invite(invite.id).unwrap().status, InviteStatus::Declined);

    let err = respond(&f.h)
        .accept(invite.token.as_str(), &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyUsed));
    assert_eq!(f.h.store.memberships_of(f.group, alice.id), 0);
}

#[tokio::test]
async fn test_concurrent_accept_loses_on_conditional_update() {
    let f = fixture();
    let alice = f
        .h
        .store
        .seed_user("uid-alice", "alice@example.com", UserRole::Member);
    let invite = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap();

    // Both requests passed their reads with the same snapshot
    let now = Utc::now();
    f.h.store.accept_invite(&invite, alice.id, now).await.unwrap();
    let err = f
        .h
        .store
        .accept_invite(&invite, alice.id, now)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AlreadyUsed));
    assert_eq!(f.h.store.memberships_of(f.group, alice.id), 1);
}

#[tokio::test]
async fn test_only_managers_invite() {
    let f = fixture();
    let member = f
        .h
        .store
        .seed_user("uid-m", "member@example.com", UserRole::Member);
    f.h.store.seed_member(f.group, member.id, MemberRole::Member);
    let outsider = f
        .h
        .store
        .seed_user("uid-o", "outsider@example.com", UserRole::Admin);

    for inviter in [member.id, outsider.id] {
        let err = create(&f.h)
            .execute(CreateInviteInput {
                invited_by: inviter,
                ..invite_input(&f, "alice@example.com", "member")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));
    }
    assert_eq!(f.h.store.invite_count(), 0);
    assert!(f.h.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_invite_input() {
    let f = fixture();

    let err = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "owner"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRole(_)));

    let err = create(&f.h)
        .execute(invite_input(&f, "not-an-email", "member"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    assert_eq!(f.h.store.invite_count(), 0);
}

#[tokio::test]
async fn test_undeliverable_invite_is_rolled_back() {
    let f = fixture();
    f.h.mailer.fail.store(true, Ordering::SeqCst);

    let err = create(&f.h)
        .execute(invite_input(&f, "alice@example.com", "member"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::NotificationFailed(_)));
    assert_eq!(err.kind(), ErrorKind::BadGateway);
    assert_eq!(f.h.store.invite_count(), 0);
}

#[tokio::test]
async fn test_manage_invites_requires_manager() {
    let f = fixture();
    let first = create(&f.h)
        .execute(invite_input(&f, "a@example.com", "member"))
        .await
        .unwrap();
    let second = create(&f.h)
        .execute(invite_input(&f, "b@example.com", "member"))
        .await
        .unwrap();

    let manage = ManageInvitesUseCase::new(f.h.store.clone());
    let listed = manage.list(&f.manager_membership).await.unwrap();
    let ids: Vec<InviteId> = listed.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let plain = GroupMembership {
        role: MemberRole::Member,
        ..f.manager_membership.clone()
    };
    assert!(matches!(manage.list(&plain).await, Err(AuthError::Forbidden)));
    assert!(matches!(
        manage.delete(&plain, first.id).await,
        Err(AuthError::Forbidden)
    ));

    manage.delete(&f.manager_membership, first.id).await.unwrap();
    assert!(f.h.store.invite(first.id).is_none());
    assert!(matches!(
        manage.delete(&f.manager_membership, first.id).await,
        Err(AuthError::NotFound("Invite"))
    ));
}

#[tokio::test]
async fn test_manager_cannot_delete_other_groups_invite() {
    let f = fixture();
    let other_group = f.h.store.seed_group(8, "Other").id;
    let foreign = f.h.store.seed_invite(
        other_group,
        "x@example.com",
        MemberRole::Member,
        Utc::now() + TimeDelta::days(1),
        f.manager.id,
    );

    let err = ManageInvitesUseCase::new(f.h.store.clone())
        .delete(&f.manager_membership, foreign.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)));
    assert!(f.h.store.invite(foreign.id).is_some());
}
