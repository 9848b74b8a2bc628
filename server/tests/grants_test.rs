//! Granting, extending and revoking roles on player records.

mod helpers;

use chrono::{DateTime, Duration, Utc};
use gt_common::PlayerId;
use gt_server::error::CoreError;
use gt_server::permissions::Permissions;
use gt_server::roles::handlers::{
    grant_history, grant_role, has_ever_held, revoke_role, revoke_sku_entitlement,
};
use gt_server::roles::{GrantRoleRequest, RoleId, UpdateRoleRequest};
use gt_server::store::PlayerStore;
use helpers::TestApp;

#[tokio::test]
async fn test_grant_creates_record_with_expiry() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::CUSTOM_ICONS).await;
    let player = PlayerId::new_random();

    let mut request = GrantRoleRequest::new(vip.id);
    request.duration_ms = Some(3_600_000);
    let expires_at = grant_role(&app.state, &session, player, request).await.unwrap();

    assert_eq!(expires_at, Some(app.now() + Duration::hours(1)));
    let record = app.player(player).await;
    let roles = app.state.roles.snapshot();
    let active: Vec<_> = record.active_roles(&roles, app.now()).map(|(_, r)| r.id).collect();
    assert_eq!(active, vec![vip.id]);
    assert_eq!(app.event_kinds().await, vec!["role_granted"]);

    // Lapses on its own once the hour is up
    app.advance(Duration::hours(1));
    assert_eq!(record.active_roles(&roles, app.now()).count(), 0);
}

#[tokio::test]
async fn test_permanent_grant_is_not_extended() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    let player = app.player_with_roles(&[vip.id]).await;

    let mut request = GrantRoleRequest::new(vip.id);
    request.duration_ms = Some(60_000);
    let err = grant_role(&app.state, &session, player, request).await.unwrap_err();
    assert_eq!(err, CoreError::Conflict("role_already_permanent"));

    let record = app.player(player).await;
    assert_eq!(record.roles.len(), 1);
    assert_eq!(record.roles[0].expires_at, None);
}

#[tokio::test]
async fn test_active_timed_grant_extends_from_previous_expiry() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    let player = PlayerId::new_random();
    let start = app.now();

    let mut first = GrantRoleRequest::new(vip.id);
    first.duration_ms = Some(Duration::days(30).num_milliseconds());
    first.reason = "purchase".to_string();
    grant_role(&app.state, &session, player, first).await.unwrap();

    app.advance(Duration::days(10));
    let mut second = GrantRoleRequest::new(vip.id);
    second.duration_ms = Some(Duration::days(30).num_milliseconds());
    second.reason = "renewal".to_string();
    let expires_at = grant_role(&app.state, &session, player, second).await.unwrap();

    assert_eq!(expires_at, Some(start + Duration::days(60)));
    let record = app.player(player).await;
    assert_eq!(record.roles.len(), 1);
    assert_eq!(record.roles[0].reason, "purchase; renewal");
}

#[tokio::test]
async fn test_expired_grant_is_renewed_from_now() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    let player = PlayerId::new_random();

    let mut request = GrantRoleRequest::new(vip.id);
    request.duration_ms = Some(Duration::days(1).num_milliseconds());
    grant_role(&app.state, &session, player, request.clone()).await.unwrap();

    app.advance(Duration::days(5));
    let expires_at = grant_role(&app.state, &session, player, request).await.unwrap();
    assert_eq!(expires_at, Some(app.now() + Duration::days(1)));
    assert_eq!(app.player(player).await.roles.len(), 1);
}

#[tokio::test]
async fn test_grant_validates_input() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    let player = PlayerId::new_random();

    let mut request = GrantRoleRequest::new(vip.id);
    request.duration_ms = Some(0);
    let err = grant_role(&app.state, &session, player, request).await.unwrap_err();
    assert_eq!(err, CoreError::Validation("duration_out_of_range"));

    let mut request = GrantRoleRequest::new(vip.id);
    request.expires_at = Some(app.now() - Duration::minutes(1));
    let err = grant_role(&app.state, &session, player, request).await.unwrap_err();
    assert_eq!(err, CoreError::Validation("expiry_past"));

    let err = grant_role(&app.state, &session, player, GrantRoleRequest::new(RoleId::new()))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NotFound("role"));

    // Nothing was written
    assert!(app.store.find_player(&player).await.unwrap().is_none());
}

#[tokio::test]
async fn test_administrator_short_circuits_permission_checks() {
    let app = TestApp::new().await;
    let mod_role = app.create_role("mod", Permissions::CREATE_NOTES).await;
    app.state
        .roles
        .update(
            mod_role.id,
            UpdateRoleRequest {
                position: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let player = app.player_with_roles(&[mod_role.id, app.admin_role()]).await;

    let roles = app.state.roles.snapshot();
    let record = app.player(player).await;
    assert!(!mod_role.permissions.has(Permissions::MANAGE_BANS));
    assert!(record.has_permission(&roles, Permissions::MANAGE_BANS, app.now()));
}

#[tokio::test]
async fn test_revoke_keeps_history() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let session = app.session(admin).await;
    let vip = app.create_role("vip", Permissions::CUSTOM_ICONS).await;
    let player = app.player_with_roles(&[vip.id]).await;

    revoke_role(&app.state, &session, player, vip.id).await.unwrap();

    let roles = app.state.roles.snapshot();
    let record = app.player(player).await;
    assert!(!record.has_permission(&roles, Permissions::CUSTOM_ICONS, app.now()));
    assert!(has_ever_held(&app.state, &session, player, vip.id).await.unwrap());
    assert_eq!(grant_history(&app.state, &session, player).await.unwrap().len(), 1);

    let err = revoke_role(&app.state, &session, player, app.admin_role()).await.unwrap_err();
    assert_eq!(err, CoreError::NotFound("role_grant"));
}

#[tokio::test]
async fn test_history_needs_ownership_or_permission() {
    let app = TestApp::new().await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    let player = app.player_with_roles(&[vip.id]).await;
    let other = app.player_with_roles(&[]).await;

    let own = app.session_targeting(player, Some(&player)).await;
    assert_eq!(grant_history(&app.state, &own, player).await.unwrap().len(), 1);

    let stranger = app.session(other).await;
    let err = grant_history(&app.state, &stranger, player).await.unwrap_err();
    assert_eq!(err, CoreError::MissingPermission(Permissions::VIEW_HISTORY));
}

#[tokio::test]
async fn test_sku_entitlement_revokes_auto_remove_grants_only() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let supporter = app.create_role("supporter", Permissions::CUSTOM_ICONS).await;
    app.state
        .roles
        .update(
            supporter.id,
            UpdateRoleRequest {
                sku: Some("supporter-monthly".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let subscriber = PlayerId::new_random();
    let mut request = GrantRoleRequest::new(supporter.id);
    request.auto_remove = true;
    grant_role(&app.state, &session, subscriber, request).await.unwrap();

    let gifted = PlayerId::new_random();
    grant_role(&app.state, &session, gifted, GrantRoleRequest::new(supporter.id))
        .await
        .unwrap();

    let revoked = revoke_sku_entitlement(&app.state, subscriber, "supporter-monthly").await.unwrap();
    assert_eq!(revoked, vec![supporter.id]);
    assert!(revoke_sku_entitlement(&app.state, gifted, "supporter-monthly")
        .await
        .unwrap()
        .is_empty());

    let roles = app.state.roles.snapshot();
    assert!(!app.player(subscriber).await.has_permission(&roles, Permissions::CUSTOM_ICONS, app.now()));
    assert!(app.player(gifted).await.has_permission(&roles, Permissions::CUSTOM_ICONS, app.now()));
}

#[tokio::test]
async fn test_staff_cannot_grant_roles_above_or_beyond_themselves() {
    let app = TestApp::new().await;
    let manager = app.staff("role manager", Permissions::MANAGE_ROLES).await;
    let session = app.session(manager).await;
    let target = PlayerId::new_random();

    let err = grant_role(&app.state, &session, target, GrantRoleRequest::new(app.admin_role()))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NotAuthorized("role_hierarchy"));

    let bans = app.create_role("bans", Permissions::MANAGE_BANS).await;
    let err = grant_role(&app.state, &session, target, GrantRoleRequest::new(bans.id))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NotAuthorized("cannot_escalate"));
}

#[tokio::test]
async fn test_unrepresentable_expiry_is_rejected() {
    let app = TestApp::new().await;
    let session = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    let player = PlayerId::new_random();

    let mut request = GrantRoleRequest::new(vip.id);
    request.duration_ms = Some(i64::MAX / 2);
    let err = grant_role(&app.state, &session, player, request).await.unwrap_err();
    assert_eq!(err, CoreError::Validation("duration_out_of_range"));
    assert!(app.store.find_player(&player).await.unwrap().is_none());

    // An absolute expiry at the end of time cannot be extended any further
    let mut request = GrantRoleRequest::new(vip.id);
    request.expires_at = Some(DateTime::<Utc>::MAX_UTC);
    grant_role(&app.state, &session, player, request).await.unwrap();

    let mut request = GrantRoleRequest::new(vip.id);
    request.duration_ms = Some(Duration::days(1).num_milliseconds());
    let err = grant_role(&app.state, &session, player, request).await.unwrap_err();
    assert_eq!(err, CoreError::Validation("expiry_out_of_range"));

    let record = app.player(player).await;
    assert_eq!(record.roles.len(), 1);
    assert_eq!(record.roles[0].expires_at, Some(DateTime::<Utc>::MAX_UTC));
    assert_eq!(app.event_kinds().await, vec!["role_granted"]);
}
