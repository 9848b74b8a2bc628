//! Gift code creation and redemption.

mod helpers;

use chrono::Duration;
use gt_common::PlayerId;
use gt_server::error::CoreError;
use gt_server::gift_codes::handlers::{
    create_gift_code, delete_gift_code, list_gift_codes, redeem_gift_code,
};
use gt_server::gift_codes::CreateGiftCodeRequest;
use gt_server::permissions::Permissions;
use gt_server::roles::RoleId;
use gt_server::store::GiftCodeStore;
use helpers::TestApp;

fn code_request(code: Option<&str>, role: RoleId, max_uses: u32) -> CreateGiftCodeRequest {
    CreateGiftCodeRequest {
        name: "Welcome".to_string(),
        code: code.map(str::to_string),
        max_uses,
        role,
        duration_ms: None,
        expires_at: None,
    }
}

#[tokio::test]
async fn test_redeem_grants_role_once_per_player() {
    let app = TestApp::new().await;
    let staff = app.session(app.admin().await).await;
    let supporter = app.create_role("supporter", Permissions::CUSTOM_ICONS).await;
    create_gift_code(&app.state, &staff, code_request(Some("WELCOME10"), supporter.id, 10))
        .await
        .unwrap();

    let player = PlayerId::new_random();
    let session = app.session(player).await;
    let redemption = redeem_gift_code(&app.state, &session, "WELCOME10").await.unwrap();
    assert_eq!(redemption.role, supporter.id);
    assert_eq!(redemption.expires_at, None);

    let err = redeem_gift_code(&app.state, &session, "WELCOME10").await.unwrap_err();
    assert_eq!(err, CoreError::Conflict("gift_code_already_redeemed"));

    let code = app.store.find_gift_code_by_code("WELCOME10").await.unwrap().unwrap();
    assert_eq!(code.uses, vec![player]);

    let record = app.player(player).await;
    assert_eq!(record.roles.len(), 1);
    assert_eq!(record.roles[0].expires_at, None);
    assert!(!record.roles[0].auto_remove);
}

#[tokio::test]
async fn test_timed_gift_code() {
    let app = TestApp::new().await;
    let staff = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;

    let mut request = code_request(Some("TRIAL-WEEK"), vip.id, 5);
    request.duration_ms = Some(Duration::days(7).num_milliseconds());
    create_gift_code(&app.state, &staff, request).await.unwrap();

    let redemption = redeem_gift_code(&app.state, &app.session(PlayerId::new_random()).await, "TRIAL-WEEK")
        .await
        .unwrap();
    assert_eq!(redemption.expires_at, Some(app.now() + Duration::days(7)));
}

#[tokio::test]
async fn test_exhausted_code_is_rejected() {
    let app = TestApp::new().await;
    let staff = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;
    create_gift_code(&app.state, &staff, code_request(Some("ONLY-ONE"), vip.id, 1))
        .await
        .unwrap();

    redeem_gift_code(&app.state, &app.session(PlayerId::new_random()).await, "ONLY-ONE")
        .await
        .unwrap();

    let late = PlayerId::new_random();
    let err = redeem_gift_code(&app.state, &app.session(late).await, "ONLY-ONE")
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Conflict("gift_code_invalid"));
    assert_eq!(app.store.find_gift_code_by_code("ONLY-ONE").await.unwrap().unwrap().uses.len(), 1);
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let app = TestApp::new().await;
    let staff = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;

    let mut request = code_request(Some("LAUNCH-DAY"), vip.id, 100);
    request.expires_at = Some(app.now() + Duration::days(1));
    create_gift_code(&app.state, &staff, request).await.unwrap();

    app.advance(Duration::days(2));
    let err = redeem_gift_code(&app.state, &app.session(PlayerId::new_random()).await, "LAUNCH-DAY")
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Conflict("gift_code_invalid"));
}

#[tokio::test]
async fn test_failed_grant_does_not_consume_a_use() {
    let app = TestApp::new().await;
    let staff = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;

    let mut request = code_request(Some("EXTEND-VIP"), vip.id, 5);
    request.duration_ms = Some(Duration::days(7).num_milliseconds());
    create_gift_code(&app.state, &staff, request).await.unwrap();

    // Already holds the role permanently
    let player = app.player_with_roles(&[vip.id]).await;
    let err = redeem_gift_code(&app.state, &app.session(player).await, "EXTEND-VIP")
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Conflict("role_already_permanent"));

    let code = app.store.find_gift_code_by_code("EXTEND-VIP").await.unwrap().unwrap();
    assert!(code.uses.is_empty());
}

#[tokio::test]
async fn test_unknown_code() {
    let app = TestApp::new().await;
    let err = redeem_gift_code(&app.state, &app.session(PlayerId::new_random()).await, "NOPE-NOPE")
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NotFound("gift_code"));
}

#[tokio::test]
async fn test_generated_codes_are_masked_in_listings() {
    let app = TestApp::new().await;
    let staff = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;

    let created = create_gift_code(&app.state, &staff, code_request(None, vip.id, 3))
        .await
        .unwrap();
    assert_eq!(created.code.len(), app.state.config.gift_code_length);

    let listed = list_gift_codes(&app.state, &staff).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(&listed[0].code[..4], &created.code[..4]);
    assert!(listed[0].code[4..].chars().all(|c| c == '*'));

    delete_gift_code(&app.state, &staff, created.id).await.unwrap();
    assert!(list_gift_codes(&app.state, &staff).await.unwrap().is_empty());
    let err = delete_gift_code(&app.state, &staff, created.id).await.unwrap_err();
    assert_eq!(err, CoreError::NotFound("gift_code"));
}

#[tokio::test]
async fn test_code_creation_rules() {
    let app = TestApp::new().await;
    let admin = app.session(app.admin().await).await;
    let vip = app.create_role("vip", Permissions::empty()).await;

    create_gift_code(&app.state, &admin, code_request(Some("TAKEN"), vip.id, 1))
        .await
        .unwrap();
    let err = create_gift_code(&app.state, &admin, code_request(Some("TAKEN"), vip.id, 1))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Conflict("gift_code_taken"));

    let err = create_gift_code(&app.state, &admin, code_request(None, vip.id, 0))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Validation("max_uses"));

    let err = create_gift_code(&app.state, &admin, code_request(Some("has space"), vip.id, 1))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Validation("gift_code_format"));

    for duration_ms in [0, i64::MAX] {
        let mut request = code_request(Some("FOREVER"), vip.id, 1);
        request.duration_ms = Some(duration_ms);
        let err = create_gift_code(&app.state, &admin, request).await.unwrap_err();
        assert_eq!(err, CoreError::Validation("duration_out_of_range"));
    }
    assert!(app.store.find_gift_code_by_code("FOREVER").await.unwrap().is_none());

    // Gift managers cannot hand out permissions they do not hold
    let manager = app.session(app.staff("gifts", Permissions::MANAGE_GIFT_CODES).await).await;
    let err = create_gift_code(&app.state, &manager, code_request(None, app.admin_role(), 1))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NotAuthorized("cannot_escalate"));

    let plain = app.session(app.player_with_roles(&[]).await).await;
    let err = create_gift_code(&app.state, &plain, code_request(None, vip.id, 1))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::MissingPermission(Permissions::MANAGE_GIFT_CODES));
}
