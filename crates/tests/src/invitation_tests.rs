use crate::fixtures::test_app::TestApp;
use bson::{doc, oid::ObjectId};
use serde_json::Value;

async fn create_invitation(
    app: &TestApp,
    tenant_id: &str,
    inviter_token: &str,
    email: &str,
    role: &str,
) -> (u16, Value) {
    let resp = app
        .auth_post(&format!("/api/tenant/{}/invitation", tenant_id), inviter_token)
        .json(&serde_json::json!({ "email": email, "role": role }))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let json: Value = resp.json().await.unwrap();
    (status, json)
}

async fn invitation_doc(app: &TestApp, tenant_id: &str, email: &str) -> bson::Document {
    let tid = ObjectId::parse_str(tenant_id).unwrap();
    app.db
        .collection::<bson::Document>("invitations")
        .find_one(doc! { "tenant_id": tid, "email": email })
        .await
        .unwrap()
        .expect("invitation not found")
}

async fn membership_rows(app: &TestApp, tenant_id: &str, user_id: &str) -> u64 {
    let tid = ObjectId::parse_str(tenant_id).unwrap();
    let uid = ObjectId::parse_str(user_id).unwrap();
    app.db
        .collection::<bson::Document>("memberships")
        .count_documents(doc! { "tenant_id": tid, "user_id": uid })
        .await
        .unwrap()
}

#[tokio::test]
async fn preview_is_public_and_minimal() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let (status, _) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "member",
    )
    .await;
    assert_eq!(status, 201);

    let token = app.invitation_token(&acme.tenant_id, "pm@newhire.test").await;

    // No Authorization header at all
    let resp = app
        .client
        .get(app.url(&format!("/api/invitation/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    let data = &json["data"];
    assert_eq!(data["tenant_name"], "acme Construction");
    assert_eq!(data["email"], "pm@newhire.test");
    assert_eq!(data["role"], "member");
    assert_eq!(data["status"], "pending");
    assert_eq!(data["is_expired"], false);
}

#[tokio::test]
async fn preview_of_unknown_token_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/invitation/this-token-does-not-exist-at-all"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_INVALID_TOKEN");
}

#[tokio::test]
async fn accept_creates_a_default_membership_for_a_fresh_user() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let invitee = app
        .register_user("pm@newhire.test", "New PM", "Newhire123!", None, None)
        .await;

    create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &invitee.email,
        "member",
    )
    .await;
    let token = app.invitation_token(&acme.tenant_id, &invitee.email).await;

    let resp = app
        .auth_post(
            &format!("/api/invitation/{}/accept", token),
            &invitee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["invitation_status"], "accepted");
    assert_eq!(json["data"]["already_member"], false);

    // First membership anywhere, so it becomes the default
    let tid = ObjectId::parse_str(&acme.tenant_id).unwrap();
    let uid = ObjectId::parse_str(&invitee.id).unwrap();
    let membership = app
        .db
        .collection::<bson::Document>("memberships")
        .find_one(doc! { "tenant_id": tid, "user_id": uid })
        .await
        .unwrap()
        .unwrap();
    assert!(membership.get_bool("is_default").unwrap());
    assert_eq!(membership.get_str("role").unwrap(), "member");
}

#[tokio::test]
async fn accept_is_non_default_when_user_already_belongs_elsewhere() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;
    let beta = app.seed_tenant("beta").await;

    // acme.member already holds a default membership in acme
    create_invitation(
        &app,
        &beta.tenant_id,
        &beta.owner.access_token,
        &acme.member.email,
        "member",
    )
    .await;
    let token = app.invitation_token(&beta.tenant_id, &acme.member.email).await;

    let resp = app
        .auth_post(
            &format!("/api/invitation/{}/accept", token),
            &acme.member.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let tid = ObjectId::parse_str(&beta.tenant_id).unwrap();
    let uid = ObjectId::parse_str(&acme.member.id).unwrap();
    let membership = app
        .db
        .collection::<bson::Document>("memberships")
        .find_one(doc! { "tenant_id": tid, "user_id": uid })
        .await
        .unwrap()
        .unwrap();
    assert!(!membership.get_bool("is_default").unwrap());
}

#[tokio::test]
async fn accept_with_the_wrong_account_is_a_distinct_error() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let wrong_account = app
        .register_user("other@person.test", "Other Person", "Other123!", None, None)
        .await;

    create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "member",
    )
    .await;
    let token = app.invitation_token(&acme.tenant_id, "pm@newhire.test").await;

    let resp = app
        .auth_post(
            &format!("/api/invitation/{}/accept", token),
            &wrong_account.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_EMAIL_MISMATCH");

    // The invitation survives for the right account
    let invitation = invitation_doc(&app, &acme.tenant_id, "pm@newhire.test").await;
    assert_eq!(invitation.get_str("status").unwrap(), "pending");
}

#[tokio::test]
async fn second_accept_reports_already_accepted_without_duplicating_membership() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let invitee = app
        .register_user("pm@newhire.test", "New PM", "Newhire123!", None, None)
        .await;

    create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &invitee.email,
        "member",
    )
    .await;
    let token = app.invitation_token(&acme.tenant_id, &invitee.email).await;

    let first = app
        .auth_post(&format!("/api/invitation/{}/accept", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = app
        .auth_post(&format!("/api/invitation/{}/accept", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 422);
    let json: Value = second.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_ALREADY_ACCEPTED");

    assert_eq!(membership_rows(&app, &acme.tenant_id, &invitee.id).await, 1);
}

#[tokio::test]
async fn accepting_while_already_a_member_is_idempotent() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let invitee = app
        .register_user("pm@newhire.test", "New PM", "Newhire123!", None, None)
        .await;

    create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &invitee.email,
        "member",
    )
    .await;
    let token = app.invitation_token(&acme.tenant_id, &invitee.email).await;

    // The user lands in the tenant through another path while their
    // invitation is still pending.
    let tid = ObjectId::parse_str(&acme.tenant_id).unwrap();
    let uid = ObjectId::parse_str(&invitee.id).unwrap();
    let now = bson::DateTime::now();
    app.db
        .collection::<bson::Document>("memberships")
        .insert_one(doc! {
            "tenant_id": tid,
            "user_id": uid,
            "role": "member",
            "is_default": true,
            "status": "active",
            "invited_by": bson::Bson::Null,
            "created_at": now,
            "updated_at": now,
            "removed_at": bson::Bson::Null,
        })
        .await
        .unwrap();

    let resp = app
        .auth_post(&format!("/api/invitation/{}/accept", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["invitation_status"], "accepted");
    assert_eq!(json["data"]["already_member"], true);

    // No second membership row appeared
    assert_eq!(membership_rows(&app, &acme.tenant_id, &invitee.id).await, 1);
}

#[tokio::test]
async fn decline_is_terminal() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let invitee = app
        .register_user("pm@newhire.test", "New PM", "Newhire123!", None, None)
        .await;

    create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &invitee.email,
        "member",
    )
    .await;
    let token = app.invitation_token(&acme.tenant_id, &invitee.email).await;

    let resp = app
        .auth_post(&format!("/api/invitation/{}/decline", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["invitation_status"], "declined");

    // No way back
    let resp = app
        .auth_post(&format!("/api/invitation/{}/accept", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_ALREADY_DECLINED");
}

#[tokio::test]
async fn lapsed_invitations_expire_on_read() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let invitee = app
        .register_user("pm@newhire.test", "New PM", "Newhire123!", None, None)
        .await;

    create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &invitee.email,
        "member",
    )
    .await;
    let token = app.invitation_token(&acme.tenant_id, &invitee.email).await;
    app.lapse_invitation(&acme.tenant_id, &invitee.email).await;

    // The stored status is still "pending"; the read reports expired and
    // writes the transition back.
    let resp = app
        .client
        .get(app.url(&format!("/api/invitation/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "expired");
    assert_eq!(json["data"]["is_expired"], true);

    let invitation = invitation_doc(&app, &acme.tenant_id, &invitee.email).await;
    assert_eq!(invitation.get_str("status").unwrap(), "expired");

    // Acting on it fails with the expiry code
    let resp = app
        .auth_post(&format!("/api/invitation/{}/accept", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_EXPIRED");
}

#[tokio::test]
async fn duplicate_pending_invitation_is_rejected() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let (status, _) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "member",
    )
    .await;
    assert_eq!(status, 201);

    let (status, json) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "viewer",
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(json["code"], "TENANT_INVITE_ALREADY_PENDING");
}

#[tokio::test]
async fn inviting_an_active_member_is_rejected() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let (status, json) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &acme.member.email,
        "member",
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(json["code"], "TENANT_INVITE_ALREADY_MEMBER");
}

#[tokio::test]
async fn inviting_with_an_unknown_role_is_rejected() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let (status, json) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "superuser",
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(json["code"], "TENANT_INVALID_ROLE");
}

#[tokio::test]
async fn resend_rearms_expiry_but_keeps_the_token() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let (_, created) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "member",
    )
    .await;
    let invitation_id = created["data"]["id"].as_str().unwrap().to_string();

    let before = invitation_doc(&app, &acme.tenant_id, "pm@newhire.test").await;
    let token_before = before.get_str("token").unwrap().to_string();
    let expires_before = *before.get_datetime("expires_at").unwrap();

    // Small sleep so the re-armed clock is strictly later
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let resp = app
        .auth_post(
            &format!(
                "/api/tenant/{}/invitation/{}/resend",
                acme.tenant_id, invitation_id
            ),
            &acme.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let after = invitation_doc(&app, &acme.tenant_id, "pm@newhire.test").await;
    assert_eq!(after.get_str("token").unwrap(), token_before);
    assert!(*after.get_datetime("expires_at").unwrap() > expires_before);
    assert_eq!(after.get_str("status").unwrap(), "pending");
}

#[tokio::test]
async fn resend_of_a_lapsed_invitation_fails_expired() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let (_, created) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "member",
    )
    .await;
    let invitation_id = created["data"]["id"].as_str().unwrap().to_string();
    app.lapse_invitation(&acme.tenant_id, "pm@newhire.test").await;

    let resp = app
        .auth_post(
            &format!(
                "/api/tenant/{}/invitation/{}/resend",
                acme.tenant_id, invitation_id
            ),
            &acme.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_EXPIRED");
}

#[tokio::test]
async fn revoked_invitation_rejects_acceptance() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let invitee = app
        .register_user("pm@newhire.test", "New PM", "Newhire123!", None, None)
        .await;

    let (_, created) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        &invitee.email,
        "member",
    )
    .await;
    let invitation_id = created["data"]["id"].as_str().unwrap().to_string();
    let token = app.invitation_token(&acme.tenant_id, &invitee.email).await;

    let resp = app
        .auth_delete(
            &format!("/api/tenant/{}/invitation/{}", acme.tenant_id, invitation_id),
            &acme.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "revoked");

    let resp = app
        .auth_post(&format!("/api/invitation/{}/accept", token), &invitee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_INVITE_ALREADY_REVOKED");
}

#[tokio::test]
async fn cross_tenant_invitation_ids_resolve_like_missing_ones() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;
    let beta = app.seed_tenant("beta").await;

    let (_, created) = create_invitation(
        &app,
        &acme.tenant_id,
        &acme.owner.access_token,
        "pm@newhire.test",
        "member",
    )
    .await;
    let acme_invitation_id = created["data"]["id"].as_str().unwrap().to_string();

    // Beta's owner tries to revoke acme's invitation via beta's path
    let resp = app
        .auth_delete(
            &format!(
                "/api/tenant/{}/invitation/{}",
                beta.tenant_id, acme_invitation_id
            ),
            &beta.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "NOT_FOUND");

    // The foreign invitation is untouched
    let invitation = invitation_doc(&app, &acme.tenant_id, "pm@newhire.test").await;
    assert_eq!(invitation.get_str("status").unwrap(), "pending");
}
