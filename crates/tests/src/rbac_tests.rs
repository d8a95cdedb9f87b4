use crate::fixtures::test_app::TestApp;
use bson::{doc, oid::ObjectId};
use serde_json::Value;

#[tokio::test]
async fn viewer_can_read_but_not_mutate() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    let viewer = app
        .register_user("viewer@acme.test", "acme Viewer", "Viewer123!", None, None)
        .await;
    app.invite_and_accept(&acme.tenant_id, &acme.owner.access_token, &viewer, "viewer")
        .await;

    // Reads are fine
    let resp = app
        .auth_get(
            &format!("/api/tenant/{}/member", acme.tenant_id),
            &viewer.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get(
            &format!("/api/tenant/{}/project", acme.tenant_id),
            &viewer.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Mutations are uniformly denied
    let resp = app
        .auth_post(
            &format!("/api/tenant/{}/project", acme.tenant_id),
            &viewer.access_token,
        )
        .json(&serde_json::json!({ "name": "HQ Refit", "code": "HQ-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_PERMISSION_DENIED");

    let resp = app
        .auth_post(
            &format!("/api/tenant/{}/invitation", acme.tenant_id),
            &viewer.access_token,
        )
        .json(&serde_json::json!({ "email": "pm@newhire.test", "role": "member" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_patch(
            &format!("/api/tenant/{}/member/{}", acme.tenant_id, acme.member.id),
            &viewer.access_token,
        )
        .json(&serde_json::json!({ "role": "viewer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn a_role_outside_the_registry_is_denied_everywhere() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    // Force the member's role to a string the registry does not know.
    // Historical data and config drift can produce exactly this.
    let tid = ObjectId::parse_str(&acme.tenant_id).unwrap();
    let uid = ObjectId::parse_str(&acme.member.id).unwrap();
    app.db
        .collection::<bson::Document>("memberships")
        .update_one(
            doc! { "tenant_id": tid, "user_id": uid },
            doc! { "$set": { "role": "guest" } },
        )
        .await
        .unwrap();

    let paths_and_methods: Vec<(&str, String)> = vec![
        ("GET", format!("/api/tenant/{}/member", acme.tenant_id)),
        ("GET", format!("/api/tenant/{}/project", acme.tenant_id)),
        ("GET", format!("/api/tenant/{}/invitation", acme.tenant_id)),
    ];

    for (method, path) in paths_and_methods {
        let req = match method {
            "GET" => app.auth_get(&path, &acme.member.access_token),
            _ => unreachable!(),
        };
        let resp = req.send().await.unwrap();
        assert_eq!(
            resp.status().as_u16(),
            403,
            "{} {} should be denied for unknown role",
            method,
            path
        );
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "TENANT_PERMISSION_DENIED");
    }

    // Mutations too
    let resp = app
        .auth_post(
            &format!("/api/tenant/{}/project", acme.tenant_id),
            &acme.member.access_token,
        )
        .json(&serde_json::json!({ "name": "HQ Refit", "code": "HQ-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn non_members_present_the_empty_role() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;
    let beta = app.seed_tenant("beta").await;

    // beta's owner has every capability -- in beta. In acme they have none.
    let resp = app
        .auth_get(
            &format!("/api/tenant/{}/member", acme.tenant_id),
            &beta.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_PERMISSION_DENIED");
}

#[tokio::test]
async fn owner_only_gate_is_distinct_from_capability_denial() {
    let app = TestApp::spawn().await;
    let acme = app.seed_tenant("acme").await;

    // Viewer lacks manage_members entirely: generic denial
    let viewer = app
        .register_user("viewer@acme.test", "acme Viewer", "Viewer123!", None, None)
        .await;
    app.invite_and_accept(&acme.tenant_id, &acme.owner.access_token, &viewer, "viewer")
        .await;

    let resp = app
        .auth_patch(
            &format!("/api/tenant/{}/member/{}", acme.tenant_id, acme.member.id),
            &viewer.access_token,
        )
        .json(&serde_json::json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "TENANT_PERMISSION_DENIED");

    // Admin holds manage_members but hits the owner-literal wall
    let resp = app
        .auth_post(
            &format!(
                "/api/tenant/{}/member/{}/make-owner",
                acme.tenant_id, acme.member.id
            ),
            &acme.admin.access_token,
        )
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "FORBIDDEN");
}
