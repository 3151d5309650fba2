//! Registration, verification email delivery and account activation.

mod common;

use axum::http::StatusCode;
use common::*;
use saas_core::common::Role;
use saas_core::domains::user::models::User;
use saas_core::kernel::jobs::Job;
use serde_json::json;
use test_context::test_context;

fn token_from_mail(body: &str) -> String {
    body.lines()
        .find_map(|line| line.strip_prefix("Verification token: "))
        .expect("mail carries a verification token")
        .trim()
        .to_string()
}

#[test_context(TestHarness)]
#[tokio::test]
async fn register_creates_inactive_member_and_queues_mail(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post(
            "/api/v1/users",
            json!({ "email": "new@local.host", "username": "newbie", "password": "supersecret" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["email"], "new@local.host");
    assert_eq!(response.body["data"]["username"], "newbie");

    let user = User::find_by_username("newbie", &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_active);
    assert_eq!(user.role, Role::Member);
    assert_ne!(user.password, "supersecret");

    let jobs = Job::find_by_type("deliver_verification_email", &ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    // Nothing is mailed until the job runs
    assert!(ctx.mocks.mailer.sent().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn verification_mail_activates_account(ctx: &TestHarness) {
    let client = ctx.client();
    client
        .post(
            "/api/v1/users",
            json!({ "email": "new@local.host", "username": "newbie", "password": "supersecret" }),
        )
        .await;

    assert_eq!(ctx.run_jobs().await.unwrap(), 1);

    let sent = ctx.mocks.mailer.sent_to("new@local.host");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Account Verification");
    assert!(sent[0].body.contains("http://localhost:8000/verify?token="));

    // Inactive accounts cannot sign in yet
    let before = client
        .post(
            "/api/auth",
            json!({ "identity": "newbie", "password": "supersecret" }),
        )
        .await;
    assert_eq!(before.status, StatusCode::BAD_REQUEST);

    let token = token_from_mail(&sent[0].body);
    let verified = client
        .post("/api/v1/users/verify", json!({ "token": token }))
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["data"]["username"], "newbie");
    assert_eq!(verified.body["data"]["active"], true);

    let after = client
        .post(
            "/api/auth",
            json!({ "identity": "newbie", "password": "supersecret" }),
        )
        .await;
    assert_eq!(after.status, StatusCode::OK);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn duplicate_email_and_username_are_reported(ctx: &TestHarness) {
    create_member(&ctx.db_pool, "alice").await.unwrap();

    let response = ctx
        .client()
        .post(
            "/api/v1/users",
            json!({ "email": "alice@local.host", "username": "alice", "password": "supersecret" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.error()["email"],
        json!(["alice@local.host already exists."])
    );
    assert_eq!(response.error()["username"], json!(["alice already exists."]));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn invalid_registration_fields(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post(
            "/api/v1/users",
            json!({ "email": "not-an-email", "username": "has space", "password": "short" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["email", "username", "password"] {
        assert!(response.error()[field].is_array(), "missing {} error", field);
    }
    assert_eq!(
        User::find_by_username("has space", &ctx.db_pool)
            .await
            .unwrap()
            .map(|u| u.id),
        None
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn admin_route_names_cannot_be_usernames(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post(
            "/api/v1/users",
            json!({ "email": "bulk@local.host", "username": "bulk_delete", "password": "password" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.error()["username"],
        json!(["bulk_delete is a reserved username."])
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn bad_verification_token_is_rejected(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post("/api/v1/users/verify", json!({ "token": "garbage" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Verification token is invalid or expired.");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn access_token_is_not_a_verification_token(ctx: &TestHarness) {
    let user = create_user(&ctx.db_pool, "pending", Role::Member, false)
        .await
        .unwrap();

    let response = ctx
        .client()
        .post(
            "/api/v1/users/verify",
            json!({ "token": token_for(&ctx.deps, &user) }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn resend_only_mails_inactive_accounts(ctx: &TestHarness) {
    create_user(&ctx.db_pool, "pending", Role::Member, false)
        .await
        .unwrap();
    create_member(&ctx.db_pool, "alice").await.unwrap();
    let client = ctx.client();

    for identity in ["pending@local.host", "alice", "nobody"] {
        let response = client
            .post(
                "/api/v1/users/verify/resend",
                json!({ "identity": identity }),
            )
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
    }

    ctx.run_jobs().await.unwrap();
    let sent = ctx.mocks.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "pending@local.host");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn mail_job_for_deleted_user_is_a_no_op(ctx: &TestHarness) {
    ctx.client()
        .post(
            "/api/v1/users",
            json!({ "email": "gone@local.host", "username": "gone", "password": "supersecret" }),
        )
        .await;
    let user = User::find_by_username("gone", &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    User::delete_unless_last_admin(user.id, &ctx.db_pool)
        .await
        .unwrap();

    assert_eq!(ctx.run_jobs().await.unwrap(), 1);
    assert!(ctx.mocks.mailer.sent().is_empty());
}
