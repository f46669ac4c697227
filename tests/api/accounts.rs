use chrono::{Duration, Utc};
use uuid::Uuid;

use attend_server::api::{
    accounts::{Account, Session, Signin, Signup},
    students::Student,
};

use crate::{assert_status, TestApp, TEST_PASSWORD};

fn signup_request(email: &str) -> Signup {
    Signup {
        name: "Test Teacher".to_string(),
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn signup_returns_created_account() {
    let app = TestApp::start().await;
    let client = app.connect().await.expect("failed to connect");

    let email = format!("{}@example.com", Uuid::new_v4());
    let account: Account = client
        .post("/api/signup", signup_request(&email))
        .await
        .expect("failed to sign up");

    assert_eq!("Test Teacher", account.name);
    assert_eq!(email, account.email);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn duplicate_email_is_rejected_without_creating_a_row() {
    let app = TestApp::start().await;
    let client = app.connect().await.expect("failed to connect");

    let email = format!("{}@example.com", Uuid::new_v4());
    let _: Account = client
        .post("/api/signup", signup_request(&email))
        .await
        .expect("failed to sign up");

    let result = client
        .post::<Signup, Account>("/api/signup", signup_request(&email))
        .await;
    assert_status(result, 400);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE email = ?")
        .bind(&email)
        .fetch_one(app.database().pool())
        .await
        .expect("failed to count accounts");
    assert_eq!(1, count);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn signup_with_blank_fields_is_rejected() {
    let app = TestApp::start().await;
    let client = app.connect().await.expect("failed to connect");

    let result = client
        .post::<Signup, Account>("/api/signup", signup_request(" "))
        .await;
    assert_status(result, 400);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn signin_issues_a_usable_token() {
    let app = TestApp::start().await;
    let (client, _) = app.connect_authenticated().await;

    let students: Vec<Student> = client
        .get("/api/students")
        .await
        .expect("failed to list students");

    assert!(students.is_empty());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn signin_with_wrong_password_is_rejected() {
    let app = TestApp::start().await;
    let client = app.connect().await.expect("failed to connect");

    let email = format!("{}@example.com", Uuid::new_v4());
    let _: Account = client
        .post("/api/signup", signup_request(&email))
        .await
        .expect("failed to sign up");

    let result = client
        .post::<Signin, Session>(
            "/api/signin",
            Signin {
                email,
                password: "wrong-password".to_string(),
            },
        )
        .await;
    assert_status(result, 401);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn signin_with_unknown_email_is_rejected() {
    let app = TestApp::start().await;
    let client = app.connect().await.expect("failed to connect");

    let result = client
        .post::<Signin, Session>(
            "/api/signin",
            Signin {
                email: "nobody@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            },
        )
        .await;
    assert_status(result, 401);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn anonymous_requests_to_protected_routes_are_rejected() {
    let app = TestApp::start().await;
    let client = app.connect().await.expect("failed to connect");

    let result = client.get::<Vec<Student>>("/api/students").await;
    assert_status(result, 401);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn signed_out_token_stops_working() {
    let app = TestApp::start().await;
    let (client, _) = app.connect_authenticated().await;

    client
        .post_no_body("/api/signout")
        .await
        .expect("failed to sign out");

    let result = client.get::<Vec<Student>>("/api/students").await;
    assert_status(result, 401);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn expired_session_is_rejected() {
    let app = TestApp::start().await;
    let (_, account) = app.connect_authenticated().await;

    sqlx::query("INSERT INTO sessions (token, account_id, expires_at) VALUES (?, ?, ?)")
        .bind("expired-token")
        .bind(account.id)
        .bind(Utc::now().naive_utc() - Duration::hours(1))
        .execute(app.database().pool())
        .await
        .expect("failed to insert expired session");

    let client = app
        .connect()
        .await
        .expect("failed to connect")
        .with_token("expired-token".to_string());

    let result = client.get::<Vec<Student>>("/api/students").await;
    assert_status(result, 401);
}
