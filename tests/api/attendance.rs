use attend_server::{
    api::{
        attendance::{MarkAttendance, ReportRow},
        students::{CreateStudent, Student},
    },
    repository::attendance::AttendanceStatus,
};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::{assert_status, TestApp, TestClient};

async fn create_student(client: &TestClient, name: &str, regno: &str) -> Student {
    client
        .post(
            "/api/students",
            CreateStudent {
                name: name.to_string(),
                regno: regno.to_string(),
            },
        )
        .await
        .expect("failed to create student")
}

async fn mark(
    client: &TestClient,
    student_id: i64,
    date: &str,
    status: AttendanceStatus,
) -> Student {
    client
        .post(
            "/api/attendance",
            MarkAttendance {
                student_id,
                date: date.to_string(),
                status,
            },
        )
        .await
        .expect("failed to mark attendance")
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn marking_attendance_returns_the_refreshed_row() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    let updated = mark(&client, student.id, "2024-01-10", AttendanceStatus::Present).await;

    assert_eq!(student.id, updated.id);
    assert_eq!(AttendanceStatus::Present, updated.today_status);
    assert!((updated.attendance_percentage - 100.0).abs() < 0.005);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn percentage_covers_the_entire_history() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    mark(&client, student.id, "2024-01-10", AttendanceStatus::Present).await;
    mark(&client, student.id, "2024-01-11", AttendanceStatus::Present).await;
    let updated = mark(&client, student.id, "2024-01-12", AttendanceStatus::Absent).await;

    assert_eq!(AttendanceStatus::Absent, updated.today_status);
    assert!((updated.attendance_percentage - 66.67).abs() < 0.005);

    // A date with no record reads as absent while the lifetime percentage
    // stays put.
    let students: Vec<Student> = client
        .get("/api/students?date=2024-01-13")
        .await
        .expect("failed to list students");
    assert_eq!(1, students.len());
    assert_eq!(AttendanceStatus::Absent, students[0].today_status);
    assert!((students[0].attendance_percentage - 66.67).abs() < 0.005);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn resubmission_overwrites_the_single_record() {
    let (app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    mark(&client, student.id, "2024-01-10", AttendanceStatus::Present).await;
    let updated = mark(&client, student.id, "2024-01-10", AttendanceStatus::Absent).await;

    assert_eq!(AttendanceStatus::Absent, updated.today_status);
    assert!((updated.attendance_percentage - 0.0).abs() < 0.005);

    let (rows,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM attendance_records WHERE student_id = ? AND date = ?",
    )
    .bind(student.id)
    .bind("2024-01-10")
    .fetch_one(app.database().pool())
    .await
    .expect("failed to count attendance records");
    assert_eq!(1, rows);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn percentage_is_independent_of_submission_order() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    mark(&client, student.id, "2024-01-12", AttendanceStatus::Present).await;
    mark(&client, student.id, "2024-01-10", AttendanceStatus::Absent).await;
    let updated = mark(&client, student.id, "2024-01-11", AttendanceStatus::Present).await;

    assert!((updated.attendance_percentage - 66.67).abs() < 0.005);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn marking_an_unknown_student_is_not_found() {
    let (_app, client) = TestApp::start_and_connect().await;

    let result = client
        .post::<MarkAttendance, Student>(
            "/api/attendance",
            MarkAttendance {
                student_id: 9999,
                date: "2024-01-10".to_string(),
                status: AttendanceStatus::Present,
            },
        )
        .await;
    assert_status(result, 404);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn missing_fields_are_rejected() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;

    let result = client
        .post::<serde_json::Value, Student>(
            "/api/attendance",
            json!({ "studentId": student.id, "date": "2024-01-10" }),
        )
        .await;
    assert_status(result, 400);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn invalid_status_is_rejected() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;

    let result = client
        .post::<serde_json::Value, Student>(
            "/api/attendance",
            json!({ "studentId": student.id, "date": "2024-01-10", "status": "late" }),
        )
        .await;
    assert_status(result, 400);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn invalid_date_is_rejected() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;

    let result = client
        .post::<MarkAttendance, Student>(
            "/api/attendance",
            MarkAttendance {
                student_id: student.id,
                date: "10/01/2024".to_string(),
                status: AttendanceStatus::Present,
            },
        )
        .await;
    assert_status(result, 400);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn report_includes_students_without_records() {
    let (_app, client) = TestApp::start_and_connect().await;

    let attending = create_student(&client, "Alice", "R-001").await;
    create_student(&client, "Bob", "R-002").await;

    mark(&client, attending.id, "2024-01-10", AttendanceStatus::Present).await;
    mark(&client, attending.id, "2024-01-11", AttendanceStatus::Absent).await;

    let report: Vec<ReportRow> = client
        .get("/api/attendance/report?startDate=2024-01-01&endDate=2024-01-31")
        .await
        .expect("failed to fetch report");

    assert_eq!(2, report.len());

    let alice = &report[0];
    assert_eq!("Alice", alice.name);
    assert_eq!(1, alice.present_days);
    assert_eq!(1, alice.absent_days);

    let bob = &report[1];
    assert_eq!("Bob", bob.name);
    assert_eq!(0, bob.present_days);
    assert_eq!(0, bob.absent_days);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn report_counts_only_the_requested_range() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    mark(&client, student.id, "2024-01-10", AttendanceStatus::Present).await;
    mark(&client, student.id, "2024-02-10", AttendanceStatus::Absent).await;

    let report: Vec<ReportRow> = client
        .get("/api/attendance/report?startDate=2024-01-01&endDate=2024-01-31")
        .await
        .expect("failed to fetch report");

    assert_eq!(1, report.len());
    assert_eq!(1, report[0].present_days);
    assert_eq!(0, report[0].absent_days);
    // The stored percentage still covers the full history.
    assert!((report[0].attendance_percentage - 50.0).abs() < 0.005);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn marked_by_is_the_authenticated_account() {
    let app = TestApp::start().await;
    let (client, account) = app.connect_authenticated().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    mark(&client, student.id, "2024-01-10", AttendanceStatus::Present).await;

    let (marked_by,): (i64,) =
        sqlx::query_as("SELECT marked_by FROM attendance_records WHERE student_id = ?")
            .bind(student.id)
            .fetch_one(app.database().pool())
            .await
            .expect("failed to read attendance record");
    assert_eq!(account.id, marked_by);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn edit_window_is_not_enforced_by_default() {
    let (_app, client) = TestApp::start_and_connect().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    let old_date = (Utc::now().naive_utc().date() - Duration::days(120)).to_string();

    let updated = mark(&client, student.id, &old_date, AttendanceStatus::Present).await;
    assert_eq!(AttendanceStatus::Present, updated.today_status);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn edit_window_rejects_old_and_future_dates_when_enabled() {
    let app = TestApp::start_with(|args| {
        args.enforce_edit_window = true;
    })
    .await;
    let (client, _) = app.connect_authenticated().await;

    let student = create_student(&client, "Ada Lovelace", "R-001").await;
    let today = Utc::now().naive_utc().date();

    let updated = mark(
        &client,
        student.id,
        &today.to_string(),
        AttendanceStatus::Present,
    )
    .await;
    assert_eq!(AttendanceStatus::Present, updated.today_status);

    let too_old = (today - Duration::days(60)).to_string();
    let result = client
        .post::<MarkAttendance, Student>(
            "/api/attendance",
            MarkAttendance {
                student_id: student.id,
                date: too_old,
                status: AttendanceStatus::Present,
            },
        )
        .await;
    assert_status(result, 400);

    let future = (today + Duration::days(2)).to_string();
    let result = client
        .post::<MarkAttendance, Student>(
            "/api/attendance",
            MarkAttendance {
                student_id: student.id,
                date: future,
                status: AttendanceStatus::Present,
            },
        )
        .await;
    assert_status(result, 400);
}
