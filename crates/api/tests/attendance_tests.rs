mod common;

use api::gql::build_schema;
use async_graphql::Variables;
use chrono::{Duration, Utc};
use common::*;
use infra::repos::AccessFlag;
use serde_json::json;
use uuid::Uuid;

const MARK: &str = r#"
    mutation Mark($input: MarkAttendanceInput!) {
        markAttendance(input: $input) { id status method checkInTime }
    }
"#;

const REQUEST_LEAVE: &str = r#"
    mutation Leave($input: RequestLeaveInput!) {
        requestLeave(input: $input) { id status }
    }
"#;

const REVIEW_LEAVE: &str = r#"
    mutation ReviewLeave($input: ReviewLeaveInput!) {
        reviewLeaveRequest(input: $input) { id status reviewedBy }
    }
"#;

const SESSION_ATTENDANCE: &str = r#"
    query Attendance($sessionId: UUID!) {
        sessionAttendance(sessionId: $sessionId) { id memberId status method notes }
    }
"#;

fn mark_vars(session_id: Uuid, member_id: Uuid, status: &str) -> Variables {
    Variables::from_json(json!({
        "input": { "sessionId": session_id, "memberId": member_id, "status": status }
    }))
}

fn leave_vars(session_id: Uuid, reason: &str) -> Variables {
    Variables::from_json(json!({ "input": { "sessionId": session_id, "reason": reason } }))
}

fn review_vars(request_id: &str, decision: &str) -> Variables {
    Variables::from_json(json!({ "input": { "requestId": request_id, "decision": decision } }))
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_approved_leave_becomes_excused_and_marking_updates_it() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Leave Club").await;
    let (_, coach_claims) = create_test_coach(&app_state, club.id).await;
    let (member, member_claims) =
        create_test_member(&app_state, club.id, AccessFlag::Active).await;

    let session_date = (Utc::now() + Duration::days(3)).date_naive();
    let create = r#"
        mutation Create($input: CreateSessionInput!) {
            createSession(input: $input) { id status coach { id } }
        }
    "#;
    let vars = Variables::from_json(json!({
        "input": {
            "clubId": club.id,
            "title": "Morning sprints",
            "sessionDate": session_date.to_string(),
            "startTime": "10:00:00",
            "endTime": "11:00:00",
            "location": "Track 1"
        }
    }));
    let created = data(
        execute_graphql(&schema, create, Some(vars), Some(coach_claims.clone()))
            .await,
    );
    assert_eq!(created["createSession"]["status"], "SCHEDULED");
    let session_id =
        Uuid::parse_str(created["createSession"]["id"].as_str().unwrap()).unwrap();

    let requested = data(
        execute_graphql(
            &schema,
            REQUEST_LEAVE,
            Some(leave_vars(session_id, "illness")),
            Some(member_claims.clone()),
        )
        .await,
    );
    assert_eq!(requested["requestLeave"]["status"], "PENDING");
    let request_id = requested["requestLeave"]["id"].as_str().unwrap().to_string();

    // A second pending request for the same session is a duplicate
    let response = execute_graphql(
        &schema,
        REQUEST_LEAVE,
        Some(leave_vars(session_id, "still ill")),
        Some(member_claims),
    )
    .await;
    let (code, reason) = error_code(&response);
    assert_eq!(code, "CONFLICT");
    assert_eq!(reason.as_deref(), Some("DUPLICATE_REQUEST"));

    let approved = data(
        execute_graphql(
            &schema,
            REVIEW_LEAVE,
            Some(review_vars(&request_id, "APPROVE")),
            Some(coach_claims.clone()),
        )
        .await,
    );
    assert_eq!(approved["reviewLeaveRequest"]["status"], "APPROVED");

    let vars = Variables::from_json(json!({ "sessionId": session_id }));
    let records = data(
        execute_graphql(&schema, SESSION_ATTENDANCE, Some(vars.clone()), Some(coach_claims.clone()))
            .await,
    );
    let records = records["sessionAttendance"].as_array().unwrap().clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "EXCUSED");
    assert_eq!(records[0]["method"], "LEAVE_APPROVAL");
    assert_eq!(records[0]["notes"], "Leave approved: illness");

    let marked = data(
        execute_graphql(
            &schema,
            MARK,
            Some(mark_vars(session_id, member.id, "PRESENT")),
            Some(coach_claims.clone()),
        )
        .await,
    );
    assert_eq!(marked["markAttendance"]["status"], "PRESENT");
    assert_eq!(marked["markAttendance"]["id"], records[0]["id"]);

    let after = data(
        execute_graphql(&schema, SESSION_ATTENDANCE, Some(vars), Some(coach_claims))
            .await,
    );
    let after = after["sessionAttendance"].as_array().unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0]["status"], "PRESENT");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_leave_after_check_in_is_refused() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Check-in Club").await;
    let (coach, _) = create_test_coach(&app_state, club.id).await;
    let (_, member_claims) = create_test_member(&app_state, club.id, AccessFlag::Active).await;
    let session = create_test_session(&app_state, &coach, Utc::now() + Duration::minutes(45)).await;

    let check_in = r#"
        mutation CheckIn($sessionId: UUID!) {
            checkIn(sessionId: $sessionId) { status method checkInTime }
        }
    "#;
    let vars = Variables::from_json(json!({ "sessionId": session.id }));
    let checked_in =
        data(execute_graphql(&schema, check_in, Some(vars), Some(member_claims.clone())).await);
    assert_eq!(checked_in["checkIn"]["status"], "PRESENT");
    assert_eq!(checked_in["checkIn"]["method"], "SELF_CHECK_IN");
    assert!(checked_in["checkIn"]["checkInTime"].is_string());

    let response = execute_graphql(
        &schema,
        REQUEST_LEAVE,
        Some(leave_vars(session.id, "twisted ankle")),
        Some(member_claims),
    )
    .await;
    let (code, reason) = error_code(&response);
    assert_eq!(code, "INVALID_STATE");
    assert_eq!(reason.as_deref(), Some("ALREADY_CHECKED_IN"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_inactive_members_cannot_check_in() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Inactive Club").await;
    let (coach, _) = create_test_coach(&app_state, club.id).await;
    let (_, member_claims) = create_test_member(&app_state, club.id, AccessFlag::Pending).await;
    let session = create_test_session(&app_state, &coach, Utc::now() + Duration::hours(1)).await;

    let check_in = r#"
        mutation CheckIn($sessionId: UUID!) { checkIn(sessionId: $sessionId) { id } }
    "#;
    let vars = Variables::from_json(json!({ "sessionId": session.id }));
    let response = execute_graphql(&schema, check_in, Some(vars), Some(member_claims)).await;
    let (code, reason) = error_code(&response);
    assert_eq!(code, "INVALID_STATE");
    assert_eq!(reason.as_deref(), Some("MEMBERSHIP_INACTIVE"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_repeated_marks_keep_a_single_record() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Upsert Club").await;
    let (coach, coach_claims) = create_test_coach(&app_state, club.id).await;
    let (member, member_claims) =
        create_test_member(&app_state, club.id, AccessFlag::Active).await;
    let session = create_test_session(&app_state, &coach, Utc::now() + Duration::hours(5)).await;

    for status in ["ABSENT", "LATE", "PRESENT"] {
        let marked = data(
            execute_graphql(
                &schema,
                MARK,
                Some(mark_vars(session.id, member.id, status)),
                Some(coach_claims.clone()),
            )
            .await,
        );
        assert_eq!(marked["markAttendance"]["status"], status);
        assert!(marked["markAttendance"]["checkInTime"].is_null());
    }

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_records WHERE session_id = $1 AND member_id = $2",
    )
    .bind(session.id)
    .bind(member.id)
    .fetch_one(&app_state.db)
    .await
    .unwrap();
    assert_eq!(rows, 1);

    let stats = r#"
        query { attendanceStats { totalRecords totalAttendance attendanceRate } }
    "#;
    let stats = data(execute_graphql(&schema, stats, None, Some(member_claims)).await);
    assert_eq!(stats["attendanceStats"]["totalRecords"], 1);
    assert_eq!(stats["attendanceStats"]["totalAttendance"], 1);
    assert_eq!(stats["attendanceStats"]["attendanceRate"], 100.0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_leave_approval_keeps_an_existing_record() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Idempotent Club").await;
    let (coach, coach_claims) = create_test_coach(&app_state, club.id).await;
    let (member, member_claims) =
        create_test_member(&app_state, club.id, AccessFlag::Active).await;
    let session = create_test_session(&app_state, &coach, Utc::now() + Duration::days(2)).await;

    let requested = data(
        execute_graphql(
            &schema,
            REQUEST_LEAVE,
            Some(leave_vars(session.id, "exam")),
            Some(member_claims),
        )
        .await,
    );
    let request_id = requested["requestLeave"]["id"].as_str().unwrap().to_string();

    // The coach records an outcome before getting to the request
    data(
        execute_graphql(
            &schema,
            MARK,
            Some(mark_vars(session.id, member.id, "ABSENT")),
            Some(coach_claims.clone()),
        )
        .await,
    );
    data(
        execute_graphql(
            &schema,
            REVIEW_LEAVE,
            Some(review_vars(&request_id, "APPROVE")),
            Some(coach_claims.clone()),
        )
        .await,
    );

    let vars = Variables::from_json(json!({ "sessionId": session.id }));
    let records = data(
        execute_graphql(&schema, SESSION_ATTENDANCE, Some(vars), Some(coach_claims.clone()))
            .await,
    );
    let records = records["sessionAttendance"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "ABSENT");

    // Reviewing twice is refused
    let response = execute_graphql(
        &schema,
        REVIEW_LEAVE,
        Some(review_vars(&request_id, "REJECT")),
        Some(coach_claims),
    )
    .await;
    let (_, reason) = error_code(&response);
    assert_eq!(reason.as_deref(), Some("ALREADY_REVIEWED"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_members_of_other_clubs_cannot_be_marked() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Home Club").await;
    let other = create_test_club(&app_state, "Away Club").await;
    let (coach, coach_claims) = create_test_coach(&app_state, club.id).await;
    let (stranger, _) = create_test_member(&app_state, other.id, AccessFlag::Active).await;
    let session = create_test_session(&app_state, &coach, Utc::now() + Duration::hours(4)).await;

    let response = execute_graphql(
        &schema,
        MARK,
        Some(mark_vars(session.id, stranger.id, "PRESENT")),
        Some(coach_claims),
    )
    .await;
    assert_eq!(error_code(&response).0, "NOT_AVAILABLE");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_concurrent_leave_reviews_let_the_first_decision_win() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Leave Race Club").await;
    let (coach, coach_claims) = create_test_coach(&app_state, club.id).await;
    let admin = admin_claims();

    for _ in 0..5 {
        let (member, member_claims) =
            create_test_member(&app_state, club.id, AccessFlag::Active).await;
        let session =
            create_test_session(&app_state, &coach, Utc::now() + Duration::days(2)).await;
        let requested = data(
            execute_graphql(
                &schema,
                REQUEST_LEAVE,
                Some(leave_vars(session.id, "family visit")),
                Some(member_claims),
            )
            .await,
        );
        let request_id = requested["requestLeave"]["id"].as_str().unwrap().to_string();

        let (approve, reject) = tokio::join!(
            execute_graphql(
                &schema,
                REVIEW_LEAVE,
                Some(review_vars(&request_id, "APPROVE")),
                Some(coach_claims.clone()),
            ),
            execute_graphql(
                &schema,
                REVIEW_LEAVE,
                Some(review_vars(&request_id, "REJECT")),
                Some(admin.clone()),
            ),
        );

        let approved = approve.errors.is_empty();
        assert_ne!(approved, reject.errors.is_empty(), "exactly one review must succeed");
        let loser = if approved { &reject } else { &approve };
        let (code, reason) = error_code(loser);
        assert_eq!(code, "INVALID_STATE");
        assert_eq!(reason.as_deref(), Some("ALREADY_REVIEWED"));

        let records: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM attendance_records WHERE session_id = $1 AND member_id = $2",
        )
        .bind(session.id)
        .bind(member.id)
        .fetch_one(&app_state.db)
        .await
        .unwrap();
        assert_eq!(records, i64::from(approved));
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_leave_for_a_cancelled_session_can_only_be_rejected() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Cancelled Leave Club").await;
    let (coach, coach_claims) = create_test_coach(&app_state, club.id).await;
    let (member, member_claims) =
        create_test_member(&app_state, club.id, AccessFlag::Active).await;
    let session = create_test_session(&app_state, &coach, Utc::now() + Duration::days(2)).await;

    let requested = data(
        execute_graphql(
            &schema,
            REQUEST_LEAVE,
            Some(leave_vars(session.id, "tournament abroad")),
            Some(member_claims),
        )
        .await,
    );
    let request_id = requested["requestLeave"]["id"].as_str().unwrap().to_string();

    let cancel = r#"
        mutation Cancel($input: CancelSessionInput!) { cancelSession(input: $input) { id } }
    "#;
    let vars = Variables::from_json(json!({ "input": { "sessionId": session.id } }));
    data(execute_graphql(&schema, cancel, Some(vars), Some(coach_claims.clone())).await);

    let response = execute_graphql(
        &schema,
        REVIEW_LEAVE,
        Some(review_vars(&request_id, "APPROVE")),
        Some(coach_claims.clone()),
    )
    .await;
    let (code, reason) = error_code(&response);
    assert_eq!(code, "INVALID_STATE");
    assert_eq!(reason.as_deref(), Some("SESSION_CANCELLED"));

    let rejected = data(
        execute_graphql(
            &schema,
            REVIEW_LEAVE,
            Some(review_vars(&request_id, "REJECT")),
            Some(coach_claims),
        )
        .await,
    );
    assert_eq!(rejected["reviewLeaveRequest"]["status"], "REJECTED");

    let records: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_records WHERE session_id = $1 AND member_id = $2",
    )
    .bind(session.id)
    .bind(member.id)
    .fetch_one(&app_state.db)
    .await
    .unwrap();
    assert_eq!(records, 0);
}
