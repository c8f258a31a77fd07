mod common;

use api::gql::build_schema;
use async_graphql::Variables;
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;

const CANCEL: &str = r#"
    mutation Cancel($input: CancelSessionInput!) {
        cancelSession(input: $input) { id status cancellationReason }
    }
"#;

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_cancellation_needs_two_hours_notice() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Cancel Club").await;
    let (coach, coach_claims) = create_test_coach(&app_state, club.id).await;

    let soon = create_test_session(&app_state, &coach, Utc::now() + Duration::minutes(90)).await;
    let vars = Variables::from_json(json!({ "input": { "sessionId": soon.id } }));
    let response = execute_graphql(&schema, CANCEL, Some(vars), Some(coach_claims.clone())).await;
    let (code, reason) = error_code(&response);
    assert_eq!(code, "INVALID_STATE");
    assert_eq!(reason.as_deref(), Some("CANCELLATION_WINDOW_CLOSED"));
    assert_eq!(audit_count(&app_state, soon.id).await, 0);

    let later = create_test_session(&app_state, &coach, Utc::now() + Duration::hours(3)).await;
    let vars = Variables::from_json(json!({
        "input": { "sessionId": later.id, "reason": "Track maintenance" }
    }));
    let cancelled = data(
        execute_graphql(&schema, CANCEL, Some(vars.clone()), Some(coach_claims.clone()))
            .await,
    );
    assert_eq!(cancelled["cancelSession"]["status"], "CANCELLED");
    assert_eq!(cancelled["cancelSession"]["cancellationReason"], "Track maintenance");
    assert_eq!(audit_count(&app_state, later.id).await, 1);

    let response = execute_graphql(&schema, CANCEL, Some(vars), Some(coach_claims)).await;
    let (_, reason) = error_code(&response);
    assert_eq!(reason.as_deref(), Some("SESSION_CANCELLED"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_only_the_owning_coach_manages_a_session() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Owner Club").await;
    let (owner, _) = create_test_coach(&app_state, club.id).await;
    let (_, colleague_claims) = create_test_coach(&app_state, club.id).await;
    let session = create_test_session(&app_state, &owner, Utc::now() + Duration::days(1)).await;

    // Colleagues may read the session but not change it
    let read = r#"query Get($id: UUID!) { session(id: $id) { id title } }"#;
    let vars = Variables::from_json(json!({ "id": session.id }));
    let found = data(
        execute_graphql(&schema, read, Some(vars), Some(colleague_claims.clone()))
            .await,
    );
    assert_eq!(found["session"]["title"], "Intervals");

    let vars = Variables::from_json(json!({ "input": { "sessionId": session.id } }));
    let response = execute_graphql(&schema, CANCEL, Some(vars), Some(colleague_claims)).await;
    assert_eq!(error_code(&response).0, "NOT_AVAILABLE");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_schedule_is_validated_on_create() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());

    let club = create_test_club(&app_state, "Schedule Club").await;
    let (_, coach_claims) = create_test_coach(&app_state, club.id).await;

    let create = r#"
        mutation Create($input: CreateSessionInput!) {
            createSession(input: $input) { id }
        }
    "#;
    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let yesterday = (Utc::now() - Duration::days(1)).date_naive();

    for (date, start, end) in [
        (tomorrow, "11:00:00", "10:00:00"),
        (tomorrow, "10:00:00", "10:00:00"),
        (yesterday, "10:00:00", "11:00:00"),
    ] {
        let vars = Variables::from_json(json!({
            "input": {
                "clubId": club.id,
                "title": "Hill repeats",
                "sessionDate": date.to_string(),
                "startTime": start,
                "endTime": end
            }
        }));
        let response =
            execute_graphql(&schema, create, Some(vars), Some(coach_claims.clone())).await;
        assert_eq!(error_code(&response).0, "VALIDATION_ERROR", "{date} {start}-{end}");
    }
}
