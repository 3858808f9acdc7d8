//! Check-in and feedback gating over the in-process store

mod helpers;

use assert_matches::assert_matches;
use campus_events::models::*;
use campus_events::{CampusError, ConflictReason};
use helpers::*;

fn rating(value: i32) -> SubmitFeedbackRequest {
    SubmitFeedbackRequest { rating: value, comment: Some("Great session".to_string()) }
}

#[tokio::test]
async fn test_check_in_updates_all_counters_together() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;

    let registration = ctx.services.ledger.register(&student, event.id).await.unwrap();
    let attended = ctx.services.attendance.check_in(&ctx.organizer, registration.id).await.unwrap();

    assert_eq!(attended.status, RegistrationStatus::Attended);
    assert!(attended.check_in_time.is_some());

    let event = ctx.reload_event(event.id).await;
    assert_eq!(event.attended_count, 1);
    assert_eq!(event.registered_count, 1);
    assert_eq!(ctx.reload_user(student.user_id).await.events_attended, 1);
    ctx.assert_counters_consistent().await;
}

#[tokio::test]
async fn test_repeat_check_in_is_a_conflict() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;

    let registration = ctx.attend(&student, event.id).await;
    let repeat = ctx.services.attendance.check_in(&ctx.organizer, registration.id).await;

    assert_matches!(repeat, Err(CampusError::Conflict(ConflictReason::AlreadyCheckedIn)));
    assert_eq!(ctx.reload_event(event.id).await.attended_count, 1);
    assert_eq!(ctx.reload_user(student.user_id).await.events_attended, 1);
}

#[tokio::test]
async fn test_cancelled_registration_cannot_be_checked_in() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;

    let registration = ctx.services.ledger.register(&student, event.id).await.unwrap();
    ctx.services.ledger.cancel(&student, event.id).await.unwrap();

    assert_matches!(
        ctx.services.attendance.check_in(&ctx.organizer, registration.id).await,
        Err(CampusError::Conflict(ConflictReason::NotCheckable))
    );
    assert_eq!(ctx.reload_event(event.id).await.attended_count, 0);
    ctx.assert_counters_consistent().await;
}

#[tokio::test]
async fn test_unknown_registration_is_not_found() {
    let ctx = TestContext::new().await;
    assert_matches!(
        ctx.services.attendance.check_in(&ctx.organizer, 999_999).await,
        Err(CampusError::NotFound { .. })
    );
}

#[tokio::test]
async fn test_lifetime_counter_spans_events() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;

    for _ in 0..3 {
        let event = ctx.event(5).await;
        ctx.attend(&student, event.id).await;
    }

    assert_eq!(ctx.reload_user(student.user_id).await.events_attended, 3);
    let attended = ctx.services.ledger.attended_events(&student).await.unwrap();
    assert_eq!(attended.len(), 3);
}

#[tokio::test]
async fn test_feedback_requires_attendance() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;

    assert_matches!(
        ctx.services.feedback.submit(&student, event.id, rating(4)).await,
        Err(CampusError::Conflict(ConflictReason::NotAttended))
    );

    ctx.services.ledger.register(&student, event.id).await.unwrap();
    assert_matches!(
        ctx.services.feedback.submit(&student, event.id, rating(4)).await,
        Err(CampusError::Conflict(ConflictReason::NotAttended))
    );
}

#[tokio::test]
async fn test_exactly_one_feedback_after_check_in() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;

    ctx.attend(&student, event.id).await;

    let feedback = ctx.services.feedback.submit(&student, event.id, rating(5)).await.unwrap();
    assert_eq!(feedback.rating, 5);
    assert_eq!(feedback.comment.as_deref(), Some("Great session"));

    assert_matches!(
        ctx.services.feedback.submit(&student, event.id, rating(3)).await,
        Err(CampusError::Conflict(ConflictReason::Duplicate))
    );

    let listed = ctx.services.feedback.event_feedback(&ctx.organizer, event.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    let event = ctx.reload_event(event.id).await;
    assert_eq!(event.attended_count, 1);
    assert_eq!(event.registered_count, 1);
}

#[tokio::test]
async fn test_rating_out_of_range_is_validation() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;

    for value in [0, 6, -1] {
        assert_matches!(
            ctx.services.feedback.submit(&student, event.id, rating(value)).await,
            Err(CampusError::Validation(_))
        );
    }
}

#[tokio::test]
async fn test_blank_comment_is_stored_as_absent() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;
    ctx.attend(&student, event.id).await;

    let feedback = ctx
        .services
        .feedback
        .submit(&student, event.id, SubmitFeedbackRequest { rating: 3, comment: Some("   ".to_string()) })
        .await
        .unwrap();
    assert!(feedback.comment.is_none());
}

#[tokio::test]
async fn test_tenant_feedback_listing_filters_by_event() {
    let ctx = TestContext::new().await;
    let south = ctx.add_college("South Campus").await;
    let outsider = ctx.user_in(south.id, Role::Faculty).await;
    let student = ctx.student().await;
    let admin = ctx.admin().await;
    let first = ctx.event(10).await;
    let second = ctx.event(10).await;

    for event in [&first, &second] {
        ctx.attend(&student, event.id).await;
        ctx.services.feedback.submit(&student, event.id, rating(4)).await.unwrap();
    }

    let everything = ctx.services.feedback.all_feedback(&admin, None).await.unwrap();
    assert_eq!(everything.len(), 2);
    assert!(everything[0].created_at >= everything[1].created_at);

    let narrowed = ctx.services.feedback.all_feedback(&admin, Some(first.id)).await.unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].event_id, first.id);

    assert!(ctx.services.feedback.all_feedback(&outsider, None).await.unwrap().is_empty());
    assert!(ctx.services.feedback.all_feedback(&outsider, Some(first.id)).await.unwrap().is_empty());
    assert_matches!(
        ctx.services.feedback.all_feedback(&student, None).await,
        Err(CampusError::Forbidden(_))
    );
}

#[tokio::test]
async fn test_feedback_on_deleted_event_is_not_attended() {
    let ctx = TestContext::new().await;
    let student = ctx.student().await;
    let event = ctx.event(10).await;
    ctx.attend(&student, event.id).await;

    ctx.services.catalog.delete_event(&ctx.organizer, event.id).await.unwrap();

    assert_matches!(
        ctx.services.feedback.submit(&student, event.id, rating(5)).await,
        Err(CampusError::Conflict(ConflictReason::NotAttended))
    );
}
