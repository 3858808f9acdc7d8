//! Concurrent registration storms against one event

mod helpers;

use futures::future::join_all;
use campus_events::models::*;
use campus_events::{CampusError, ConflictReason, Result};
use helpers::*;

async fn storm(ctx: &TestContext, students: Vec<Actor>, event_id: i64) -> Vec<Result<Registration>> {
    let handles = students.into_iter().map(|student| {
        let services = ctx.services.clone();
        tokio::spawn(async move { services.ledger.register(&student, event_id).await })
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("registration task panicked"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_overbooking_under_concurrent_registration() {
    let ctx = TestContext::new().await;
    let capacity = 7;
    let event = ctx.event(capacity).await;
    let students = ctx.students(40).await;

    let results = storm(&ctx, students, event.id).await;

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let full = results
        .iter()
        .filter(|result| matches!(result, Err(CampusError::Conflict(ConflictReason::Full))))
        .count();
    assert_eq!(successes, capacity as usize);
    assert_eq!(full, results.len() - capacity as usize);

    let event = ctx.reload_event(event.id).await;
    assert_eq!(event.registered_count, capacity);
    ctx.assert_counters_consistent().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remaining_capacity_is_respected() {
    let ctx = TestContext::new().await;
    let event = ctx.event(10).await;

    for student in ctx.students(6).await {
        ctx.services.ledger.register(&student, event.id).await.unwrap();
    }

    let results = storm(&ctx, ctx.students(15).await, event.id).await;
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 4);
    assert_eq!(ctx.reload_event(event.id).await.registered_count, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_student_racing_gets_one_registration() {
    let ctx = TestContext::new().await;
    let event = ctx.event(50).await;
    let student = ctx.student().await;

    let results = storm(&ctx, vec![student; 12], event.id).await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|error| matches!(error, CampusError::Conflict(ConflictReason::Duplicate))));
    assert_eq!(ctx.reload_event(event.id).await.registered_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_register_cancel_and_check_in_keep_counters_exact() {
    let ctx = TestContext::new().await;
    let event = ctx.event(20).await;
    let students = ctx.students(20).await;

    let mut registrations = Vec::new();
    for student in &students {
        registrations.push(ctx.services.ledger.register(student, event.id).await.unwrap());
    }

    let mut handles = Vec::new();
    for (index, (student, registration)) in students.iter().copied().zip(registrations).enumerate() {
        let services = ctx.services.clone();
        let organizer = ctx.organizer;
        handles.push(tokio::spawn(async move {
            if index % 2 == 0 {
                services.ledger.cancel(&student, event.id).await.map(|_| ())
            } else {
                services.attendance.check_in(&organizer, registration.id).await.map(|_| ())
            }
        }));
    }
    for joined in join_all(handles).await {
        joined.expect("task panicked").expect("operation succeeds");
    }

    let event = ctx.reload_event(event.id).await;
    assert_eq!(event.registered_count, 10);
    assert_eq!(event.attended_count, 10);
    ctx.assert_counters_consistent().await;

    let refill = storm(&ctx, ctx.students(15).await, event.id).await;
    assert_eq!(refill.iter().filter(|result| result.is_ok()).count(), 10);
    assert_eq!(ctx.reload_event(event.id).await.registered_count, 20);
}
