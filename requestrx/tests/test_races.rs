use requestrx::Requestor;

use crate::common::{gated_requestor, wait_until, TestError};

mod common;

#[tokio::test]
async fn test_slow_first_fast_second_keeps_the_second() {
    let (releases, requestor) = gated_requestor(2);
    let mut releases = releases.into_iter();
    let release_slow = releases.next().unwrap();
    let release_fast = releases.next().unwrap();

    let slow = requestor.execute(());
    let fast = requestor.execute(());

    release_fast.send(Ok("fast".to_string())).unwrap();
    fast.settled().await;
    assert_eq!(requestor.response(), Some("fast".to_string()));

    let slow_ticket = slow.ticket();
    release_slow.send(Ok("slow".to_string())).unwrap();
    slow.settled().await;

    let settled = requestor.snapshot();
    assert!(settled.success());
    assert_eq!(settled.response(), Some(&"fast".to_string()));
    assert!(!settled.is_current(slow_ticket));
}

#[tokio::test]
async fn test_stale_error_does_not_disturb_a_success() {
    let (releases, requestor) = gated_requestor(2);
    let mut releases = releases.into_iter();
    let release_slow = releases.next().unwrap();
    let release_fast = releases.next().unwrap();

    let slow = requestor.execute(());
    let fast = requestor.execute(());

    release_fast.send(Ok("fast".to_string())).unwrap();
    fast.settled().await;

    release_slow
        .send(Err(TestError::new(None, "slow request failed")))
        .unwrap();
    slow.settled().await;

    let settled = requestor.snapshot();
    assert!(settled.success());
    assert_eq!(settled.response(), Some(&"fast".to_string()));
    assert_eq!(settled.error(), None);
    assert!(settled.raw_error().is_none());
}

#[tokio::test]
async fn test_stale_success_does_not_disturb_an_error() {
    let (releases, requestor) = gated_requestor(2);
    let mut releases = releases.into_iter();
    let release_slow = releases.next().unwrap();
    let release_fast = releases.next().unwrap();

    let slow = requestor.execute(());
    let fast = requestor.execute(());

    release_fast
        .send(Err(TestError::new(Some("HTTP_500"), "server error")))
        .unwrap();
    fast.settled().await;

    release_slow.send(Ok("slow".to_string())).unwrap();
    slow.settled().await;

    let settled = requestor.snapshot();
    assert!(settled.state().is_error());
    assert_eq!(settled.error(), Some("HTTP_500"));
    assert_eq!(settled.response(), None);
}

#[tokio::test]
async fn test_three_overlapping_invocations_keep_only_the_last() {
    let (releases, requestor) = gated_requestor(3);
    let mut releases = releases.into_iter();
    let release_a = releases.next().unwrap();
    let release_b = releases.next().unwrap();
    let release_c = releases.next().unwrap();

    let a = requestor.execute(());
    let b = requestor.execute(());
    let c = requestor.execute(());

    release_a.send(Ok("a".to_string())).unwrap();
    a.settled().await;
    release_c.send(Ok("c".to_string())).unwrap();
    c.settled().await;
    release_b.send(Ok("b".to_string())).unwrap();
    b.settled().await;

    let settled = requestor.snapshot();
    assert!(settled.success());
    assert_eq!(settled.response(), Some(&"c".to_string()));
}

#[tokio::test]
async fn test_supersession_cancels_the_previous_token() {
    let requestor: Requestor<bool, String, TestError> = Requestor::builder()
        .call_with_context(|wait_for_abort: bool, context| async move {
            if wait_for_abort {
                context.aborted().await;
                return Err(TestError::new(Some("CANCELLED"), "superseded"));
            }
            Ok("fresh".to_string())
        })
        .build()
        .unwrap();

    let superseded = requestor.execute(true);
    wait_until(&requestor, |snapshot| snapshot.loading()).await;

    let current = requestor.execute(false);
    current.settled().await;

    // The first call only returns once its token fires, so it settling at
    // all proves the second begin cancelled it. Its error is then stale
    // and discarded.
    superseded.settled().await;

    let settled = requestor.snapshot();
    assert!(settled.success());
    assert_eq!(settled.response(), Some(&"fresh".to_string()));
    assert_eq!(settled.error(), None);
}

#[tokio::test]
async fn test_manual_response_during_flight_is_overwritten_on_settle() {
    let (releases, requestor) = gated_requestor(1);
    let release = releases.into_iter().next().unwrap();

    let invocation = requestor.execute(());
    requestor.set_response("manual".to_string());

    let manual = requestor.await_snapshot().await.unwrap();
    assert!(manual.success());
    assert_eq!(manual.response(), Some(&"manual".to_string()));

    // The invocation is still the current one, so its outcome wins.
    release.send(Ok("late".to_string())).unwrap();
    invocation.settled().await;
    assert_eq!(requestor.response(), Some("late".to_string()));
}
