// ABOUTME: Tests for resource claim semantics.
// ABOUTME: Covers blocking and non-blocking acquire, checked release, and wake-up order.

use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_err, assert_ok};

use super::resource::{HolderId, Resource};
use crate::error::ResourceError;

const A: HolderId = HolderId(1);
const B: HolderId = HolderId(2);

#[tokio::test]
async fn test_acquire_succeeds_when_free() {
    let resource = Resource::new(0);
    assert!(resource.acquire(A, false).await);
    assert_eq!(resource.holder(), Some(A));
    assert!(resource.is_held());
}

#[tokio::test]
async fn test_non_blocking_acquire_fails_when_held() {
    let resource = Resource::new(0);
    assert!(resource.acquire(A, true).await);

    assert!(!resource.acquire(B, false).await);
    // The failed attempt leaves ownership untouched
    assert_eq!(resource.holder(), Some(A));
    assert_eq!(resource.acquisitions(), 1);
}

#[tokio::test]
async fn test_non_blocking_acquire_is_not_reentrant() {
    let resource = Resource::new(0);
    assert!(resource.acquire(A, false).await);
    assert!(!resource.acquire(A, false).await);
}

#[tokio::test]
async fn test_release_then_acquire_by_another() {
    let resource = Resource::new(3);
    assert!(resource.acquire(A, true).await);
    assert_ok!(resource.release(A));
    assert!(!resource.is_held());

    assert!(resource.acquire(B, false).await);
    let claim = resource.claim().expect("claim should exist");
    assert_eq!(claim.resource_id, 3);
    assert_eq!(claim.holder, B);
}

#[tokio::test]
async fn test_release_never_acquired_is_not_held_error() {
    let resource = Resource::new(4);
    let err = assert_err!(resource.release(A));
    assert_eq!(
        err,
        ResourceError::NotHeld {
            resource_id: 4,
            requester: A,
        }
    );
}

#[tokio::test]
async fn test_release_by_non_owner_fails() {
    let resource = Resource::new(1);
    assert!(resource.acquire(A, true).await);

    match resource.release(B).unwrap_err() {
        ResourceError::NotOwner {
            resource_id,
            owner,
            requester,
        } => {
            assert_eq!(resource_id, 1);
            assert_eq!(owner, A);
            assert_eq!(requester, B);
        }
        other => panic!("Expected NotOwner, got {:?}", other),
    }

    // Still held by the rightful owner
    assert_eq!(resource.holder(), Some(A));
}

#[tokio::test]
async fn test_double_release_fails() {
    let resource = Resource::new(0);
    assert!(resource.acquire(A, true).await);
    assert_ok!(resource.release(A));
    assert!(matches!(
        resource.release(A),
        Err(ResourceError::NotHeld { .. })
    ));
    assert_eq!(resource.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_blocking_acquire_waits_for_release() {
    let resource = Arc::new(Resource::new(0));
    assert!(resource.acquire(A, true).await);

    let waiter = {
        let resource = resource.clone();
        tokio::spawn(async move { resource.acquire(B, true).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "waiter should still be blocked");

    assert_ok!(resource.release(A));
    assert!(waiter.await.unwrap());
    assert_eq!(resource.holder(), Some(B));
}

#[tokio::test(start_paused = true)]
async fn test_release_wakes_one_waiter() {
    let resource = Arc::new(Resource::new(0));
    assert!(resource.acquire(HolderId(0), true).await);

    let mut waiters = Vec::new();
    for i in 1..=2 {
        let resource = resource.clone();
        waiters.push(tokio::spawn(async move {
            resource.acquire(HolderId(i), true).await
        }));
        // Let each waiter queue up in order
        tokio::task::yield_now().await;
    }

    assert_ok!(resource.release(HolderId(0)));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The longest waiter wins, the other keeps waiting
    assert_eq!(resource.holder(), Some(HolderId(1)));
    assert!(waiters[0].is_finished());
    assert!(!waiters[1].is_finished());

    assert_ok!(resource.release(HolderId(1)));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(resource.holder(), Some(HolderId(2)));
}

#[tokio::test]
async fn test_concurrent_non_blocking_acquire() {
    let resource = Arc::new(Resource::new(0));
    let mut handles = Vec::new();

    for i in 0..10 {
        let resource = resource.clone();
        handles.push(tokio::spawn(async move {
            resource.acquire(HolderId(i), false).await
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        if handle.await.unwrap() {
            success_count += 1;
        }
    }

    assert_eq!(success_count, 1, "Exactly one holder should win the claim");
    assert_eq!(resource.acquisitions(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exclusion_under_parallel_contention() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let resource = Arc::new(Resource::new(0));
    let inside = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();

    for i in 0..8 {
        let resource = resource.clone();
        let inside = inside.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..50 {
                assert!(resource.acquire(HolderId(i), true).await);
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                assert_eq!(now, 1, "two holders inside at once");
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
                resource.release(HolderId(i)).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(resource.acquisitions(), 400);
    assert_eq!(resource.releases(), 400);
    assert!(!resource.is_held());
}

#[tokio::test]
async fn test_is_held_agrees_with_holder_during_handoff() {
    let resource = Arc::new(Resource::new(0));
    assert!(resource.acquire(A, true).await);

    let waiter = {
        let resource = resource.clone();
        tokio::spawn(async move { resource.acquire(B, true).await })
    };
    tokio::task::yield_now().await;
    assert!(resource.is_held());
    assert_eq!(resource.holder(), Some(A));

    // The permit now belongs to B's pending claim, which has not run yet
    assert_ok!(resource.release(A));
    assert!(!resource.is_held());
    assert_eq!(resource.holder(), None);

    assert!(waiter.await.unwrap());
    assert!(resource.is_held());
    assert_eq!(resource.holder(), Some(B));
}

#[test]
fn test_resource_error_display() {
    let err = ResourceError::NotHeld {
        resource_id: 2,
        requester: HolderId(7),
    };
    assert!(err.to_string().contains("agent-7"));
    assert!(err.to_string().contains("not held"));

    let err = ResourceError::NotOwner {
        resource_id: 2,
        owner: HolderId(1),
        requester: HolderId(7),
    };
    assert!(err.to_string().contains("agent-1"));
    assert!(err.to_string().contains("agent-7"));
}
