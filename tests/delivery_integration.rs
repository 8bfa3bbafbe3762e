//! Integration tests for reading delivery
//!
//! Drives a LocationService over the simulated backend and checks what the
//! subscriber and the reading cache observe under each delivery policy.

mod common;

use common::{eventually, fresh_reading, quiesce, reading, Harness, Recorder};
use geofix::{ConnectionState, Coordinate, LocationError, ServiceConfig};

/// TRACK forwards every reading in order and caches the latest
#[tokio::test]
async fn test_track_delivers_all_readings_in_order() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.start_tracking(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();

    for n in 1..=3 {
        assert!(h.backend.push_reading(reading(n)).await);
    }

    eventually(|| recorder.readings().len() == 3).await;
    assert_eq!(recorder.readings(), vec![reading(1), reading(2), reading(3)]);
    assert_eq!(h.service.current_reading(), Ok(reading(3)));
}

/// ONE_SHOT forwards only the first reading; later ones are only cached
#[tokio::test]
async fn test_one_shot_delivers_exactly_one_reading() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.request_one_shot(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();

    assert!(h.backend.push_reading(reading(1)).await);
    assert!(h.backend.push_reading(reading(2)).await);

    eventually(|| h.service.current_reading() == Ok(reading(2))).await;
    assert_eq!(recorder.readings(), vec![reading(1)]);
}

/// After the one-shot delivery the policy is NEVER: the cache keeps moving
/// but the subscriber hears nothing more
#[tokio::test]
async fn test_exhausted_one_shot_never_forwards() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.request_one_shot(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();

    for n in 1..=5 {
        assert!(h.backend.push_reading(reading(n)).await);
    }

    eventually(|| h.service.current_reading() == Ok(reading(5))).await;
    quiesce().await;
    assert_eq!(recorder.readings().len(), 1);
}

/// A new request_one_shot re-arms delivery without reconnecting
#[tokio::test]
async fn test_one_shot_can_be_rearmed() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.request_one_shot(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    assert!(h.backend.push_reading(reading(1)).await);
    eventually(|| recorder.readings().len() == 1).await;

    h.service.request_one_shot(recorder.clone()).unwrap();
    h.service.settle().await.unwrap();
    assert!(h.backend.push_reading(reading(2)).await);
    assert!(h.backend.push_reading(reading(3)).await);

    eventually(|| h.service.current_reading() == Ok(reading(3))).await;
    assert_eq!(recorder.readings(), vec![reading(1), reading(2)]);
    assert_eq!(h.backend.connect_calls(), 1);
}

/// Switching an exhausted one-shot back to tracking forwards every reading again
#[tokio::test]
async fn test_start_tracking_after_one_shot_forwards_again() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.request_one_shot(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    assert!(h.backend.push_reading(reading(1)).await);
    assert!(h.backend.push_reading(reading(2)).await);
    eventually(|| h.service.current_reading() == Ok(reading(2))).await;
    assert_eq!(recorder.readings(), vec![reading(1)]);

    h.service.start_tracking(recorder.clone()).unwrap();
    h.service.settle().await.unwrap();
    for n in 3..=5 {
        assert!(h.backend.push_reading(reading(n)).await);
    }

    eventually(|| recorder.readings().len() == 4).await;
    assert_eq!(
        recorder.readings(),
        vec![reading(1), reading(3), reading(4), reading(5)]
    );
    assert_eq!(h.backend.connect_calls(), 1);
}

/// The backend's last known reading is emitted as soon as the connection opens
#[tokio::test]
async fn test_cached_backend_reading_emitted_on_connect() {
    let h = Harness::new();
    h.backend.set_last_known(Some(reading(0)));
    let recorder = Recorder::new();

    h.service.start_tracking(recorder.clone()).unwrap();

    eventually(|| recorder.readings().len() == 1).await;
    assert_eq!(recorder.readings(), vec![reading(0)]);
    assert_eq!(h.service.current_reading(), Ok(reading(0)));
}

/// One-shot is satisfied by the cached reading alone
#[tokio::test]
async fn test_one_shot_satisfied_by_cached_reading() {
    let h = Harness::new();
    h.backend.set_last_known(Some(reading(0)));
    let recorder = Recorder::new();

    h.service.request_one_shot(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    eventually(|| recorder.readings().len() == 1).await;

    assert!(h.backend.push_reading(reading(1)).await);
    eventually(|| h.service.current_reading() == Ok(reading(1))).await;
    assert_eq!(recorder.readings(), vec![reading(0)]);
}

/// No reading before the first delivery, even while connected
#[tokio::test]
async fn test_no_location_until_first_reading() {
    let h = Harness::new();
    let recorder = Recorder::new();

    assert_eq!(h.service.current_reading(), Err(LocationError::NoLocationAvailable));

    h.service.start_tracking(recorder).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    assert_eq!(h.service.current_reading(), Err(LocationError::NoLocationAvailable));
    assert_eq!(h.service.current_coordinate(), Err(LocationError::NoLocationAvailable));

    assert!(h.backend.push_reading(fresh_reading(1.0, 2.0)).await);
    eventually(|| h.service.current_reading().is_ok()).await;
    assert_eq!(h.service.current_coordinate(), Ok(Coordinate::new(1.0, 2.0)));
}

/// The cache survives stop()
#[tokio::test]
async fn test_cache_survives_stop() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.start_tracking(recorder).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    assert!(h.backend.push_reading(reading(7)).await);
    eventually(|| h.service.current_reading().is_ok()).await;

    h.service.stop().unwrap();
    h.service.settle().await.unwrap();

    assert_eq!(h.service.current_reading(), Ok(reading(7)));
}

/// Configured fallback stands in for the coordinate only
#[tokio::test]
async fn test_fallback_coordinate() {
    let fallback = Coordinate::new(65.970738, -18.532690);
    let h = Harness::with_config(ServiceConfig::new().fallback_coordinate(fallback));

    assert_eq!(h.service.current_coordinate(), Ok(fallback));
    assert_eq!(h.service.current_reading(), Err(LocationError::NoLocationAvailable));
}

/// Starting again while connected only swaps the subscriber
#[tokio::test]
async fn test_restart_replaces_subscriber() {
    let h = Harness::new();
    let first = Recorder::new();
    let second = Recorder::new();

    h.service.start_tracking(first.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    h.service.start_tracking(second.clone()).unwrap();
    h.service.settle().await.unwrap();

    assert!(h.backend.push_reading(reading(1)).await);
    eventually(|| second.readings().len() == 1).await;

    assert!(first.readings().is_empty());
    assert_eq!(h.backend.connect_calls(), 1);
    assert_eq!(h.backend.subscribe_calls(), 1);
}

/// Readings pushed after stop() never reach the old subscriber
#[tokio::test]
async fn test_no_delivery_after_stop() {
    let h = Harness::new();
    let recorder = Recorder::new();

    h.service.start_tracking(recorder.clone()).unwrap();
    h.service.wait_for_state(ConnectionState::Connected).await.unwrap();
    h.service.stop().unwrap();
    h.service.settle().await.unwrap();

    assert!(!h.backend.push_reading(reading(1)).await);
    quiesce().await;

    assert!(recorder.readings().is_empty());
    assert!(!h.backend.is_subscribed());
    assert_eq!(h.backend.unsubscribe_calls(), 1);
}

/// The drift task feeds readings that travel through the whole pipeline
#[tokio::test]
async fn test_drift_readings_reach_subscriber() {
    let h = Harness::new();
    let recorder = Recorder::new();
    let drift = h.backend.start_drift(std::time::Duration::from_millis(10));

    h.service.start_tracking(recorder.clone()).unwrap();
    eventually(|| recorder.readings().len() >= 3).await;

    let origin = h.backend.origin();
    for r in recorder.readings() {
        assert!(geofix::GeoMath::distance_km(&origin, &r.coordinate()) < 1.0);
    }
    drift.abort();
}
