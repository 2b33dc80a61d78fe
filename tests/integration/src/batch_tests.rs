//! Bounded batch execution tests against the speech gateway

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_gateway::*;
use broker_core::BrokerError;
use broker_sdk::{segment_file_name, BatchExecutor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn speech_config(inference: &MockGateway, speech: &MockGateway, limit: usize) -> broker_config::GatewayConfig {
    broker_config::GatewayConfig {
        max_concurrent_requests: limit,
        ..with_speech(test_config(&inference.url()), &speech.url())
    }
}

#[tokio::test]
async fn test_batch_speech_respects_concurrency_limit() {
    let inference = MockGateway::new().await;
    let speech = MockGateway::new().await;
    speech.mock_speech(b"ID3-segment", Duration::from_millis(50)).await;

    let broker = connect(speech_config(&inference, &speech, 2)).await;
    let gateway = broker.speech().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let paths = gateway
        .synthesize_batch(&narration(5), &voices(5), dir.path())
        .await
        .unwrap()
        .into_all_ok()
        .unwrap();

    assert_eq!(paths.len(), 5);
    for (index, file) in paths.iter().enumerate() {
        assert_eq!(file, &dir.path().join(segment_file_name(index)));
        assert_eq!(std::fs::read(file).unwrap(), b"ID3-segment");
    }
    assert_eq!(speech.calls(SPEECH_PATH).await, 5);
    assert!(gateway.batch_executor().gate().peak_in_flight() <= 2);
    assert_eq!(gateway.batch_executor().gate().active_requests(), 0);
}

#[tokio::test]
async fn test_batch_speech_reports_partial_failure() {
    let inference = MockGateway::new().await;
    let speech = MockGateway::new().await;
    speech.mock_speech_rejecting("number 3").await;
    speech.mock_speech(b"ok", Duration::ZERO).await;

    let broker = connect(speech_config(&inference, &speech, 3)).await;
    let dir = tempfile::tempdir().unwrap();

    let report = broker
        .speech()
        .unwrap()
        .synthesize_batch(&narration(5), &voices(5), dir.path())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.results()[3],
        Err(BrokerError::Api { status: 400, .. })
    ));
    assert!(!dir.path().join(segment_file_name(3)).exists());
    assert!(dir.path().join(segment_file_name(4)).exists());

    match report.into_all_ok() {
        Err(BrokerError::BatchPartialFailure { failed, total }) => assert_eq!((failed, total), (1, 5)),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_speech_cancellation() {
    let inference = MockGateway::new().await;
    let speech = MockGateway::new().await;
    speech.mock_speech(b"slow", Duration::from_millis(300)).await;

    let broker = connect(speech_config(&inference, &speech, 1)).await;
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = broker
        .speech()
        .unwrap()
        .synthesize_batch_cancellable(&narration(3), &voices(3), None, dir.path(), &cancel, |_, _| {})
        .await
        .unwrap();

    assert_eq!(report.len(), 3);
    assert!(report
        .results()
        .iter()
        .all(|r| matches!(r, Err(BrokerError::Cancelled))));
}

#[tokio::test]
async fn test_executor_bounds_arbitrary_jobs() {
    let executor = BatchExecutor::new(2);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let report = executor
        .run((0..5).collect::<Vec<u64>>(), |job| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30 * (5 - job.input))).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(job.input * 2)
            }
        })
        .await;

    assert_eq!(report.into_all_ok().unwrap(), vec![0, 2, 4, 6, 8]);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}
