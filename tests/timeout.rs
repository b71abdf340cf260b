//! Timeout Integration Tests
//!
//! The voice step is optional: it must never slow a request past its
//! budget or fail it, and timed-out attempts must be cancelled.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{capture_of, FakeSpeech, Harness};
use snapdex::core::{Disposition, VoiceSynthesizer};
use snapdex::domain::VoiceStatus;
use snapdex::store::DocumentStore;

/// Wait for a background abort to land
async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn test_hanging_voice_does_not_block_entry() {
    let harness = Harness::new().with_speech(FakeSpeech::hanging());
    let orchestrator = harness.orchestrator_with_budget(Duration::from_millis(150));

    let started = Instant::now();
    let outcome = orchestrator.run(&capture_of("Mug"), None).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.disposition, Disposition::Created);
    assert!(!outcome.entry.has_voice());
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);

    let stored = harness.store.get_entry(outcome.entry.id()).await.unwrap().unwrap();
    assert!(!stored.has_voice());
}

#[tokio::test]
async fn test_timed_out_voice_attempt_is_cancelled() {
    let speech = Arc::new(FakeSpeech::hanging());
    let synthesizer = VoiceSynthesizer::new(speech.clone(), Duration::from_millis(50));

    assert!(synthesizer.synthesize("A red mug.").await.is_none());
    assert!(eventually(|| speech.was_cancelled()).await);
    assert_eq!(speech.submission_count(), 0);
}

#[tokio::test]
async fn test_dropped_request_cancels_voice_attempt() {
    let speech = Arc::new(FakeSpeech::hanging());
    let synthesizer = VoiceSynthesizer::new(speech.clone(), Duration::from_secs(30));

    // The caller gives up long before the voice budget
    let result =
        tokio::time::timeout(Duration::from_millis(50), synthesizer.synthesize("A fern.")).await;
    assert!(result.is_err());

    assert!(eventually(|| speech.was_cancelled()).await);
}

#[tokio::test]
async fn test_voice_failure_degrades() {
    let harness = Harness::new().with_speech(FakeSpeech {
        fail_login: true,
        ..FakeSpeech::new()
    });

    let outcome = harness
        .orchestrator()
        .run(&capture_of("Mug"), None)
        .await
        .unwrap();

    assert_eq!(outcome.disposition, Disposition::Created);
    assert!(outcome.entry.inference_job_token.is_none());
    assert!(outcome.entry.voice_url.is_none());
    assert!(outcome.entry.voice_status.is_none());
}

#[tokio::test]
async fn test_synchronous_audio_fills_voice_url() {
    let harness = Harness::new().with_speech(FakeSpeech {
        audio_path: Some("/media/a/b/mug.wav".to_string()),
        ..FakeSpeech::new()
    });

    let entry = harness
        .orchestrator()
        .run(&capture_of("Mug"), None)
        .await
        .unwrap()
        .entry;

    assert_eq!(entry.inference_job_token.as_deref(), Some("jinf_1"));
    assert_eq!(entry.voice_status, Some(VoiceStatus::CompleteSuccess));
    assert_eq!(
        entry.voice_url.as_deref(),
        Some("https://storage.googleapis.com/vocodes-public/media/a/b/mug.wav")
    );
}

#[tokio::test]
async fn test_each_submission_has_fresh_idempotency_token() {
    let speech = Arc::new(FakeSpeech::new());
    let synthesizer = VoiceSynthesizer::new(speech.clone(), Duration::from_secs(1));

    synthesizer.synthesize("A mug.").await.unwrap();
    synthesizer.synthesize("A mug.").await.unwrap();

    let submissions = speech.submissions.lock().unwrap().clone();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].0, "A mug.");
    assert_ne!(submissions[0].1, submissions[1].1);
    assert!(uuid::Uuid::parse_str(&submissions[0].1).is_ok());
}

#[test]
fn test_default_voice_budget() {
    let synthesizer = VoiceSynthesizer::new(
        Arc::new(FakeSpeech::new()),
        Duration::from_millis(snapdex::config::DEFAULT_VOICE_TIMEOUT_MS),
    );
    assert_eq!(synthesizer.budget(), Duration::from_millis(4500));
}
