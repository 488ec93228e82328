//! Integration tests for join event buffering and batch delivery
//!
//! These tests verify:
//! - Batches are capped and keep insertion order
//! - Failed batches are retried with the same events
//! - A flush never overlaps another in-flight flush
//! - Events appended during a flush survive its completion

mod common;

use common::{StubHost, StubRemote, build_integration, config_with_secret};
use std::sync::Arc;
use storelink::models::PlayerKey;
use storelink::services::FlushOutcome;
use tokio::sync::Notify;
use tokio_test::{assert_pending, assert_ready_eq, task};

#[tokio::test]
async fn test_800_joins_flush_in_capped_batches() {
    let remote = Arc::new(StubRemote::healthy());
    let host = Arc::new(StubHost::new(false));
    let integration = build_integration(config_with_secret("secret"), &remote, &host);
    integration.connect().await.unwrap();

    for n in 0..800 {
        integration.player_joined(None, &format!("player{}", n), None);
    }

    assert_eq!(
        integration.flush_tick().await,
        Some(FlushOutcome::Delivered { count: 750 })
    );

    let batches = remote.recorded_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 750);
    for (n, event) in batches[0].iter().enumerate() {
        assert_eq!(event.metadata.username, format!("player{}", n));
    }

    let remaining = integration.pending_events();
    assert_eq!(remaining.len(), 50);
    assert_eq!(remaining[0].metadata.username, "player750");

    assert_eq!(
        integration.flush_tick().await,
        Some(FlushOutcome::Delivered { count: 50 })
    );
    assert!(integration.pending_events().is_empty());
    assert_eq!(integration.metrics().events_outstanding(), 0);
}

#[tokio::test]
async fn test_failed_batches_are_retried_unchanged() {
    let remote = Arc::new(StubRemote::healthy());
    let host = Arc::new(StubHost::new(false));
    let integration = build_integration(config_with_secret("secret"), &remote, &host);
    integration.connect().await.unwrap();

    for name in ["Alex", "Steve", "Herobrine"] {
        integration.player_joined(None, name, Some("10.0.0.2".to_string()));
    }
    remote.fail_next_batches(2);

    assert!(matches!(
        integration.flush_tick().await,
        Some(FlushOutcome::Failed(_))
    ));
    assert!(matches!(
        integration.flush_tick().await,
        Some(FlushOutcome::Failed(_))
    ));
    assert_eq!(integration.pending_events().len(), 3);

    assert_eq!(
        integration.flush_tick().await,
        Some(FlushOutcome::Delivered { count: 3 })
    );

    let batches = remote.recorded_batches();
    assert_eq!(batches.len(), 1);
    let names: Vec<_> = batches[0]
        .iter()
        .map(|e| e.metadata.username.as_str())
        .collect();
    assert_eq!(names, vec!["Alex", "Steve", "Herobrine"]);
    assert_eq!(batches[0][0].metadata.ip.as_deref(), Some("10.0.0.2"));
}

#[tokio::test]
async fn test_flush_with_empty_buffer_sends_nothing() {
    let remote = Arc::new(StubRemote::healthy());
    let host = Arc::new(StubHost::new(false));
    let integration = build_integration(config_with_secret("secret"), &remote, &host);
    integration.connect().await.unwrap();

    assert_eq!(integration.flush_tick().await, Some(FlushOutcome::Empty));
    assert!(remote.recorded_batches().is_empty());
}

#[tokio::test]
async fn test_second_flush_skips_while_first_in_flight() {
    let release = Arc::new(Notify::new());
    let remote = Arc::new(StubRemote::with_held_batches(Arc::clone(&release)));
    remote.set_snapshot(Some(common::snapshot("Crafters")));
    remote.set_catalog(Some(Vec::new()));
    let host = Arc::new(StubHost::new(false));
    let integration = build_integration(config_with_secret("secret"), &remote, &host);
    integration.connect().await.unwrap();

    integration.player_joined(None, "Alex", None);

    let mut first = task::spawn(integration.flush_tick());
    assert_pending!(first.poll());

    assert_eq!(integration.flush_tick().await, Some(FlushOutcome::Skipped));

    release.notify_one();
    assert_ready_eq!(first.poll(), Some(FlushOutcome::Delivered { count: 1 }));

    // The skipped flush sent nothing of its own
    assert_eq!(remote.recorded_batches().len(), 1);
    assert!(integration.pending_events().is_empty());
}

#[tokio::test]
async fn test_events_appended_mid_flight_are_kept() {
    let release = Arc::new(Notify::new());
    let remote = Arc::new(StubRemote::with_held_batches(Arc::clone(&release)));
    remote.set_snapshot(Some(common::snapshot("Crafters")));
    remote.set_catalog(Some(Vec::new()));
    let host = Arc::new(StubHost::new(false));
    let integration = build_integration(config_with_secret("secret"), &remote, &host);
    integration.connect().await.unwrap();

    integration.player_joined(None, "Alex", None);
    integration.player_joined(None, "Steve", None);

    let mut flush = task::spawn(integration.flush_tick());
    assert_pending!(flush.poll());

    integration.player_joined(None, "Herobrine", None);

    release.notify_one();
    assert_ready_eq!(flush.poll(), Some(FlushOutcome::Delivered { count: 2 }));

    let remaining = integration.pending_events();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].player_key, PlayerKey::Name("Herobrine".to_string()));
}

#[tokio::test]
async fn test_unconfigured_joins_are_buffered_until_configured() {
    let remote = Arc::new(StubRemote::healthy());
    let host = Arc::new(StubHost::new(false));
    let integration = build_integration(config_with_secret(""), &remote, &host);

    integration.player_joined(None, "Alex", None);

    assert_eq!(integration.flush_tick().await, None);
    assert_eq!(integration.pending_events().len(), 1);
    assert!(remote.recorded_batches().is_empty());

    integration.configure("secret").unwrap();
    assert_eq!(
        integration.flush_tick().await,
        Some(FlushOutcome::Delivered { count: 1 })
    );
}
