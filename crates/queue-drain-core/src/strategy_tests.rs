//! Tests for the queue access strategies.

use super::*;
use mockall::Sequence;
use queue_drain_runtime::{InMemoryQueueService, MockQueueService};

fn address(raw: &str) -> QueueAddress {
    raw.parse().unwrap()
}

fn seeded_service(source: &QueueAddress, bodies: &[&str]) -> InMemoryQueueService {
    let service = InMemoryQueueService::new();
    service.create_queue(source);
    for body in bodies {
        service
            .enqueue_direct(source, RawMessage::new(body.as_bytes().to_vec()))
            .unwrap();
    }
    service
}

// ============================================================================
// CursorStrategy
// ============================================================================

#[tokio::test]
async fn cursor_peeks_current_first_then_next() {
    let mut service = MockQueueService::new();
    let mut seq = Sequence::new();
    service
        .expect_create_cursor()
        .times(1)
        .returning(|_| Ok(CursorId::new(1)));
    service
        .expect_peek()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|_, _, mode, _| *mode == PeekMode::Current)
        .returning(|_, _, _, _| Ok(RawMessage::new(b"first".to_vec())));
    service
        .expect_peek()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|_, _, mode, _| *mode == PeekMode::Next)
        .returning(|_, _, _, timeout| Err(QueueError::Timeout { duration: timeout }));

    let mut strategy = CursorStrategy::new(Arc::new(service), address("src"))
        .await
        .unwrap();
    assert!(strategy.get_next().await.unwrap().is_some());
    assert!(strategy.get_next().await.unwrap().is_none());
}

#[tokio::test]
async fn cursor_treats_missing_queue_as_empty() {
    let mut service = MockQueueService::new();
    service
        .expect_create_cursor()
        .returning(|_| Ok(CursorId::new(1)));
    service.expect_peek().returning(|queue, _, _, _| {
        Err(QueueError::QueueNotFound {
            queue: queue.to_string(),
        })
    });

    let mut strategy = CursorStrategy::new(Arc::new(service), address("gone"))
        .await
        .unwrap();
    assert!(strategy.get_next().await.unwrap().is_none());
}

#[tokio::test]
async fn cursor_propagates_fatal_failures() {
    let mut service = MockQueueService::new();
    service
        .expect_create_cursor()
        .returning(|_| Ok(CursorId::new(1)));
    service.expect_peek().returning(|_, _, _, _| {
        Err(QueueError::ServiceFailure {
            message: "connection lost".to_string(),
        })
    });

    let mut strategy = CursorStrategy::new(Arc::new(service), address("src"))
        .await
        .unwrap();
    assert!(matches!(
        strategy.get_next().await,
        Err(QueueError::ServiceFailure { .. })
    ));
}

#[tokio::test]
async fn cursor_delete_removes_only_the_named_message() {
    let source = address("src");
    let service = seeded_service(&source, &["a", "b"]);
    let mut strategy = CursorStrategy::new(Arc::new(service.clone()), source.clone())
        .await
        .unwrap();

    strategy.begin_batch().await.unwrap();
    let first = strategy.get_next().await.unwrap().unwrap();
    strategy.delete(&first.id).await.unwrap();
    strategy.commit_batch().await.unwrap();

    // The walk continues past the removed message.
    strategy.begin_batch().await.unwrap();
    let second = strategy.get_next().await.unwrap().unwrap();
    assert_eq!(&second.body[..], b"b");
    strategy.commit_batch().await.unwrap();
    strategy.release().await.unwrap();

    let remaining = service.queue_contents(&source).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(&remaining[0].body[..], b"b");
}

#[tokio::test]
async fn cursor_delete_of_already_consumed_message_is_ignored() {
    let source = address("src");
    let service = seeded_service(&source, &["a"]);
    let mut strategy = CursorStrategy::new(Arc::new(service.clone()), source.clone())
        .await
        .unwrap();

    strategy.begin_batch().await.unwrap();
    let message = strategy.get_next().await.unwrap().unwrap();

    // A competing consumer takes the message out from under the cursor.
    let txn = service.begin_transaction().await.unwrap();
    service
        .receive_by_id(&source, &message.id, txn)
        .await
        .unwrap();
    service.commit(txn).await.unwrap();

    strategy.delete(&message.id).await.unwrap();
    strategy.commit_batch().await.unwrap();
}

#[tokio::test]
async fn cursor_return_leaves_the_message_in_place() {
    let source = address("src");
    let service = seeded_service(&source, &["a"]);
    let mut strategy = CursorStrategy::new(Arc::new(service.clone()), source.clone())
        .await
        .unwrap();

    strategy.begin_batch().await.unwrap();
    let message = strategy.get_next().await.unwrap().unwrap();
    let id = message.id.clone();
    strategy.return_message(message).await.unwrap();
    strategy.commit_batch().await.unwrap();
    strategy.release().await.unwrap();

    let remaining = service.queue_contents(&source).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, id);
}

// ============================================================================
// ReceiveStrategy
// ============================================================================

#[tokio::test]
async fn receive_get_next_takes_the_message_off_the_queue() {
    let source = address("src");
    let service = seeded_service(&source, &["a"]);
    let mut strategy = ReceiveStrategy::new(Arc::new(service.clone()), source.clone());

    strategy.begin_batch().await.unwrap();
    assert!(strategy.get_next().await.unwrap().is_some());
    assert!(service.queue_contents(&source).unwrap().is_empty());
    strategy.commit_batch().await.unwrap();
}

#[tokio::test]
async fn receive_undo_without_sends_restores_original_identity() {
    let source = address("src");
    let service = seeded_service(&source, &["a", "b"]);
    let mut strategy = ReceiveStrategy::new(Arc::new(service.clone()), source.clone());

    strategy.begin_batch().await.unwrap();
    let message = strategy.get_next().await.unwrap().unwrap();
    let original_id = message.id.clone();
    strategy.undo_get_next(message).await.unwrap();

    let contents = service.queue_contents(&source).unwrap();
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[0].id, original_id, "back at the front");
}

#[tokio::test]
async fn receive_undo_after_sends_commits_instead_of_rolling_back() {
    let source = address("src");
    let service = seeded_service(&source, &["a", "b"]);
    let mut strategy = ReceiveStrategy::new(Arc::new(service.clone()), source.clone());

    strategy.begin_batch().await.unwrap();
    let first = strategy.get_next().await.unwrap().unwrap();
    let first_id = first.id.clone();
    strategy.return_message(first).await.unwrap();

    let second = strategy.get_next().await.unwrap().unwrap();
    strategy.undo_get_next(second).await.unwrap();

    // Both messages survive; the earlier return was not rolled back, so
    // both came back through sends with fresh identifiers.
    let contents = service.queue_contents(&source).unwrap();
    assert_eq!(contents.len(), 2);
    assert!(contents.iter().all(|m| m.id != first_id));
    assert_eq!(&contents[0].body[..], b"a");
    assert_eq!(&contents[1].body[..], b"b");
}

#[tokio::test]
async fn receive_release_aborts_an_open_batch() {
    let source = address("src");
    let service = seeded_service(&source, &["a"]);
    let mut strategy = ReceiveStrategy::new(Arc::new(service.clone()), source.clone());

    strategy.begin_batch().await.unwrap();
    let message = strategy.get_next().await.unwrap().unwrap();
    let id = message.id.clone();
    drop(message);
    strategy.release().await.unwrap();

    let contents = service.queue_contents(&source).unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].id, id);
}

// ============================================================================
// Factory
// ============================================================================

#[tokio::test]
async fn factory_builds_both_kinds() {
    let source = address("src");
    let service = seeded_service(&source, &[]);

    for kind in [StrategyKind::Cursor, StrategyKind::Receive] {
        let mut strategy = create_strategy(kind, Arc::new(service.clone()), source.clone())
            .await
            .unwrap();
        strategy.begin_batch().await.unwrap();
        assert!(strategy.get_next().await.unwrap().is_none());
        strategy.commit_batch().await.unwrap();
        strategy.release().await.unwrap();
    }
}

#[test]
fn strategy_kind_defaults_to_cursor() {
    assert_eq!(StrategyKind::default(), StrategyKind::Cursor);
}
