//! End-to-end tests for the reply policy.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use qamatch_lifecycle::{
    ChatId, ChatKind, Decision, DeletionScheduler, DeliveryError, HandleOutcome, InboundMessage,
    LifecycleConfig, MessageHandler, MessageId, NoReplyReason, PendingDeletion, ReplySender,
};
use qamatch_matcher::{
    Corpus, Embedding, EmbeddingCacheStore, EmbeddingError, EmbeddingProvider, QaEntry, QaService,
};

/// Maps a handful of texts to 2-d vectors and records every text it sees.
struct TableProvider {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl TableProvider {
    fn last_seen(&self) -> Option<String> {
        self.seen.lock().ok().and_then(|seen| seen.last().cloned())
    }
}

#[async_trait]
impl EmbeddingProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    fn model(&self) -> &str {
        "table-model"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(text.to_string());
        }
        match text.trim() {
            "How do I reset my password?" | "reset password" => Ok(vec![1.0, 0.0]),
            "Where are the logs?" => Ok(vec![0.0, 1.0]),
            "weather today" => Ok(vec![-1.0, 0.0]),
            other => Err(EmbeddingError::InvalidResponse(format!("unexpected {other}"))),
        }
    }
}

#[derive(Default)]
struct RecordingScheduler {
    scheduled: Mutex<Vec<PendingDeletion>>,
}

impl RecordingScheduler {
    fn scheduled(&self) -> Vec<PendingDeletion> {
        self.scheduled.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DeletionScheduler for RecordingScheduler {
    fn schedule(&self, deletion: PendingDeletion) {
        if let Ok(mut scheduled) = self.scheduled.lock() {
            scheduled.push(deletion);
        }
    }
}

struct FakeTransport {
    next_id: AtomicI32,
    fail: bool,
    sent: Mutex<Vec<(ChatId, MessageId, String)>>,
}

impl FakeTransport {
    fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn sent(&self) -> Vec<(ChatId, MessageId, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReplySender for FakeTransport {
    async fn send_reply(
        &self,
        chat_id: ChatId,
        reply_to: MessageId,
        text: &str,
    ) -> qamatch_lifecycle::Result<MessageId> {
        if self.fail {
            return Err(DeliveryError::PermissionDenied("muted".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((chat_id, reply_to, text.to_string()));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

struct Harness {
    handler: MessageHandler,
    scheduler: Arc<RecordingScheduler>,
    provider: Arc<TableProvider>,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(TableProvider {
        calls: AtomicUsize::new(0),
        seen: Mutex::new(Vec::new()),
    });
    let cache = EmbeddingCacheStore::new(dir.path(), provider.model());
    let corpus = Corpus::from_entries(vec![
        QaEntry::new("How do I reset my password?", "Use the <pre>reset</pre> link."),
        QaEntry::new("Where are the logs?", "In /var/log."),
    ]);
    let service = QaService::initialize(corpus, provider.clone(), &cache, 0.7).await;
    provider.calls.store(0, Ordering::SeqCst);

    let scheduler = Arc::new(RecordingScheduler::default());
    let config = LifecycleConfig::default()
        .with_delete_delay(Duration::from_secs(600))
        .with_message_timeout(Duration::from_secs(300));
    let handler = MessageHandler::new(Arc::new(service), config, scheduler.clone());

    Harness {
        handler,
        scheduler,
        provider,
        _dir: dir,
    }
}

fn message(kind: ChatKind, text: &str, age_secs: i64) -> InboundMessage {
    InboundMessage {
        message_id: 7,
        chat_id: match kind {
            ChatKind::Group => -100,
            ChatKind::Private => 42,
        },
        chat_kind: kind,
        text: text.to_string(),
        timestamp: Utc::now() - TimeDelta::seconds(age_secs),
        username: Some("alice".to_string()),
    }
}

#[tokio::test]
async fn test_group_match_replies_once_and_schedules_one_deletion() {
    let h = harness().await;
    let transport = FakeTransport::new();

    let outcome = h
        .handler
        .handle(&message(ChatKind::Group, "reset password", 0), Utc::now(), &transport)
        .await;

    let expected_deletion = PendingDeletion {
        chat_id: -100,
        message_id: 1000,
        delay: Duration::from_secs(600),
    };
    assert_eq!(
        outcome,
        HandleOutcome::Replied {
            message_id: 1000,
            deletion: Some(expected_deletion.clone()),
        }
    );
    assert_eq!(
        transport.sent(),
        vec![(
            -100,
            7,
            "<blockquote expandable>Use the reset link.</blockquote>".to_string()
        )]
    );
    assert_eq!(h.scheduler.scheduled(), vec![expected_deletion]);
}

#[tokio::test]
async fn test_private_match_is_not_deleted() {
    let h = harness().await;
    let transport = FakeTransport::new();

    let outcome = h
        .handler
        .handle(&message(ChatKind::Private, "Where are the logs?", 0), Utc::now(), &transport)
        .await;

    assert_eq!(
        outcome,
        HandleOutcome::Replied {
            message_id: 1000,
            deletion: None,
        }
    );
    assert_eq!(transport.sent().len(), 1);
    assert!(h.scheduler.scheduled().is_empty());
}

#[tokio::test]
async fn test_group_no_match_is_silent() {
    let h = harness().await;
    let transport = FakeTransport::new();

    let outcome = h
        .handler
        .handle(&message(ChatKind::Group, "weather today", 0), Utc::now(), &transport)
        .await;

    assert_eq!(
        outcome,
        HandleOutcome::Ignored {
            reason: NoReplyReason::NoMatch
        }
    );
    assert!(transport.sent().is_empty());
    assert!(h.scheduler.scheduled().is_empty());
}

#[tokio::test]
async fn test_private_no_match_gets_fallback() {
    let h = harness().await;

    let decision = h
        .handler
        .decide(&message(ChatKind::Private, "weather today", 0), Utc::now())
        .await;

    assert_eq!(
        decision,
        Decision::Reply {
            text: qamatch_lifecycle::config::DEFAULT_FALLBACK_REPLY.to_string()
        }
    );
}

#[tokio::test]
async fn test_stale_message_is_dropped_before_matching() {
    let h = harness().await;
    let transport = FakeTransport::new();

    let outcome = h
        .handler
        .handle(&message(ChatKind::Private, "reset password", 301), Utc::now(), &transport)
        .await;

    assert_eq!(
        outcome,
        HandleOutcome::Ignored {
            reason: NoReplyReason::Stale
        }
    );
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_message_at_timeout_is_still_answered() {
    let h = harness().await;
    let now = Utc::now();
    let mut msg = message(ChatKind::Group, "reset password", 0);
    msg.timestamp = now - TimeDelta::seconds(300);

    let decision = h.handler.decide(&msg, now).await;
    assert!(matches!(decision, Decision::ReplyAndDelete { .. }));
}

#[tokio::test]
async fn test_blank_text_is_ignored() {
    let h = harness().await;

    let decision = h
        .handler
        .decide(&message(ChatKind::Private, "   ", 0), Utc::now())
        .await;

    assert_eq!(
        decision,
        Decision::NoReply {
            reason: NoReplyReason::EmptyText
        }
    );
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_query_reaches_provider_unmodified() {
    let h = harness().await;

    let decision = h
        .handler
        .decide(&message(ChatKind::Private, "  reset password\n", 0), Utc::now())
        .await;

    assert_eq!(h.provider.last_seen().as_deref(), Some("  reset password\n"));
    assert!(matches!(decision, Decision::Reply { .. }));
}

#[tokio::test]
async fn test_send_failure_schedules_nothing() {
    let h = harness().await;
    let transport = FakeTransport::failing();

    let outcome = h
        .handler
        .handle(&message(ChatKind::Group, "reset password", 0), Utc::now(), &transport)
        .await;

    assert_eq!(outcome, HandleOutcome::SendFailed);
    assert!(h.scheduler.scheduled().is_empty());
}
