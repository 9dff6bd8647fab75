//! Verification email handler tests.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{setup_store, test_config, wait_for_state};
use corebank_core::task::{QUEUE_CRITICAL, TASK_SEND_VERIFY_EMAIL, TaskOptions, TaskState};
use corebank_db::entities::tasks;
use corebank_db::{
    CreateUserParams, CreateUserTxParams, Store, StoreError, UpdateUserParams, VerifyEmailTxParams,
};
use corebank_shared::{EmailError, EmailMessage, ListParams, Mailer};
use corebank_worker::{
    HandlerError, HandlerRegistry, SendVerifyEmailHandler, TaskHandler, TaskProcessor,
};
use mockall::mock;
use serde_json::json;
use tokio_util::sync::CancellationToken;

mock! {
    pub Relay {}

    #[async_trait]
    impl Mailer for Relay {
        async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError>;
    }
}

const BASE_URL: &str = "https://bank.example.com";

fn capturing_relay(outbox: Arc<Mutex<Vec<EmailMessage>>>) -> MockRelay {
    let mut relay = MockRelay::new();
    relay.expect_send_email().returning(move |message| {
        outbox.lock().unwrap().push(message.clone());
        Ok(())
    });
    relay
}

fn handler(store: &Store, relay: MockRelay) -> SendVerifyEmailHandler {
    SendVerifyEmailHandler::new(store.clone(), Arc::new(relay), BASE_URL)
}

/// Extracts `(email_id, secret_code)` from the mailed link.
fn parse_link(body: &str) -> (i64, String) {
    let start = body.find("email_id=").expect("body contains link");
    let query = body[start..].split_whitespace().next().unwrap();
    let (id, code) = query
        .strip_prefix("email_id=")
        .unwrap()
        .split_once("&secret_code=")
        .unwrap();
    (id.parse().unwrap(), code.to_string())
}

/// Signs a user up; call before the processor starts so the task is still queued.
async fn register(store: &Store, username: &str) -> tasks::Model {
    store
        .create_user_tx(CreateUserTxParams {
            user: CreateUserParams {
                username: username.to_string(),
                hashed_password: "$argon2id$test_hash".to_string(),
                full_name: "Alice Doe".to_string(),
                email: format!("{username}@example.com"),
            },
            verify_email: TaskOptions::default().queue(QUEUE_CRITICAL).max_retry(5),
        })
        .await
        .unwrap();

    let queued = store
        .queries()
        .list_tasks_by_state(TaskState::Queued, ListParams::default())
        .await
        .unwrap();
    queued
        .into_iter()
        .find(|t| t.kind == TASK_SEND_VERIFY_EMAIL)
        .expect("verification task enqueued")
}

#[tokio::test]
async fn test_signup_email_link_verifies_user() {
    let store = setup_store().await;
    let outbox = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new().register(
        TASK_SEND_VERIFY_EMAIL,
        handler(&store, capturing_relay(Arc::clone(&outbox))),
    );
    let task = register(&store, "alice").await;
    let shutdown = CancellationToken::new();
    let processor = tokio::spawn(
        TaskProcessor::new(store.clone(), registry, test_config()).run(shutdown.clone()),
    );

    wait_for_state(&store, task.id, "completed").await;

    let sent = outbox.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert!(sent[0].body.contains(BASE_URL));

    let (email_id, secret_code) = parse_link(&sent[0].body);
    let verified = store
        .verify_email_tx(VerifyEmailTxParams {
            email_id,
            secret_code,
        })
        .await
        .unwrap();
    assert!(verified.user.is_email_verified);
    assert!(verified.verify_email.is_used);

    shutdown.cancel();
    processor.await.unwrap();
}

#[tokio::test]
async fn test_missing_user_skips_retry() {
    let store = setup_store().await;
    let mut relay = MockRelay::new();
    relay.expect_send_email().never();

    let task = store
        .enqueue(
            TASK_SEND_VERIFY_EMAIL,
            json!({"username": "ghost"}),
            TaskOptions::default(),
        )
        .await
        .unwrap();

    let err = handler(&store, relay).handle(&task).await.unwrap_err();
    assert!(matches!(err, HandlerError::SkipRetry(_)));
}

#[tokio::test]
async fn test_invalid_payload_skips_retry() {
    let store = setup_store().await;
    let mut relay = MockRelay::new();
    relay.expect_send_email().never();

    let task = store
        .enqueue(TASK_SEND_VERIFY_EMAIL, json!({"user": 42}), TaskOptions::default())
        .await
        .unwrap();

    let err = handler(&store, relay).handle(&task).await.unwrap_err();
    assert!(matches!(err, HandlerError::SkipRetry(msg) if msg.starts_with("invalid payload")));
}

#[tokio::test]
async fn test_already_verified_user_is_not_mailed() {
    let store = setup_store().await;
    let task = register(&store, "bob").await;
    store
        .queries()
        .update_user(
            "bob",
            UpdateUserParams {
                is_email_verified: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut relay = MockRelay::new();
    relay.expect_send_email().never();

    handler(&store, relay).handle(&task).await.unwrap();
    let records = store
        .queries()
        .list_verify_emails("bob", ListParams::default())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_permanent_mail_error_skips_retry() {
    let store = setup_store().await;
    let task = register(&store, "carol").await;

    let mut relay = MockRelay::new();
    relay
        .expect_send_email()
        .times(1)
        .returning(|_| Err(EmailError::InvalidAddress("bad mailbox".into())));

    let err = handler(&store, relay).handle(&task).await.unwrap_err();
    assert!(matches!(err, HandlerError::SkipRetry(_)));
}

#[tokio::test]
async fn test_transient_mail_failures_are_retried_with_fresh_codes() {
    let store = setup_store().await;
    let outbox = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut relay = MockRelay::new();
    {
        let outbox = Arc::clone(&outbox);
        let calls = Arc::clone(&calls);
        relay.expect_send_email().returning(move |message| {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(EmailError::SendError("connection refused".into()));
            }
            outbox.lock().unwrap().push(message.clone());
            Ok(())
        });
    }

    let registry = HandlerRegistry::new().register(TASK_SEND_VERIFY_EMAIL, handler(&store, relay));
    let task = register(&store, "dave").await;
    let shutdown = CancellationToken::new();
    let processor = tokio::spawn(
        TaskProcessor::new(store.clone(), registry, test_config()).run(shutdown.clone()),
    );

    let done = wait_for_state(&store, task.id, "completed").await;
    assert_eq!(done.retried, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Each attempt superseded the previous code
    let records = store
        .queries()
        .list_verify_emails("dave", ListParams::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|r| !r.is_used).count(), 1);

    let sent = outbox.lock().unwrap().clone();
    let (email_id, secret_code) = parse_link(&sent[0].body);
    assert_eq!(email_id, records[2].id);

    let stale = store
        .verify_email_tx(VerifyEmailTxParams {
            email_id: records[0].id,
            secret_code: secret_code.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(stale, StoreError::Verification(_)));

    store
        .verify_email_tx(VerifyEmailTxParams {
            email_id,
            secret_code,
        })
        .await
        .unwrap();

    shutdown.cancel();
    processor.await.unwrap();
}
