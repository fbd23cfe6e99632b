use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError, RwLock};

use serde_json::Value;
use tmem_gate::{AdmissionGate, GateError, GateStatus};
use tmem_ledger::{ReplayEngine, ReplayResult};
use tmem_txn::{parse_transaction, Statement};
use tmem_types::{deep_clone, OpLog};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::SdkResult;
use crate::hooks::CommitHook;

/// An in-memory document guarded by an admission gate.
///
/// Reads run concurrently; transactions and replays of peer logs run one at
/// a time with exclusive access. Every committed log is kept in a journal
/// and handed to the registered [`CommitHook`]s.
pub struct Store {
    document: RwLock<Value>,
    gate: AdmissionGate,
    /// Serializes writers before they reach the gate, which admits only
    /// one queued writer at a time.
    writers: tokio::sync::Mutex<()>,
    /// Bounds concurrent readers to the gate's reader queue size, so a burst
    /// of reads waits here instead of overflowing the queue.
    readers: tokio::sync::Semaphore,
    journal: Mutex<VecDeque<OpLog>>,
    journal_limit: Option<usize>,
    hooks: Vec<Box<dyn CommitHook>>,
}

impl Store {
    /// Create a store around `document`.
    ///
    /// Must be called inside a tokio runtime unless the gate is disabled.
    pub fn new(document: Value, config: StoreConfig) -> Self {
        let reader_slots = config.gate.reader_queue_size_limit.max(1);
        Self {
            document: RwLock::new(document),
            gate: AdmissionGate::new(config.gate),
            writers: tokio::sync::Mutex::new(()),
            readers: tokio::sync::Semaphore::new(reader_slots),
            journal: Mutex::new(VecDeque::new()),
            journal_limit: config.journal_limit,
            hooks: Vec::new(),
        }
    }

    pub fn add_hook(&mut self, hook: Box<dyn CommitHook>) {
        self.hooks.push(hook);
    }

    /// Run `f` against the document under a reader grant.
    ///
    /// At most `reader_queue_size_limit` reads are in flight at once; further
    /// calls wait for a slot rather than failing with
    /// [`GateError::ReaderQueueFull`].
    pub async fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> SdkResult<R> {
        let _slot = self.readers.acquire().await.map_err(|_| GateError::Closed)?;
        let grant = self.gate.add_reader()?.await?;
        let result = {
            let document = self.document.read().unwrap_or_else(PoisonError::into_inner);
            f(&*document)
        };
        grant.release();
        Ok(result)
    }

    /// Deep copy of the current document.
    pub async fn snapshot(&self) -> SdkResult<Value> {
        self.read(deep_clone).await
    }

    /// Apply a transaction atomically and return its committed log.
    ///
    /// On failure the document is unchanged and nothing is journaled.
    pub async fn transact(&self, statements: &[Statement]) -> SdkResult<OpLog> {
        let _serial = self.writers.lock().await;
        let grant = self.gate.add_writer_with_info("transact")?.await?;
        let result = {
            let mut document = self.document.write().unwrap_or_else(PoisonError::into_inner);
            tmem_txn::update(&mut document, statements)
        };
        grant.release();

        let log = result?;
        self.commit(&log).await;
        Ok(log)
    }

    /// Parse a JSON transaction and apply it with [`Store::transact`].
    pub async fn transact_value(&self, transaction: &Value) -> SdkResult<OpLog> {
        let statements = parse_transaction(transaction)?;
        self.transact(&statements).await
    }

    /// Replay a log committed elsewhere, e.g. by a peer.
    ///
    /// The log's framing is checked first and the replay runs on a copy, so a
    /// log that fails to apply leaves the document unchanged.
    pub async fn apply_log(&self, log: &OpLog) -> SdkResult<ReplayResult> {
        let instructions = log.validate()?;
        let _serial = self.writers.lock().await;
        let grant = self.gate.add_writer_with_info("apply_log")?.await?;
        let result = {
            let mut document = self.document.write().unwrap_or_else(PoisonError::into_inner);
            let mut replayed = deep_clone(&document);
            let result = ReplayEngine::replay(&mut replayed, log);
            if result.is_ok() {
                *document = replayed;
            }
            result
        };
        grant.release();

        let result = result?;
        debug!(instructions, applied = result.applied, "peer log applied");
        self.commit(log).await;
        Ok(result)
    }

    /// Committed logs, oldest first.
    pub fn journal(&self) -> Vec<OpLog> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn gate_status(&self) -> GateStatus {
        self.gate.status()
    }

    async fn commit(&self, log: &OpLog) {
        {
            let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
            journal.push_back(log.clone());
            if let Some(limit) = self.journal_limit {
                while journal.len() > limit {
                    journal.pop_front();
                }
            }
        }
        for hook in &self.hooks {
            if let Err(e) = hook.on_commit(log).await {
                warn!(error = %e, "commit hook failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tmem_gate::GateConfig;
    use tmem_txn::{Guard, OperationCall, TxnError};

    use crate::error::SdkError;

    fn posts() -> Value {
        json!({"posts": [{"text": "A", "tags": []}]})
    }

    struct RecordingHook(Arc<Mutex<Vec<OpLog>>>);

    #[async_trait]
    impl CommitHook for RecordingHook {
        async fn on_commit(&self, log: &OpLog) -> SdkResult<()> {
            self.0.lock().unwrap().push(log.clone());
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl CommitHook for FailingHook {
        async fn on_commit(&self, _log: &OpLog) -> SdkResult<()> {
            Err(SdkError::Hook("unreachable peer".into()))
        }
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn transact_updates_and_journals() {
        let store = Store::new(posts(), StoreConfig::default());
        let log = store
            .transact_value(&json!([
                {"select": ["posts", 0, "tags"], "operation": ["add", "A1"]},
                ["set", "version", 1]
            ]))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&log).unwrap(),
            json!(["select", 3, "posts", 0, "tags", "aAdd", 1, "A1", "select", 0, "hSet", 2, "version", 1])
        );
        assert_eq!(
            store.snapshot().await.unwrap(),
            json!({"posts": [{"text": "A", "tags": ["A1"]}], "version": 1})
        );
        assert_eq!(store.journal(), vec![log]);
    }

    #[tokio::test]
    async fn failed_transaction_changes_nothing() {
        let store = Store::new(posts(), StoreConfig::default());
        let err = store
            .transact(&[
                OperationCall::set("version", json!(1)).into(),
                Statement::new(OperationCall::add(json!("B")))
                    .select(["posts"])
                    .validate(Guard::predicate(|_, _, _| Ok(false))),
            ])
            .await
            .unwrap_err();

        match err {
            SdkError::Transaction(e) => assert_eq!(e.root_cause(), &TxnError::ValidationFailed),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.snapshot().await.unwrap(), posts());
        assert!(store.journal().is_empty());
        assert!(store.gate_status().active_writer.is_none());
    }

    #[tokio::test]
    async fn invalid_transaction_input_is_rejected() {
        let store = Store::new(posts(), StoreConfig::default());
        let err = store.transact_value(&json!({"not": "a list"})).await.unwrap_err();
        assert!(matches!(err, SdkError::Transaction(TxnError::InvalidStatement(_))));
    }

    #[tokio::test]
    async fn concurrent_transactions_serialize() {
        let store = Arc::new(Store::new(json!({"list": []}), StoreConfig::default()));
        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .transact(&[Statement::new(OperationCall::add(json!(i))).select(["list"])])
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let len = store.read(|doc| doc["list"].as_array().map(Vec::len)).await.unwrap();
        assert_eq!(len, Some(10));
        assert_eq!(store.journal().len(), 10);
    }

    // -----------------------------------------------------------------------
    // Peer logs
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn peer_replays_committed_log() {
        let primary = Store::new(posts(), StoreConfig::default());
        let replica = Store::new(posts(), StoreConfig::default());

        let log = primary
            .transact_value(&json!([
                {"select": "posts", "operation": ["add", {"text": "B"}]},
                {"select": "posts", "operation": ["sort", "text"]}
            ]))
            .await
            .unwrap();

        replica.apply_log(&log).await.unwrap();
        assert_eq!(replica.snapshot().await.unwrap(), primary.snapshot().await.unwrap());
        assert_eq!(replica.journal(), primary.journal());
    }

    #[tokio::test]
    async fn malformed_peer_log_is_rejected() {
        let store = Store::new(posts(), StoreConfig::default());
        let truncated = OpLog::from_tokens(vec![json!("aAdd"), json!(2), json!("X")]);
        let err = store.apply_log(&truncated).await.unwrap_err();
        assert!(matches!(err, SdkError::Malformed(_)));

        // Well framed, but the root is a map.
        let not_an_array = OpLog::from_tokens(vec![json!("aAdd"), json!(1), json!("X")]);
        let err = store.apply_log(&not_an_array).await.unwrap_err();
        assert!(matches!(err, SdkError::Ledger(_)));
        assert_eq!(store.snapshot().await.unwrap(), posts());
        assert!(store.journal().is_empty());
    }

    // -----------------------------------------------------------------------
    // Journal and hooks
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn journal_limit_drops_oldest() {
        let store = Store::new(json!({}), StoreConfig::default().with_journal_limit(2));
        for version in 0..3 {
            store
                .transact(&[OperationCall::set("version", json!(version)).into()])
                .await
                .unwrap();
        }
        let journal = store.journal();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].tokens()[3], json!(1));
        assert_eq!(journal[1].tokens()[3], json!(2));
    }

    #[tokio::test]
    async fn hooks_observe_commits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = Store::new(json!({}), StoreConfig::default());
        store.add_hook(Box::new(FailingHook));
        store.add_hook(Box::new(RecordingHook(Arc::clone(&seen))));

        let log = store
            .transact(&[OperationCall::set("a", json!(1)).into()])
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![log]);
    }

    #[tokio::test]
    async fn read_burst_beyond_queue_limit_waits() {
        let config = StoreConfig {
            gate: GateConfig::default().with_reader_queue_size_limit(2),
            ..Default::default()
        };
        let store = Arc::new(Store::new(json!({"n": 7}), config));
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.read(|doc| doc["n"].clone()).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), json!(7));
        }
        assert!(store.gate_status().active_readers.is_empty());
    }

    #[tokio::test]
    async fn disabled_gate_store() {
        let config = StoreConfig {
            gate: GateConfig::disabled(),
            ..Default::default()
        };
        let store = Store::new(json!({"n": []}), config);
        store
            .transact(&[Statement::new(OperationCall::add(json!(1))).select(["n"])])
            .await
            .unwrap();
        assert_eq!(store.read(|doc| doc["n"].clone()).await.unwrap(), json!([1]));
    }
}
