use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Alert, Transaction};

use super::consumer::{CommitToken, InboundRecord};
use super::{Consumer, Publisher};

/// In-memory `Publisher` used by tests and local development without a
/// Kafka cluster. Records everything published for assertions.
#[derive(Default)]
pub struct InMemoryPublisher {
    transactions: Mutex<Vec<Transaction>>,
    alerts: Mutex<Vec<Alert>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        InMemoryPublisher { transactions: Mutex::new(Vec::new()), alerts: Mutex::new(Vec::new()) }
    }

    pub fn published_transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }

    pub fn published_alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn publish_transaction(&self, transaction: &Transaction) -> AppResult<()> {
        self.transactions.lock().unwrap().push(transaction.clone());
        Ok(())
    }

    async fn publish_alert(&self, alert: &Alert) -> AppResult<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Fixed-queue `Consumer` used by tests and local development. Records
/// enqueued at construction time are handed out in order; `commit` just
/// counts acknowledgements.
pub struct InMemoryConsumer {
    queue: Mutex<VecDeque<Transaction>>,
    committed: Mutex<usize>,
}

impl InMemoryConsumer {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        InMemoryConsumer { queue: Mutex::new(transactions.into()), committed: Mutex::new(0) }
    }

    pub fn committed_count(&self) -> usize {
        *self.committed.lock().unwrap()
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[async_trait]
impl Consumer for InMemoryConsumer {
    async fn recv(&self) -> AppResult<Option<InboundRecord>> {
        let next = self.queue.lock().unwrap().pop_front();
        Ok(next.map(|transaction| InboundRecord { transaction, token: CommitToken::InMemory }))
    }

    async fn commit(&self, _record: &InboundRecord) -> AppResult<()> {
        *self.committed.lock().unwrap() += 1;
        Ok(())
    }
}
