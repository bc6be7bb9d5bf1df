use crate::models::Transaction;

/// Opaque handle the stream processor hands back to `Consumer::commit` once
/// a record has been fully persisted. Carries whatever the concrete
/// transport needs to acknowledge delivery without re-borrowing the
/// original message.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CommitToken {
    Kafka { partition: i32, offset: i64 },
    InMemory,
}

pub struct InboundRecord {
    pub transaction: Transaction,
    pub(crate) token: CommitToken,
}
