//! In-memory sink
//!
//! Keeps the most recent accepted records in a bounded ring buffer.

use std::collections::VecDeque;
use std::sync::RwLock;

use super::{describe_error, LogError, Sink};
use crate::level::Level;
use crate::policy::Policy;
use crate::probe::CallContext;

/// Default number of records kept
pub const DEFAULT_CAPACITY: usize = 1_000;

/// A single accepted call
#[derive(Debug, Clone)]
pub struct Record {
    /// Level of the call
    pub level: Level,
    /// Caller context
    pub context: CallContext,
    /// Rendered message
    pub message: String,
    /// Rendered error chain, if any
    pub error: Option<String>,
}

/// Thread-safe ring buffer sink
pub struct MemorySink {
    policy: Policy,
    records: RwLock<VecDeque<Record>>,
    capacity: usize,
}

impl MemorySink {
    /// Create a sink keeping up to `capacity` records
    pub fn new(policy: Policy, capacity: usize) -> Self {
        Self {
            policy,
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn push(&self, record: Record) {
        if self.capacity == 0 {
            return;
        }
        if let Ok(mut records) = self.records.write() {
            if records.len() >= self.capacity {
                records.pop_front();
            }
            records.push_back(record);
        }
    }

    /// Snapshot of all kept records, oldest first
    pub fn records(&self) -> Vec<Record> {
        self.records
            .read()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Messages of all kept records, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.records
            .read()
            .map(|r| r.iter().map(|rec| rec.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Get the number of kept records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if no record is kept
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every kept record
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn policy(&self) -> &Policy {
        &self.policy
    }

    fn accept(&self, level: Level, context: &CallContext, message: &str, error: Option<LogError<'_>>) {
        self.push(Record {
            level,
            context: context.clone(),
            message: message.to_string(),
            error: error.map(describe_error),
        });
    }
}
