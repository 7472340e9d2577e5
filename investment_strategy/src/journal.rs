use alloy_primitives::{Address, U256};
use candid::{CandidType, Nat};
use serde::Deserialize;

use crate::{
    constants::MAX_JOURNAL_ENTRIES,
    utils::{common::u256_to_nat, error::StrategyResult},
};

/// Kind of event a journal entry records
#[derive(CandidType, Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub enum LogType {
    /// Principal recorded for a depositor
    Deposit,
    /// Primary asset converted into the secondary asset
    Swap,
    /// Asset supplied to a lending market
    Supply,
    /// Allocation pass summary
    Allocation,
    /// Outcome of a public operation
    ExecutionResult,
    Info,
}

/// Journal entry
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub timestamp: u64,
    pub entry: StrategyResult<()>,
    pub log_type: LogType,
    pub account: Option<String>,
    pub amount: Option<Nat>,
    pub note: Option<String>,
}

/// Builder for journal entries
impl JournalEntry {
    /// Create a new instance of a journal entry
    /// Fills the `timestamp`, `entry` and `log_type` fields
    pub fn new(timestamp: u64, entry: StrategyResult<()>, log_type: LogType) -> Self {
        Self {
            timestamp,
            entry,
            log_type,
            account: None,
            amount: None,
            note: None,
        }
    }

    /// Fills the `account` field of the entry
    pub fn account(mut self, account: Address) -> Self {
        self.account = Some(account.to_string());
        self
    }

    /// Fills the `amount` field of the entry
    pub fn amount(mut self, amount: U256) -> Self {
        self.amount = Some(u256_to_nat(&amount));
        self
    }

    /// Fills the `note` field of the entry
    pub fn note<S: AsRef<str>>(mut self, text: S) -> Self {
        self.note = Some(text.as_ref().to_string());
        self
    }

    /// Emits the entry as a tracing event
    fn trace(&self) {
        let note = self.note.as_deref().unwrap_or_default();
        let account = self.account.as_deref().unwrap_or_default();
        match &self.entry {
            Ok(()) => tracing::info!(log_type = ?self.log_type, account, note, "journal"),
            Err(err) => tracing::warn!(log_type = ?self.log_type, account, note, error = %err, "journal"),
        }
    }
}

/// Entries buffered while an operation runs.
/// They only reach the [`Journal`] if the operation commits.
#[derive(Default)]
pub struct JournalCollection {
    timestamp: u64,
    entries: Vec<JournalEntry>,
}

impl JournalCollection {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            entries: vec![],
        }
    }

    /// Buffers a successful note of the given type
    pub fn append_note<S: AsRef<str>>(&mut self, log_type: LogType, note: S) -> &mut JournalEntry {
        self.push(JournalEntry::new(self.timestamp, Ok(()), log_type).note(note))
    }

    /// Starts a successful entry stamped with the collection's timestamp
    pub fn prepare(&self, log_type: LogType) -> JournalEntry {
        JournalEntry::new(self.timestamp, Ok(()), log_type)
    }

    /// Buffers a prepared entry and returns it for further filling
    pub fn push(&mut self, entry: JournalEntry) -> &mut JournalEntry {
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Log of everything the strategy did.
/// Only the most recent `max_entries` are retained; every entry is still traced.
#[derive(Clone, Debug)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    max_entries: usize,
}

impl Default for Journal {
    fn default() -> Self {
        Self::with_retention(MAX_JOURNAL_ENTRIES)
    }
}

impl Journal {
    pub fn with_retention(max_entries: usize) -> Self {
        Self {
            entries: vec![],
            max_entries,
        }
    }

    /// Commits a single entry, pruning the oldest ones beyond the retention
    pub fn commit(&mut self, entry: JournalEntry) {
        entry.trace();
        self.entries.push(entry);

        let len = self.entries.len();
        if len > self.max_entries {
            self.entries.drain(..len - self.max_entries);
        }
    }

    /// Commits every buffered entry of a finished operation
    pub fn commit_collection(&mut self, collection: JournalCollection) {
        for entry in collection.entries {
            self.commit(entry);
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Entries of the given type, oldest first
    pub fn of_type(&self, log_type: LogType) -> impl Iterator<Item = &JournalEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.log_type == log_type)
    }
}
