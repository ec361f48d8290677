use std::collections::VecDeque;

use crate::types::ActionRecord;

pub const DEFAULT_HISTORY_SIZE: usize = 5;

/// The model's only memory: the last `capacity` records, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    records: VecDeque<ActionRecord>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a finalized record, evicting the oldest one when full.
    pub fn push(&mut self, record: ActionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter()
    }

    /// Newline-joined summaries for the navigation prompt.
    pub fn prompt_context(&self) -> String {
        if self.records.is_empty() {
            return "Starting navigation".to_string();
        }
        self.records
            .iter()
            .map(ActionRecord::summary)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
