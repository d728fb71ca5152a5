//! Records and the fixed set of output channels they are routed into

use crate::{Result, SwitchError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Back-reference from a routed record to its input position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One data record
///
/// The payload is shared, so a record routed to several channels (or
/// twice to the same one) is the same payload every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub json: Arc<Value>,
    pub paired_item: PairedItem,
}

impl Record {
    /// Create a record for the input at `item_index`
    pub fn new(json: Value, item_index: usize) -> Self {
        Self {
            json: Arc::new(json),
            paired_item: PairedItem { item: item_index },
        }
    }

    /// Diagnostic record standing in for a failed input
    pub fn diagnostic(message: impl Into<String>, item_index: usize) -> Self {
        Self::new(json!({ "error": message.into() }), item_index)
    }

    /// Wrap an ordered batch of payloads, numbering them from zero
    pub fn batch<I>(payloads: I) -> Vec<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        payloads
            .into_iter()
            .enumerate()
            .map(|(i, json)| Self::new(json, i))
            .collect()
    }

    pub fn item_index(&self) -> usize {
        self.paired_item.item
    }

    /// Whether both records carry the same payload instance
    pub fn shares_payload(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.json, &other.json)
    }
}

/// One numbered output destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub index: usize,
    pub label: String,
    #[serde(rename = "items")]
    pub records: Vec<Record>,
}

impl Channel {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pre-allocated output channels for one batch
///
/// The number of channels is fixed at allocation; records can only be
/// appended through a validated index.
#[derive(Debug, Clone, PartialEq)]
pub struct Channels {
    slots: Box<[Channel]>,
}

impl Channels {
    /// Allocate one empty channel per label
    pub fn allocate(labels: &[String]) -> Self {
        let slots = labels
            .iter()
            .enumerate()
            .map(|(index, label)| Channel::new(index, label.clone()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Validate a channel index against this allocation
    pub fn ensure_range(&self, index: f64) -> Result<usize> {
        ensure_range(index, self.count())
    }

    /// Append a record to the channel at `index`
    pub fn push(&mut self, index: f64, record: Record) -> Result<usize> {
        let slot = self.ensure_range(index)?;
        self.slots[slot].records.push(record);
        Ok(slot)
    }

    /// Append a diagnostic record to channel 0
    pub fn push_diagnostic(&mut self, message: impl Into<String>, item_index: usize) {
        if let Some(first) = self.slots.first_mut() {
            first.records.push(Record::diagnostic(message, item_index));
        }
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.slots.iter()
    }

    /// Records per channel, in channel order
    pub fn sizes(&self) -> Vec<usize> {
        self.slots.iter().map(Channel::len).collect()
    }

    /// Total records across all channels
    pub fn total(&self) -> usize {
        self.slots.iter().map(Channel::len).sum()
    }

    pub fn into_vec(self) -> Vec<Channel> {
        self.slots.into_vec()
    }
}

/// Check that `index` is a non-negative integer below `count`
pub fn ensure_range(index: f64, count: usize) -> Result<usize> {
    if index.is_finite() && index.fract() == 0.0 && index >= 0.0 && index < count as f64 {
        return Ok(index as usize);
    }

    Err(SwitchError::OutOfRange {
        index,
        max: count.saturating_sub(1),
    })
}
