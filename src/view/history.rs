use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

use crate::auction::{format_price, Amount, BidUpdate, ProductName, UserName};

pub const EMPTY_HISTORY_MESSAGE: &str = "No bids yet";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BidHistoryEntry {
    pub buyer: UserName,
    pub product: ProductName,
    pub amount: Amount,
    pub timestamp: DateTime<Local>,
}

impl BidHistoryEntry {
    pub fn new(bid: BidUpdate, timestamp: DateTime<Local>) -> Self {
        Self {
            buyer: bid.buyer,
            product: bid.product,
            amount: bid.amount,
            timestamp,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{} bid {} on {}",
            self.buyer,
            format_price(self.amount),
            self.product
        )
    }
}

/// Most recent bids, newest first
#[derive(Clone, Debug, Serialize)]
pub struct BidHistory {
    entries: VecDeque<BidHistoryEntry>,
    capacity: usize,
    /// Bids recorded since start, evicted ones included
    recorded: u64,
}

impl BidHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    pub fn record(&mut self, entry: BidHistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        self.recorded += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &BidHistoryEntry> {
        self.entries.iter()
    }

    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

#[cfg(test)]
impl BidHistory {
    pub fn head(&self) -> Option<&BidHistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
