//! "The data may have changed" signals and pull-based recomputation.
//!
//! A realtime feed (store change notifications, a form submit) calls
//! [`ChangeFeed::notify`]. Signals carry only a cursor, never rows. A
//! [`BalanceView`] recomputes on its next `refresh` after observing a newer
//! cursor; the aggregation itself stays stateless.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::InventoryLedger;
use crate::error::LedgerError;
use crate::model::{BalanceRecord, ItemIdentity};
use crate::source::TransactionSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChangeSignal {
    pub cursor: u64,
}

/// Cloneable handle; all clones share one cursor and subscriber list.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

#[derive(Default)]
struct FeedInner {
    cursor: AtomicU64,
    subscribers: Mutex<Vec<Sender<ChangeSignal>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> u64 {
        self.inner.cursor.load(Ordering::SeqCst)
    }

    /// Advance the cursor and wake every live subscriber. Returns the new cursor.
    pub fn notify(&self) -> u64 {
        let cursor = self.inner.cursor.fetch_add(1, Ordering::SeqCst) + 1;
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| tx.send(ChangeSignal { cursor }).is_ok());
        cursor
    }

    pub fn subscribe(&self) -> ChangeSubscriber {
        let (tx, rx) = mpsc::channel();
        self.inner.subscribers.lock().push(tx);
        ChangeSubscriber { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

pub struct ChangeSubscriber {
    rx: Receiver<ChangeSignal>,
}

impl ChangeSubscriber {
    /// Drain pending signals; the highest cursor seen, if any.
    pub fn latest(&self) -> Option<u64> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(signal) => latest = latest.max(Some(signal.cursor)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return latest,
            }
        }
    }
}

/// Cached balances of one inventory, recomputed only after a change signal.
pub struct BalanceView {
    ledger: InventoryLedger,
    subscriber: ChangeSubscriber,
    cursor: u64,
    dirty: bool,
    balances: BTreeMap<ItemIdentity, BalanceRecord>,
}

impl BalanceView {
    pub fn new(ledger: InventoryLedger, feed: &ChangeFeed) -> Self {
        Self {
            ledger,
            subscriber: feed.subscribe(),
            cursor: 0,
            dirty: true,
            balances: BTreeMap::new(),
        }
    }

    /// Recompute from `source` if a newer cursor was observed or nothing has
    /// been computed yet. Returns whether a recomputation happened. On a load
    /// error the view stays dirty and the previous balances are kept.
    pub fn refresh(&mut self, source: &dyn TransactionSource) -> Result<bool, LedgerError> {
        if let Some(cursor) = self.subscriber.latest() {
            if cursor > self.cursor {
                self.cursor = cursor;
                self.dirty = true;
            }
        }
        if !self.dirty {
            return Ok(false);
        }

        self.balances = self.ledger.balances(source)?;
        self.dirty = false;
        log::debug!(
            "{}: recomputed {} balance(s) at cursor {}",
            self.ledger.kind(),
            self.balances.len(),
            self.cursor
        );
        Ok(true)
    }

    pub fn balances(&self) -> &BTreeMap<ItemIdentity, BalanceRecord> {
        &self.balances
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
