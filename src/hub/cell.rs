//! Last-value cell
//!
//! A single slot holding the most recently published value plus a version
//! counter. Publishing overwrites the slot and wakes every waiting cursor.
//! There is no history: a cursor that misses two publishes sees only the
//! second.

use tokio::sync::watch;

/// A published value and the version it was stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Starts at 1 and increases by one on every publish
    pub version: u64,
    pub value: T,
}

/// Single-writer, multi-reader last-value slot
///
/// Built on `tokio::sync::watch`, which already gives one shared slot and
/// per-receiver "seen" tracking. The version counter lives inside the slot so
/// it can never disagree with the value.
pub struct LatestValueCell<T> {
    tx: watch::Sender<Option<Versioned<T>>>,
}

impl<T: Clone> LatestValueCell<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Overwrite the slot and wake all cursors
    ///
    /// Never waits on readers. Returns the version assigned to `value`.
    pub fn publish(&self, value: T) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|slot| {
            version = slot.as_ref().map_or(0, |current| current.version) + 1;
            *slot = Some(Versioned { version, value });
        });
        version
    }

    /// Most recent value, if anything was published
    pub fn latest(&self) -> Option<Versioned<T>> {
        self.tx.borrow().clone()
    }

    /// Number of publishes so far
    pub fn version(&self) -> u64 {
        self.tx.borrow().as_ref().map_or(0, |current| current.version)
    }

    /// Open a cursor positioned at the current version
    ///
    /// The cursor only reports values published after this call.
    pub fn cursor(&self) -> CellCursor<T> {
        CellCursor {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of open cursors
    pub fn cursor_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Default for LatestValueCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Independent read position into a [`LatestValueCell`]
pub struct CellCursor<T> {
    rx: watch::Receiver<Option<Versioned<T>>>,
}

impl<T: Clone> CellCursor<T> {
    /// Wait until the cell holds a version this cursor has not seen
    ///
    /// Resolves with the latest value at the moment of waking, skipping any
    /// intermediate versions. Returns `None` once the cell is dropped.
    /// Cancel-safe: dropping the future loses no notification.
    pub async fn changed(&mut self) -> Option<Versioned<T>> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
    }

    /// Whether a publish happened since the last observed version
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
