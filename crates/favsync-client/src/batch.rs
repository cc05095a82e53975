//! Batch accumulation for bulk favorite operations.
//!
//! Coalesces discrete toggle operations ("select all -> favorite all")
//! into one flush. At most one queued operation per product id: a
//! second add for the same product replaces the first.

use std::collections::HashMap;

use favsync_core::{FavoriteOp, PendingOperation};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct BatchProcessor {
    pending: Mutex<HashMap<u64, PendingOperation>>,
}

impl BatchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the pending operation for one product.
    pub fn add(&self, product_id: u64, op: FavoriteOp) {
        self.pending
            .lock()
            .insert(product_id, PendingOperation::new(product_id, op));
    }

    /// Deliver the full pending set to the handler and clear it.
    /// A no-op when nothing is queued; safe to call repeatedly. The
    /// owning teardown path must call this to avoid losing queued
    /// operations.
    pub fn flush<F>(&self, handler: F)
    where
        F: FnOnce(HashMap<u64, PendingOperation>),
    {
        let drained = self.drain();
        if drained.is_empty() {
            return;
        }
        tracing::info!(operations = drained.len(), "flushing queued favorite operations");
        handler(drained);
    }

    /// Take the pending set, leaving the processor empty.
    pub fn drain(&self) -> HashMap<u64, PendingOperation> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_overwrites_same_product() {
        let batch = BatchProcessor::new();
        batch.add(7, FavoriteOp::Add);
        batch.add(7, FavoriteOp::Remove);
        assert_eq!(batch.len(), 1);

        let mut seen = None;
        batch.flush(|ops| {
            assert_eq!(ops.len(), 1);
            seen = Some(ops[&7].op);
        });
        assert_eq!(seen, Some(FavoriteOp::Remove));
    }

    #[test]
    fn test_flush_clears_pending() {
        let batch = BatchProcessor::new();
        batch.add(1, FavoriteOp::Toggle);
        batch.add(2, FavoriteOp::Toggle);

        batch.flush(|ops| assert_eq!(ops.len(), 2));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let batch = BatchProcessor::new();
        batch.flush(|_| panic!("handler must not run for an empty batch"));

        batch.add(3, FavoriteOp::Add);
        batch.flush(|ops| assert_eq!(ops.len(), 1));
        // Second flush with nothing queued.
        batch.flush(|_| panic!("handler must not run for an empty batch"));
    }
}
